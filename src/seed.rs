use sqlx::PgPool;

use crate::auth::password;
use crate::config::AdminSeed;
use crate::db;
use crate::db::users::UserFields;
use crate::models::{OWNER, SUPER_ADMIN, USER};
use crate::rbac::PermissionCache;

pub const PERMISSIONS: [&str; 26] = [
    // User management
    "view_users",
    "create_users",
    "edit_users",
    "delete_users",
    "manage_users",
    // Role management
    "view_roles",
    "create_roles",
    "edit_roles",
    "delete_roles",
    "assign_roles",
    // Permission management
    "view_permissions",
    "manage_permissions",
    // Dashboard
    "view_dashboard",
    "view_analytics",
    // Profile
    "view_profile",
    "edit_profile",
    "upload_avatar",
    "delete_avatar",
    // System
    "manage_settings",
    "view_logs",
    "system_admin",
    "view_activity_logs",
    "manage_activity_logs",
    "bulk_operations",
    "export_data",
    "import_data",
];

pub const OWNER_PERMISSIONS: [&str; 13] = [
    "view_users",
    "create_users",
    "edit_users",
    "view_roles",
    "assign_roles",
    "view_dashboard",
    "view_analytics",
    "view_profile",
    "edit_profile",
    "upload_avatar",
    "delete_avatar",
    "view_activity_logs",
    "export_data",
];

pub const USER_PERMISSIONS: [&str; 5] = [
    "view_dashboard",
    "view_profile",
    "edit_profile",
    "upload_avatar",
    "delete_avatar",
];

#[derive(Debug)]
pub enum SeedError {
    Database(sqlx::Error),
    Password(String),
}

impl std::fmt::Display for SeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedError::Database(err) => write!(f, "Seeding failed: {err}"),
            SeedError::Password(msg) => write!(f, "Seeding failed: {msg}"),
        }
    }
}

impl std::error::Error for SeedError {}

impl From<sqlx::Error> for SeedError {
    fn from(err: sqlx::Error) -> Self {
        SeedError::Database(err)
    }
}

/// Idempotently create the permission catalogue and reserved roles, then the
/// initial Super Admin account when configured and missing.
///
/// Owner and User only receive their default permissions while their permission
/// set is empty, so edits made through the API survive restarts.
pub async fn run(
    pool: &PgPool,
    cache: &PermissionCache,
    admin: Option<&AdminSeed>,
) -> Result<(), SeedError> {
    let admin_hash = match admin {
        Some(admin) => Some(password::hash(&admin.password).map_err(SeedError::Password)?),
        None => None,
    };

    let mut tx = pool.begin().await?;

    let mut catalogue = Vec::with_capacity(PERMISSIONS.len());
    for name in PERMISSIONS {
        catalogue.push(db::permissions::ensure(&mut *tx, name).await?);
    }

    let super_admin = db::roles::ensure(&mut *tx, SUPER_ADMIN).await?;
    db::roles::sync_super_admin(&mut *tx).await?;

    for (role_name, defaults) in [(OWNER, &OWNER_PERMISSIONS[..]), (USER, &USER_PERMISSIONS[..])] {
        let role = db::roles::ensure(&mut *tx, role_name).await?;
        if db::roles::permissions_for(&mut *tx, role.id).await?.is_empty() {
            let ids: Vec<_> = catalogue
                .iter()
                .filter(|p| defaults.contains(&p.name.as_str()))
                .map(|p| p.id)
                .collect();
            db::roles::sync_permissions(&mut tx, role.id, &ids).await?;
            tracing::info!("Seeded default permissions for role {role_name}");
        }
    }

    if let (Some(admin), Some(hash)) = (admin, admin_hash) {
        let email = admin.email.trim().to_lowercase();
        let exists: (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
            .bind(&email)
            .fetch_one(&mut *tx)
            .await?;

        if !exists.0 {
            let fields = UserFields {
                name: &admin.name,
                email: &email,
                phone: None,
                timezone: None,
                bio: None,
            };
            let user = db::users::create(&mut *tx, &fields, &hash).await?;
            db::users::mark_email_verified(&mut *tx, user.id).await?;
            db::users::sync_roles(&mut tx, user.id, &[super_admin.id]).await?;
            tracing::info!("Created initial Super Admin account {email}");
        }
    }

    tx.commit().await?;
    cache.flush();

    tracing::info!("Roles and permissions seeded");
    Ok(())
}
