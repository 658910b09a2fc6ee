//! Role/permission store.
//!
//! A user's effective permissions are the union of the permissions of their roles.
//! Lookups go through [`PermissionCache`], which is invalidated synchronously by every
//! write that can change a user's grants.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db;
use crate::models::{Permission, Role, SUPER_ADMIN};

/// Roles and effective permissions of one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Grants {
    pub roles: BTreeSet<String>,
    pub permissions: BTreeSet<String>,
}

impl Grants {
    /// Union of `(role name, role permissions)` pairs.
    pub fn from_roles<'a, I, P>(roles: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, P)>,
        P: IntoIterator<Item = &'a str>,
    {
        let mut grants = Grants::default();
        for (role, permissions) in roles {
            grants.roles.insert(role.to_string());
            grants
                .permissions
                .extend(permissions.into_iter().map(str::to_string));
        }
        grants
    }

    pub fn can(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    pub fn can_any(&self, permissions: &[&str]) -> bool {
        permissions.iter().any(|p| self.can(p))
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn is_super_admin(&self) -> bool {
        self.has_role(SUPER_ADMIN)
    }
}

/// Per-user grants cache.
///
/// Every invalidation bumps `generation`. A fill records the generation before it reads
/// the database and is dropped if an invalidation happened in between, so a slow reader
/// cannot put grants back that a concurrent write already retired.
pub struct PermissionCache {
    entries: DashMap<Uuid, Arc<Grants>>,
    generation: AtomicU64,
}

impl Default for PermissionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn get(&self, user_id: Uuid) -> Option<Arc<Grants>> {
        self.entries.get(&user_id).map(|e| Arc::clone(e.value()))
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Store grants read at `generation`. Returns `false` when an invalidation has
    /// happened since, leaving the cache untouched.
    pub fn insert_if_current(&self, user_id: Uuid, grants: Arc<Grants>, generation: u64) -> bool {
        // The shard lock is held across the check, so a racing `forget` either bumps
        // first (and we skip) or removes after us.
        let entry = self.entries.entry(user_id);
        if self.generation() != generation {
            return false;
        }
        entry.insert(grants);
        true
    }

    /// Drop one user's entry after their role assignments change.
    pub fn forget(&self, user_id: Uuid) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.remove(&user_id);
    }

    /// Drop everything after any role's permission set changes.
    pub fn flush(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Load (or reuse cached) grants for a user.
pub async fn grants_for(
    pool: &PgPool,
    cache: &PermissionCache,
    user_id: Uuid,
) -> Result<Arc<Grants>, sqlx::Error> {
    if let Some(grants) = cache.get(user_id) {
        return Ok(grants);
    }

    let generation = cache.generation();
    let rows = db::permissions::grant_rows(pool, user_id).await?;

    let grants = Arc::new(Grants::from_roles(
        rows.iter()
            .map(|(role, permission)| (role.as_str(), permission.as_deref())),
    ));
    if !cache.insert_if_current(user_id, Arc::clone(&grants), generation) {
        tracing::debug!("Grants for {user_id} changed while loading, not caching");
    }
    Ok(grants)
}

pub async fn has_permission(
    pool: &PgPool,
    cache: &PermissionCache,
    user_id: Uuid,
    permission: &str,
) -> Result<bool, sqlx::Error> {
    Ok(grants_for(pool, cache, user_id).await?.can(permission))
}

/// Requested names with no matching record, in request order, deduplicated.
pub fn missing_names<'a, 'b>(
    requested: &'a [String],
    found: impl IntoIterator<Item = &'b str>,
) -> Vec<&'a str> {
    let found: BTreeSet<&str> = found.into_iter().collect();
    let mut seen = BTreeSet::new();
    requested
        .iter()
        .map(String::as_str)
        .filter(|name| !found.contains(name) && seen.insert(*name))
        .collect()
}

/// Replace a role's permission set. The Super Admin role always receives the full set.
/// Call inside a transaction and flush the cache after commit.
pub async fn sync_role_permissions(
    conn: &mut sqlx::PgConnection,
    role: &Role,
    permission_ids: &[Uuid],
) -> Result<(), sqlx::Error> {
    if role.is_super_admin() {
        db::roles::sync_super_admin(&mut *conn).await
    } else {
        db::roles::sync_permissions(conn, role.id, permission_ids).await
    }
}

/// Add a permission to the catalogue and re-sync Super Admin in the same transaction.
pub async fn create_permission(
    pool: &PgPool,
    cache: &PermissionCache,
    name: &str,
) -> Result<Permission, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let permission = db::permissions::ensure(&mut *tx, name).await?;
    db::roles::sync_super_admin(&mut *tx).await?;
    tx.commit().await?;

    cache.flush();
    Ok(permission)
}
