use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use serde_json::Value;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::i18n::Message;
use crate::models::Permission;
use crate::response;
use crate::state::SharedState;

const SYSTEM_ACCESS: [&str; 5] = [
    "view_dashboard",
    "view_analytics",
    "view_profile",
    "edit_profile",
    "view_logs",
];
const ADMINISTRATION: [&str; 3] = ["manage_permissions", "manage_settings", "system_admin"];

#[derive(Debug, Serialize)]
pub struct PermissionGroup<'a> {
    pub label: &'static str,
    pub description: &'static str,
    pub permissions: Vec<&'a Permission>,
}

/// Bucket the catalogue for the role editor. A permission may land in more than
/// one group, and permissions matching no rule are left out.
pub fn group(permissions: &[Permission]) -> BTreeMap<&'static str, PermissionGroup<'_>> {
    let rules: [(&'static str, &'static str, &'static str, fn(&str) -> bool); 4] = [
        (
            "user_management",
            "User Management",
            "Manage users and their accounts",
            |name| name.contains("user"),
        ),
        (
            "role_management",
            "Role Management",
            "Manage roles and permissions",
            |name| name.contains("role") || name.contains("permission"),
        ),
        (
            "system_access",
            "System Access",
            "Access to system features",
            |name| SYSTEM_ACCESS.iter().any(|p| *p == name),
        ),
        (
            "administration",
            "Administration",
            "System administration privileges",
            |name| ADMINISTRATION.iter().any(|p| *p == name),
        ),
    ];

    rules
        .into_iter()
        .map(|(key, label, description, matches)| {
            let members = permissions.iter().filter(|p| matches(&p.name)).collect();
            (
                key,
                PermissionGroup {
                    label,
                    description,
                    permissions: members,
                },
            )
        })
        .collect()
}

pub async fn index(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> Result<Json<Value>, AppError> {
    auth.require_any(&["view_permissions", "view_roles"])?;

    let permissions = db::permissions::list_all(&state.pool).await?;
    Ok(response::with_message(
        auth.locale.t(Message::PermissionsRetrieved),
        permissions,
    ))
}

pub async fn grouped(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> Result<Json<Value>, AppError> {
    auth.require_any(&["view_permissions", "view_roles"])?;

    let permissions = db::permissions::list_all(&state.pool).await?;
    Ok(response::with_message(
        auth.locale.t(Message::PermissionsGroupedRetrieved),
        group(&permissions),
    ))
}
