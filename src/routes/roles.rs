use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::{AppError, is_unique_violation};
use crate::extract::ApiJson;
use crate::i18n::{Locale, Message};
use crate::models::{Permission, Role};
use crate::rbac;
use crate::response::{self, ListQuery, Page, RolePayload};
use crate::state::SharedState;
use crate::validation::Validator;

#[derive(Deserialize)]
pub struct RoleRequest {
    pub name: Option<String>,
    /// Permission names. Absent on update keeps the current set.
    pub permissions: Option<Vec<String>>,
}

async fn find_or_404(state: &SharedState, auth: &AuthUser, id: Uuid) -> Result<Role, AppError> {
    db::roles::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(auth.locale.t(Message::RoleNotFound).to_string()))
}

/// Resolve permission names, recording an `exists` error for unknown ones.
async fn resolve_permissions(
    state: &SharedState,
    v: &mut Validator,
    names: Option<&[String]>,
) -> Result<Option<Vec<Permission>>, AppError> {
    let Some(names) = names else {
        return Ok(None);
    };
    let found = db::permissions::find_by_names(&state.pool, names).await?;
    if !rbac::missing_names(names, found.iter().map(|p| p.name.as_str())).is_empty() {
        v.add("permissions", Message::Exists, &[]);
    }
    Ok(Some(found))
}

fn unique_name(err: sqlx::Error, locale: Locale) -> AppError {
    if is_unique_violation(&err) {
        AppError::field(
            locale.t(Message::ValidationFailed),
            "name",
            locale.format(Message::Unique, &[("attribute", "name")]),
        )
    } else {
        err.into()
    }
}

fn ids(permissions: &[Permission]) -> Vec<Uuid> {
    permissions.iter().map(|p| p.id).collect()
}

pub async fn index(
    State(state): State<SharedState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, AppError> {
    auth.require("view_roles")?;

    let (roles, total) =
        db::roles::list(&state.pool, query.search(), query.per_page(), query.offset()).await?;

    let role_ids: Vec<Uuid> = roles.iter().map(|r| r.id).collect();
    let mut permissions: HashMap<Uuid, Vec<Permission>> = HashMap::new();
    for row in db::roles::permissions_for_many(&state.pool, &role_ids).await? {
        permissions.entry(row.role_id).or_default().push(row.permission);
    }

    let data: Vec<RolePayload> = roles
        .into_iter()
        .map(|role| {
            let granted = permissions.remove(&role.id).unwrap_or_default();
            RolePayload::new(role, granted)
        })
        .collect();

    Ok(response::with_message(
        auth.locale.t(Message::RolesRetrieved),
        Page::new(data, total, &query),
    ))
}

pub async fn store(
    State(state): State<SharedState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<RoleRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    auth.require("create_roles")?;

    let mut v = Validator::new(auth.locale);
    let name = v.required("name", req.name.as_deref());
    v.max_len("name", name, 255);
    if let Some(name) = name {
        if !v.has("name") && db::roles::name_taken(&state.pool, name, None).await? {
            v.add("name", Message::Unique, &[]);
        }
    }
    let granted = resolve_permissions(&state, &mut v, req.permissions.as_deref()).await?;
    v.finish()?;

    let mut tx = state.pool.begin().await?;
    let role = db::roles::create(&mut *tx, name.unwrap_or_default())
        .await
        .map_err(|e| unique_name(e, auth.locale))?;
    let permission_ids = granted.as_deref().map(ids).unwrap_or_default();
    rbac::sync_role_permissions(&mut tx, &role, &permission_ids).await?;
    tx.commit().await?;

    state.permissions.flush();
    tracing::info!("User {} created role {}", auth.user_id(), role.name);

    let permissions = db::roles::permissions_for(&state.pool, role.id).await?;
    Ok((
        StatusCode::CREATED,
        response::with_message(
            auth.locale.t(Message::RoleCreated),
            RolePayload::new(role, permissions),
        ),
    ))
}

pub async fn show(
    State(state): State<SharedState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    auth.require("view_roles")?;

    let role = find_or_404(&state, &auth, id).await?;
    let permissions = db::roles::permissions_for(&state.pool, role.id).await?;

    Ok(response::with_message(
        auth.locale.t(Message::RoleRetrieved),
        RolePayload::new(role, permissions),
    ))
}

pub async fn update(
    State(state): State<SharedState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<RoleRequest>,
) -> Result<Json<Value>, AppError> {
    auth.require("edit_roles")?;

    let role = find_or_404(&state, &auth, id).await?;
    if role.is_super_admin() && !auth.is_super_admin() {
        return Err(auth.forbidden(Message::CannotEditSuperAdminRole));
    }

    let mut v = Validator::new(auth.locale);
    let name = v.required("name", req.name.as_deref());
    v.max_len("name", name, 255);
    if let Some(name) = name {
        if role.is_reserved() && name != role.name {
            v.add("name", Message::CannotRenameSystemRole, &[]);
        } else if !v.has("name") && db::roles::name_taken(&state.pool, name, Some(role.id)).await? {
            v.add("name", Message::Unique, &[]);
        }
    }
    let granted = resolve_permissions(&state, &mut v, req.permissions.as_deref()).await?;
    v.finish()?;

    let mut tx = state.pool.begin().await?;
    let role = db::roles::rename(&mut *tx, role.id, name.unwrap_or_default())
        .await
        .map_err(|e| unique_name(e, auth.locale))?;
    if let Some(granted) = &granted {
        rbac::sync_role_permissions(&mut tx, &role, &ids(granted)).await?;
    }
    tx.commit().await?;

    state.permissions.flush();
    tracing::info!("User {} updated role {}", auth.user_id(), role.name);

    let permissions = db::roles::permissions_for(&state.pool, role.id).await?;
    Ok(response::with_message(
        auth.locale.t(Message::RoleUpdated),
        RolePayload::new(role, permissions),
    ))
}

pub async fn destroy(
    State(state): State<SharedState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    auth.require("delete_roles")?;

    let role = find_or_404(&state, &auth, id).await?;
    if role.is_reserved() {
        return Err(auth.forbidden(Message::CannotDeleteSystemRole));
    }

    db::roles::delete(&state.pool, role.id).await?;
    state.permissions.flush();

    tracing::info!("User {} deleted role {}", auth.user_id(), role.name);
    Ok(response::message(auth.locale.t(Message::RoleDeleted)))
}
