use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::auth::password;
use crate::avatar::AvatarStore;
use crate::db;
use crate::db::users::{UserFields, UserFilter};
use crate::error::AppError;
use crate::extract::ApiJson;
use crate::i18n::Message;
use crate::models::{Role, RoleSummary, SUPER_ADMIN, User};
use crate::rbac;
use crate::response::{self, ListQuery, Page, UserPayload};
use crate::routes::profile::unique_email;
use crate::state::SharedState;
use crate::validation::{Validator, optional};

#[derive(Deserialize)]
pub struct UserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
    pub phone: Option<String>,
    pub timezone: Option<String>,
    pub bio: Option<String>,
    /// Role names. Absent on update keeps the current assignment.
    pub roles: Option<Vec<String>>,
}

/// Validated user payload, borrowing from the request.
struct ValidUser<'a> {
    fields: UserFields<'a>,
    password: Option<&'a str>,
    roles: Option<Vec<Role>>,
}

async fn validate<'a>(
    state: &SharedState,
    auth: &AuthUser,
    req: &'a UserRequest,
    email: &'a str,
    existing: Option<Uuid>,
) -> Result<ValidUser<'a>, AppError> {
    let mut v = Validator::new(auth.locale);

    let name = v.required("name", req.name.as_deref());
    v.max_len("name", name, 255);

    if email.is_empty() {
        v.add("email", Message::Required, &[]);
    } else {
        v.email("email", email);
        v.max_len("email", Some(email), 255);
        if !v.has("email") && db::users::email_taken(&state.pool, email, existing).await? {
            v.add("email", Message::Unique, &[]);
        }
    }

    // Password is required on create and optional on update.
    let password = match (existing, optional(req.password.as_deref())) {
        (None, None) => {
            v.add("password", Message::Required, &[]);
            None
        }
        (_, None) => None,
        (_, Some(_)) => req.password.as_deref(),
    };
    if let Some(password) = password {
        v.min_len("password", password, 8);
        v.confirmed("password", password, req.password_confirmation.as_deref());
    }

    let phone = optional(req.phone.as_deref());
    v.max_len("phone", phone, 20);
    let timezone = optional(req.timezone.as_deref());
    v.max_len("timezone", timezone, 50);
    let bio = optional(req.bio.as_deref());
    v.max_len("bio", bio, 500);

    let roles = match &req.roles {
        Some(names) => {
            let found = db::roles::find_by_names(&state.pool, names).await?;
            let missing = rbac::missing_names(names, found.iter().map(|r| r.name.as_str()));
            if !missing.is_empty() {
                v.add("roles", Message::Exists, &[]);
            }
            Some(found)
        }
        None => None,
    };

    v.finish()?;

    if let Some(roles) = &roles {
        if roles.iter().any(Role::is_super_admin) && !auth.is_super_admin() {
            return Err(auth.forbidden(Message::CannotAssignSuperAdmin));
        }
    }

    Ok(ValidUser {
        fields: UserFields {
            name: name.unwrap_or_default(),
            email,
            phone,
            timezone,
            bio,
        },
        password,
        roles,
    })
}

async fn find_or_404(state: &SharedState, auth: &AuthUser, id: Uuid) -> Result<User, AppError> {
    db::users::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(auth.locale.t(Message::UserNotFound).to_string()))
}

pub async fn index(
    State(state): State<SharedState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, AppError> {
    auth.require("view_users")?;

    let filter = UserFilter {
        search: query.search(),
        role: query.role(),
        limit: query.per_page(),
        offset: query.offset(),
    };
    let (users, total) = db::users::list(&state.pool, &filter).await?;

    let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
    let mut roles: HashMap<Uuid, Vec<RoleSummary>> = HashMap::new();
    for row in db::users::roles_for_many(&state.pool, &ids).await? {
        roles.entry(row.user_id).or_default().push(row.role);
    }

    let data: Vec<UserPayload> = users
        .into_iter()
        .map(|user| {
            let user_roles = roles.remove(&user.id).unwrap_or_default();
            UserPayload::new(&state.config, user, user_roles)
        })
        .collect();

    Ok(response::with_message(
        auth.locale.t(Message::UsersRetrieved),
        Page::new(data, total, &query),
    ))
}

pub async fn store(
    State(state): State<SharedState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<UserRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    auth.require("create_users")?;

    let email = req.email.as_deref().unwrap_or_default().trim().to_lowercase();
    let valid = validate(&state, &auth, &req, &email, None).await?;
    let hash = password::hash(valid.password.unwrap_or_default()).map_err(AppError::Internal)?;

    let mut tx = state.pool.begin().await?;
    let user = db::users::create(&mut *tx, &valid.fields, &hash)
        .await
        .map_err(|e| unique_email(e, auth.locale))?;
    let role_ids: Vec<Uuid> = valid.roles.iter().flatten().map(|r| r.id).collect();
    db::users::sync_roles(&mut tx, user.id, &role_ids).await?;
    tx.commit().await?;

    state.permissions.forget(user.id);
    tracing::info!("User {} created user {}", auth.user_id(), user.id);

    let roles = db::users::roles_for(&state.pool, user.id).await?;
    Ok((
        StatusCode::CREATED,
        response::with_message(
            auth.locale.t(Message::UserCreated),
            UserPayload::new(&state.config, user, roles),
        ),
    ))
}

pub async fn show(
    State(state): State<SharedState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    auth.require("view_users")?;

    let user = find_or_404(&state, &auth, id).await?;
    let roles = db::users::roles_for(&state.pool, id).await?;
    let permissions = db::permissions::names_for_user(&state.pool, id).await?;

    Ok(response::with_message(
        auth.locale.t(Message::UserRetrieved),
        UserPayload::new(&state.config, user, roles).with_permissions(permissions),
    ))
}

pub async fn update(
    State(state): State<SharedState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<UserRequest>,
) -> Result<Json<Value>, AppError> {
    auth.require("edit_users")?;

    let target = find_or_404(&state, &auth, id).await?;
    if !auth.is_super_admin() && db::users::has_role(&state.pool, target.id, SUPER_ADMIN).await? {
        return Err(auth.forbidden(Message::CannotEditSuperAdmin));
    }

    let email = req.email.as_deref().unwrap_or_default().trim().to_lowercase();
    let valid = validate(&state, &auth, &req, &email, Some(target.id)).await?;
    let hash = valid
        .password
        .map(password::hash)
        .transpose()
        .map_err(AppError::Internal)?;

    let mut tx = state.pool.begin().await?;
    let user = db::users::update_fields(&mut *tx, target.id, &valid.fields)
        .await
        .map_err(|e| unique_email(e, auth.locale))?;
    if let Some(hash) = &hash {
        db::users::update_password(&mut *tx, target.id, hash).await?;
    }
    if let Some(roles) = &valid.roles {
        let role_ids: Vec<Uuid> = roles.iter().map(|r| r.id).collect();
        db::users::sync_roles(&mut tx, target.id, &role_ids).await?;
    }
    tx.commit().await?;

    state.permissions.forget(target.id);
    tracing::info!("User {} updated user {}", auth.user_id(), target.id);

    let roles = db::users::roles_for(&state.pool, target.id).await?;
    Ok(response::with_message(
        auth.locale.t(Message::UserUpdated),
        UserPayload::new(&state.config, user, roles),
    ))
}

pub async fn destroy(
    State(state): State<SharedState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if id == auth.user_id() {
        return Err(auth.forbidden(Message::CannotDeleteSelf));
    }
    auth.require("delete_users")?;

    let target = find_or_404(&state, &auth, id).await?;
    if db::users::has_role(&state.pool, target.id, SUPER_ADMIN).await? {
        return Err(auth.forbidden(Message::CannotDeleteSuperAdmin));
    }

    db::users::delete(&state.pool, target.id).await?;
    state.permissions.forget(target.id);

    if let Some(filename) = target.avatar.as_deref() {
        AvatarStore::new(&state.config.storage_dir)
            .remove(filename)
            .await;
    }

    tracing::info!("User {} deleted user {}", auth.user_id(), target.id);
    Ok(response::message(auth.locale.t(Message::UserDeleted)))
}
