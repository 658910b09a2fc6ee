pub mod auth;
pub mod avatar;
pub mod dashboard;
pub mod permissions;
pub mod profile;
pub mod roles;
pub mod users;

use axum::Router;
use axum::routing::{delete, get, post, put};

use crate::error::AppError;
use crate::i18n::{Locale, Message};
use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        // Profile
        .route("/api/profile", put(profile::update))
        .route("/api/profile/password", put(profile::change_password))
        // Avatar
        .route("/api/avatar/upload", post(avatar::upload))
        .route("/api/avatar/delete", delete(avatar::delete))
        .route("/api/avatar/show", get(avatar::show))
        .route("/api/avatar/show/{size}", get(avatar::show_sized))
        // Users
        .route("/api/users", get(users::index).post(users::store))
        .route(
            "/api/users/{id}",
            get(users::show).put(users::update).delete(users::destroy),
        )
        // Roles
        .route("/api/roles", get(roles::index).post(roles::store))
        .route(
            "/api/roles/{id}",
            get(roles::show).put(roles::update).delete(roles::destroy),
        )
        // Permissions
        .route("/api/permissions", get(permissions::index))
        .route("/api/permissions/grouped", get(permissions::grouped))
        // Dashboard
        .route("/api/dashboard/stats", get(dashboard::stats))
}

/// Unmatched routes answer with the JSON envelope instead of an empty 404.
pub async fn fallback(locale: Locale) -> AppError {
    AppError::NotFound(locale.t(Message::ApiEndpointNotFound).to_string())
}
