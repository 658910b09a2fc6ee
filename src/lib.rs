pub mod auth;
pub mod avatar;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod extract;
pub mod i18n;
pub mod models;
pub mod rate_limit;
pub mod rbac;
pub mod response;
pub mod routes;
pub mod seed;
pub mod state;
pub mod validation;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Method, header};
use sqlx::PgPool;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::email::SystemMailer;
use crate::rate_limit::LoginRateLimiter;
use crate::rbac::PermissionCache;
use crate::state::{AppState, SharedState};

pub fn build_app(pool: PgPool, config: Config) -> (Router, SharedState) {
    // Build system mailer
    let system_mailer = config.smtp.as_ref().and_then(|smtp| match SystemMailer::new(smtp) {
        Ok(mailer) => {
            tracing::info!("System SMTP configured");
            Some(Arc::new(mailer))
        }
        Err(e) => {
            tracing::warn!("System SMTP not available: {e}");
            None
        }
    });

    let storage = ServeDir::new(&config.storage_dir);
    let max_body_size = config.max_body_size;
    let cors = cors_layer(&config.cors_origins);

    let state: SharedState = Arc::new(AppState {
        pool,
        config,
        permissions: PermissionCache::new(),
        login_limiter: LoginRateLimiter::default(),
        system_mailer,
    });

    let app = Router::new()
        .merge(routes::api_routes())
        .nest_service("/storage", storage)
        .route("/health", axum::routing::get(health))
        .fallback(routes::fallback)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state.clone());

    (app, state)
}

/// Allow-list CORS for the configured frontend origins; any origin when none are set.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ACCEPT_LANGUAGE,
            HeaderName::from_static("x-locale"),
        ])
}

async fn health() -> &'static str {
    "ok"
}
