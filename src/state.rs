use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::email::SystemMailer;
use crate::rate_limit::LoginRateLimiter;
use crate::rbac::PermissionCache;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub permissions: PermissionCache,
    pub login_limiter: LoginRateLimiter,
    pub system_mailer: Option<Arc<SystemMailer>>,
}
