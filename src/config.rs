use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub base_url: String,
    pub frontend_url: String,
    pub storage_dir: PathBuf,
    pub token_ttl_minutes: Option<i64>,
    pub max_body_size: usize,
    pub cors_origins: Vec<String>,
    pub log_level: String,
    pub smtp: Option<SmtpConfig>,
    pub admin: Option<AdminSeed>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

/// Initial Super Admin account created by the seeder when it does not exist yet.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;

        let host: IpAddr = env_or("DASHBOARD_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid DASHBOARD_HOST: {e}"))?;

        let port: u16 = env_or("DASHBOARD_PORT", "8000")
            .parse()
            .map_err(|e| format!("Invalid DASHBOARD_PORT: {e}"))?;

        let base_url = env_or("DASHBOARD_BASE_URL", &format!("http://{host}:{port}"));
        let frontend_url = env_or("DASHBOARD_FRONTEND_URL", &base_url);
        let storage_dir = PathBuf::from(env_or("DASHBOARD_STORAGE_DIR", "storage"));

        let token_ttl_minutes = match std::env::var("DASHBOARD_TOKEN_TTL_MINUTES") {
            Ok(v) if !v.trim().is_empty() => Some(
                v.trim()
                    .parse::<i64>()
                    .map_err(|e| format!("Invalid DASHBOARD_TOKEN_TTL_MINUTES: {e}"))?,
            ),
            _ => None,
        };

        let max_body_size: usize = env_or("DASHBOARD_MAX_BODY_SIZE", "4194304")
            .parse()
            .map_err(|e| format!("Invalid DASHBOARD_MAX_BODY_SIZE: {e}"))?;

        let cors_origins: Vec<String> = env_or("DASHBOARD_CORS_ORIGINS", "")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let log_level = env_or("DASHBOARD_LOG_LEVEL", "info");

        let smtp = match (
            std::env::var("DASHBOARD_SMTP_HOST").ok(),
            std::env::var("DASHBOARD_SMTP_PORT").ok(),
            std::env::var("DASHBOARD_SMTP_USER").ok(),
            std::env::var("DASHBOARD_SMTP_PASS").ok(),
            std::env::var("DASHBOARD_SMTP_FROM").ok(),
        ) {
            (Some(host), Some(port), Some(user), Some(pass), Some(from)) => Some(SmtpConfig {
                host,
                port: port
                    .parse()
                    .map_err(|e| format!("Invalid DASHBOARD_SMTP_PORT: {e}"))?,
                user,
                pass,
                from,
            }),
            _ => None,
        };

        let admin = match (
            std::env::var("DASHBOARD_ADMIN_EMAIL").ok(),
            std::env::var("DASHBOARD_ADMIN_PASSWORD").ok(),
        ) {
            (Some(email), Some(password)) => Some(AdminSeed {
                email,
                password,
                name: env_or("DASHBOARD_ADMIN_NAME", "Super Administrator"),
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            host,
            port,
            base_url,
            frontend_url,
            storage_dir,
            token_ttl_minutes,
            max_body_size,
            cors_origins,
            log_level,
            smtp,
            admin,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
