use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const SUPER_ADMIN: &str = "Super Admin";
pub const OWNER: &str = "Owner";
pub const USER: &str = "User";

/// Roles that can never be deleted or renamed.
pub const RESERVED_ROLES: [&str; 3] = [SUPER_ADMIN, OWNER, USER];

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn is_reserved(&self) -> bool {
        RESERVED_ROLES.contains(&self.name.as_str())
    }

    pub fn is_super_admin(&self) -> bool {
        self.name == SUPER_ADMIN
    }
}

/// Role reference embedded in user payloads.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct RoleSummary {
    pub id: Uuid,
    pub name: String,
}
