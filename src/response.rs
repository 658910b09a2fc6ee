use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::avatar;
use crate::config::Config;
use crate::models::{Permission, Role, RoleSummary, User};
use crate::rbac::Grants;

pub fn with_message<T: Serialize>(message: &str, data: T) -> Json<Value> {
    Json(json!({ "success": true, "message": message, "data": data }))
}

pub fn message(message: &str) -> Json<Value> {
    Json(json!({ "success": true, "message": message }))
}

pub const DEFAULT_PER_PAGE: i64 = 15;
pub const MAX_PER_PAGE: i64 = 100;
/// Pages past this are clamped so offsets stay far from `i64` overflow.
pub const MAX_PAGE: i64 = 1_000_000;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub search: Option<String>,
    pub role: Option<String>,
}

impl ListQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.per_page())
    }

    pub fn search(&self) -> Option<&str> {
        non_empty(self.search.as_deref())
    }

    pub fn role(&self) -> Option<&str> {
        non_empty(self.role.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Length-aware page of results.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub current_page: i64,
    pub data: Vec<T>,
    pub per_page: i64,
    pub total: i64,
    pub last_page: i64,
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: i64, query: &ListQuery) -> Self {
        let per_page = query.per_page();
        let current_page = query.page();
        let last_page = (total.saturating_add(per_page - 1) / per_page).max(1);
        let (from, to) = if data.is_empty() {
            (None, None)
        } else {
            let from = query.offset().saturating_add(1);
            let to = from.saturating_add(data.len() as i64 - 1);
            (Some(from), Some(to))
        };

        Page {
            current_page,
            data,
            per_page,
            total,
            last_page,
            from,
            to,
        }
    }
}

/// The authenticated user as returned by login, `me` and profile updates.
#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub phone: Option<String>,
    pub timezone: Option<String>,
    pub bio: Option<String>,
    pub locale: Option<String>,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionUser {
    pub fn new(config: &Config, user: User, grants: &Grants) -> Self {
        SessionUser {
            avatar: avatar::url_for(config, &user),
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            timezone: user.timezone,
            bio: user.bio,
            locale: user.locale,
            email_verified_at: user.email_verified_at,
            roles: grants.roles.iter().cloned().collect(),
            permissions: grants.permissions.iter().cloned().collect(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// A user as seen by the user-management screens.
#[derive(Debug, Serialize)]
pub struct UserPayload {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub phone: Option<String>,
    pub timezone: Option<String>,
    pub bio: Option<String>,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub roles: Vec<RoleSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserPayload {
    pub fn new(config: &Config, user: User, roles: Vec<RoleSummary>) -> Self {
        UserPayload {
            avatar: avatar::url_for(config, &user),
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            timezone: user.timezone,
            bio: user.bio,
            email_verified_at: user.email_verified_at,
            roles,
            permissions: None,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }

    pub fn with_permissions(mut self, permissions: Vec<String>) -> Self {
        self.permissions = Some(permissions);
        self
    }
}

#[derive(Debug, Serialize)]
pub struct RolePayload {
    pub id: Uuid,
    pub name: String,
    pub permissions: Vec<Permission>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RolePayload {
    pub fn new(role: Role, permissions: Vec<Permission>) -> Self {
        RolePayload {
            id: role.id,
            name: role.name,
            permissions,
            created_at: role.created_at,
            updated_at: role.updated_at,
        }
    }
}
