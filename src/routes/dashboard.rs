//! Dashboard statistics. The numbers are placeholders drawn at random on each call.

use axum::Json;
use chrono::Utc;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;
use serde_json::{Value, json};

use crate::auth::extractor::AuthUser;
use crate::error::AppError;
use crate::i18n::Message;

const FIRST_NAMES: [&str; 15] = [
    "John", "Jane", "Michael", "Sarah", "David", "Emily", "Chris", "Jessica", "Ryan", "Amanda",
    "Kevin", "Lisa", "Daniel", "Maria", "James",
];
const LAST_NAMES: [&str; 15] = [
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson",
];
const ROLE_NAMES: [&str; 10] = [
    "Admin", "Manager", "Supervisor", "Employee", "Editor", "Viewer", "Moderator", "Analyst",
    "Coordinator", "Specialist",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: u32,
    pub total_roles: u32,
    pub active_users: u32,
    pub permissions: u32,
    pub new_users_today: u32,
    pub new_users_this_week: u32,
    pub new_users_this_month: u32,
    pub top_roles: Vec<RoleShare>,
    pub system_status: SystemStatus,
    pub recent_activity: Vec<Activity>,
    pub growth_metrics: GrowthMetrics,
}

#[derive(Debug, Serialize)]
pub struct RoleShare {
    pub name: &'static str,
    pub count: u32,
    pub percentage: u32,
}

#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub database: ServiceStatus,
    pub api_server: ServiceStatus,
    pub cache: ServiceStatus,
    pub storage: ServiceStatus,
}

#[derive(Debug, Serialize)]
pub struct Activity {
    pub id: u32,
    pub icon: &'static str,
    pub color: &'static str,
    pub text: String,
    pub time: String,
}

#[derive(Debug, Serialize)]
pub struct Trend {
    pub current: u32,
    pub previous: u32,
    pub percentage: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthMetrics {
    pub user_growth: Trend,
    pub role_usage: Trend,
    pub active_users: Trend,
}

fn pick(rng: &mut impl Rng, items: &[&'static str]) -> &'static str {
    items.choose(rng).copied().unwrap_or_default()
}

fn random_name(rng: &mut impl Rng) -> String {
    format!("{} {}", pick(rng, &FIRST_NAMES), pick(rng, &LAST_NAMES))
}

fn online(response_time: String) -> ServiceStatus {
    ServiceStatus {
        status: "online",
        response_time: Some(response_time),
        usage: None,
    }
}

impl DashboardStats {
    pub fn random(rng: &mut impl Rng) -> Self {
        let recent_activity = vec![
            Activity {
                id: 1,
                icon: "person_add",
                color: "primary",
                text: format!("New user \"{}\" was created", random_name(rng)),
                time: format!("{} minutes ago", rng.random_range(1..=5)),
            },
            Activity {
                id: 2,
                icon: "edit",
                color: "secondary",
                text: format!("User \"{}\" updated their profile", random_name(rng)),
                time: format!("{} hours ago", rng.random_range(1..=3)),
            },
            Activity {
                id: 3,
                icon: "admin_panel_settings",
                color: "positive",
                text: format!("Role \"{}\" permissions updated", pick(rng, &ROLE_NAMES)),
                time: format!("{} hours ago", rng.random_range(2..=8)),
            },
            Activity {
                id: 4,
                icon: "login",
                color: "info",
                text: format!("User \"{}\" logged in", random_name(rng)),
                time: format!("{} hours ago", rng.random_range(3..=12)),
            },
            Activity {
                id: 5,
                icon: "security",
                color: "warning",
                text: "Security settings updated".to_string(),
                time: format!("{} days ago", rng.random_range(1..=3)),
            },
        ];

        let cache_status = if rng.random_range(0..=10) > 7 { "warning" } else { "online" };

        DashboardStats {
            total_users: rng.random_range(100..=500),
            total_roles: rng.random_range(5..=15),
            active_users: rng.random_range(20..=100),
            permissions: rng.random_range(15..=50),
            new_users_today: rng.random_range(0..=20),
            new_users_this_week: rng.random_range(5..=50),
            new_users_this_month: rng.random_range(20..=150),
            top_roles: vec![
                RoleShare {
                    name: "Admin",
                    count: rng.random_range(1..=5),
                    percentage: rng.random_range(5..=15),
                },
                RoleShare {
                    name: "Manager",
                    count: rng.random_range(5..=20),
                    percentage: rng.random_range(15..=35),
                },
                RoleShare {
                    name: "Employee",
                    count: rng.random_range(20..=100),
                    percentage: rng.random_range(40..=70),
                },
                RoleShare {
                    name: "Guest",
                    count: rng.random_range(10..=50),
                    percentage: rng.random_range(10..=25),
                },
            ],
            system_status: SystemStatus {
                database: online(format!("{}ms", rng.random_range(5..=25))),
                api_server: online(format!("{}ms", rng.random_range(10..=50))),
                cache: ServiceStatus {
                    status: cache_status,
                    response_time: Some(format!("{}ms", rng.random_range(1..=10))),
                    usage: None,
                },
                storage: ServiceStatus {
                    status: "online",
                    response_time: None,
                    usage: Some(format!("{}%", rng.random_range(30..=85))),
                },
            },
            recent_activity,
            growth_metrics: GrowthMetrics {
                user_growth: Trend {
                    current: rng.random_range(100..=500),
                    previous: rng.random_range(80..=450),
                    percentage: rng.random_range(5..=25),
                },
                role_usage: Trend {
                    current: rng.random_range(5..=15),
                    previous: rng.random_range(4..=12),
                    percentage: rng.random_range(0..=15),
                },
                active_users: Trend {
                    current: rng.random_range(20..=100),
                    previous: rng.random_range(15..=85),
                    percentage: rng.random_range(3..=20),
                },
            },
        }
    }
}

pub async fn stats(auth: AuthUser) -> Result<Json<Value>, AppError> {
    auth.require("view_dashboard")?;

    let stats = DashboardStats::random(&mut rand::rng());
    Ok(Json(json!({
        "success": true,
        "data": stats,
        "message": auth.locale.t(Message::StatsRetrieved),
        "timestamp": Utc::now(),
    })))
}
