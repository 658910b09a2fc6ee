use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Permission;

pub async fn list_all(pool: &PgPool) -> Result<Vec<Permission>, sqlx::Error> {
    sqlx::query_as::<_, Permission>("SELECT * FROM permissions ORDER BY name")
        .fetch_all(pool)
        .await
}

pub async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM permissions")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

pub async fn find_by_names(pool: &PgPool, names: &[String]) -> Result<Vec<Permission>, sqlx::Error> {
    sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE name = ANY($1)")
        .bind(names)
        .fetch_all(pool)
        .await
}

/// Insert the permission if missing and return it either way.
pub async fn ensure<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    name: &str,
) -> Result<Permission, sqlx::Error> {
    sqlx::query_as::<_, Permission>(
        "INSERT INTO permissions (id, name) VALUES ($1, $2)
         ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(name)
    .fetch_one(executor)
    .await
}

/// Distinct permission names granted to the user through any of their roles.
/// One row per (role, permission) of the user, read in a single statement so roles and
/// permissions come from the same snapshot. Roles without permissions yield `None`.
pub async fn grant_rows(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<(String, Option<String>)>, sqlx::Error> {
    sqlx::query_as::<_, (String, Option<String>)>(
        "SELECT r.name, p.name FROM user_roles ur
         JOIN roles r ON r.id = ur.role_id
         LEFT JOIN role_permissions rp ON rp.role_id = r.id
         LEFT JOIN permissions p ON p.id = rp.permission_id
         WHERE ur.user_id = $1",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn names_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT p.name FROM user_roles ur
         JOIN role_permissions rp ON rp.role_id = ur.role_id
         JOIN permissions p ON p.id = rp.permission_id
         WHERE ur.user_id = $1 ORDER BY p.name",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
