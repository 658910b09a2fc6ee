use sqlx::PgPool;
use uuid::Uuid;

use crate::db::like_pattern;
use crate::models::{Permission, Role, SUPER_ADMIN};

pub async fn list(
    pool: &PgPool,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Role>, i64), sqlx::Error> {
    let pattern = search.map(like_pattern);

    let roles = sqlx::query_as::<_, Role>(
        "SELECT * FROM roles WHERE ($1::text IS NULL OR name ILIKE $1)
         ORDER BY created_at, name LIMIT $2 OFFSET $3",
    )
    .bind(pattern.as_deref())
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM roles WHERE ($1::text IS NULL OR name ILIKE $1)")
            .bind(pattern.as_deref())
            .fetch_one(pool)
            .await?;

    Ok((roles, total.0))
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Role>, sqlx::Error> {
    sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_names(pool: &PgPool, names: &[String]) -> Result<Vec<Role>, sqlx::Error> {
    sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE name = ANY($1)")
        .bind(names)
        .fetch_all(pool)
        .await
}

pub async fn name_taken(pool: &PgPool, name: &str, except: Option<Uuid>) -> Result<bool, sqlx::Error> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM roles WHERE name = $1 AND ($2::uuid IS NULL OR id <> $2))",
    )
    .bind(name)
    .bind(except)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(executor: E, name: &str) -> Result<Role, sqlx::Error> {
    sqlx::query_as::<_, Role>("INSERT INTO roles (id, name) VALUES ($1, $2) RETURNING *")
        .bind(Uuid::now_v7())
        .bind(name)
        .fetch_one(executor)
        .await
}

/// Insert the role if missing and return it either way.
pub async fn ensure<'e, E: sqlx::PgExecutor<'e>>(executor: E, name: &str) -> Result<Role, sqlx::Error> {
    sqlx::query_as::<_, Role>(
        "INSERT INTO roles (id, name) VALUES ($1, $2)
         ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(name)
    .fetch_one(executor)
    .await
}

pub async fn rename<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    name: &str,
) -> Result<Role, sqlx::Error> {
    sqlx::query_as::<_, Role>(
        "UPDATE roles SET name = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(name)
    .fetch_one(executor)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM roles WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn permissions_for<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    role_id: Uuid,
) -> Result<Vec<Permission>, sqlx::Error> {
    sqlx::query_as::<_, Permission>(
        "SELECT p.* FROM permissions p
         JOIN role_permissions rp ON rp.permission_id = p.id
         WHERE rp.role_id = $1 ORDER BY p.name",
    )
    .bind(role_id)
    .fetch_all(executor)
    .await
}

#[derive(sqlx::FromRow)]
pub struct RolePermission {
    pub role_id: Uuid,
    #[sqlx(flatten)]
    pub permission: Permission,
}

pub async fn permissions_for_many(
    pool: &PgPool,
    role_ids: &[Uuid],
) -> Result<Vec<RolePermission>, sqlx::Error> {
    sqlx::query_as::<_, RolePermission>(
        "SELECT rp.role_id, p.* FROM role_permissions rp
         JOIN permissions p ON p.id = rp.permission_id
         WHERE rp.role_id = ANY($1) ORDER BY p.name",
    )
    .bind(role_ids)
    .fetch_all(pool)
    .await
}

/// Replace the role's permission set. Call inside a transaction.
pub async fn sync_permissions(
    conn: &mut sqlx::PgConnection,
    role_id: Uuid,
    permission_ids: &[Uuid],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
        .bind(role_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        "INSERT INTO role_permissions (role_id, permission_id)
         SELECT $1, unnest($2::uuid[]) ON CONFLICT DO NOTHING",
    )
    .bind(role_id)
    .bind(permission_ids)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Grant every existing permission to the Super Admin role.
pub async fn sync_super_admin<'e, E: sqlx::PgExecutor<'e>>(executor: E) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO role_permissions (role_id, permission_id)
         SELECT r.id, p.id FROM roles r CROSS JOIN permissions p
         WHERE r.name = $1
         ON CONFLICT DO NOTHING",
    )
    .bind(SUPER_ADMIN)
    .execute(executor)
    .await?;
    Ok(())
}
