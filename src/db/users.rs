use sqlx::PgPool;
use uuid::Uuid;

use crate::db::like_pattern;
use crate::models::{RoleSummary, User};

/// Editable profile columns shared by admin create/update and self-service profile edits.
pub struct UserFields<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub timezone: Option<&'a str>,
    pub bio: Option<&'a str>,
}

pub struct UserFilter<'a> {
    pub search: Option<&'a str>,
    pub role: Option<&'a str>,
    pub limit: i64,
    pub offset: i64,
}

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    fields: &UserFields<'_>,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (id, name, email, password_hash, phone, timezone, bio)
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(fields.name)
    .bind(fields.email)
    .bind(password_hash)
    .bind(fields.phone)
    .bind(fields.timezone)
    .bind(fields.bio)
    .fetch_one(executor)
    .await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// True when another user already owns `email`.
pub async fn email_taken(
    pool: &PgPool,
    email: &str,
    except: Option<Uuid>,
) -> Result<bool, sqlx::Error> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2))",
    )
    .bind(email)
    .bind(except)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

pub async fn update_fields<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    fields: &UserFields<'_>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET name = $2, email = $3, phone = $4, timezone = $5, bio = $6,
                updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(fields.name)
    .bind(fields.email)
    .bind(fields.phone)
    .bind(fields.timezone)
    .bind(fields.bio)
    .fetch_one(executor)
    .await
}

pub async fn update_locale<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    locale: Option<&str>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET locale = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(locale)
    .fetch_one(executor)
    .await
}

pub async fn update_password<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    password_hash: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(executor)
        .await?;
    Ok(())
}

#[derive(sqlx::FromRow)]
pub struct AvatarChange {
    #[sqlx(flatten)]
    pub user: User,
    pub previous_avatar: Option<String>,
}

/// Swap the stored avatar file name, returning the one it replaced. The row is locked
/// while the old value is read, so concurrent swaps each see the file they displaced.
/// Clearing an already-empty avatar writes nothing and returns `None`.
pub async fn replace_avatar(
    pool: &PgPool,
    id: Uuid,
    avatar: Option<&str>,
) -> Result<Option<AvatarChange>, sqlx::Error> {
    sqlx::query_as::<_, AvatarChange>(
        "WITH previous AS (SELECT id, avatar FROM users WHERE id = $1 FOR UPDATE)
         UPDATE users u SET avatar = $2, updated_at = now()
         FROM previous
         WHERE u.id = previous.id AND ($2::text IS NOT NULL OR previous.avatar IS NOT NULL)
         RETURNING u.*, previous.avatar AS previous_avatar",
    )
    .bind(id)
    .bind(avatar)
    .fetch_optional(pool)
    .await
}

pub async fn mark_email_verified<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET email_verified_at = now() WHERE id = $1 AND email_verified_at IS NULL")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

const FILTER: &str = "($1::text IS NULL OR u.name ILIKE $1 OR u.email ILIKE $1)
     AND ($2::text IS NULL OR EXISTS (
         SELECT 1 FROM user_roles ur JOIN roles r ON r.id = ur.role_id
         WHERE ur.user_id = u.id AND r.name = $2))";

/// One page of users plus the total number of matches.
pub async fn list(pool: &PgPool, filter: &UserFilter<'_>) -> Result<(Vec<User>, i64), sqlx::Error> {
    let pattern = filter.search.map(like_pattern);

    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT u.* FROM users u WHERE {FILTER} ORDER BY u.created_at DESC LIMIT $3 OFFSET $4"
    ))
    .bind(pattern.as_deref())
    .bind(filter.role)
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM users u WHERE {FILTER}"))
        .bind(pattern.as_deref())
        .bind(filter.role)
        .fetch_one(pool)
        .await?;

    Ok((users, total.0))
}

pub async fn roles_for(pool: &PgPool, user_id: Uuid) -> Result<Vec<RoleSummary>, sqlx::Error> {
    sqlx::query_as::<_, RoleSummary>(
        "SELECT r.id, r.name FROM roles r
         JOIN user_roles ur ON ur.role_id = r.id
         WHERE ur.user_id = $1 ORDER BY r.name",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

#[derive(sqlx::FromRow)]
pub struct UserRole {
    pub user_id: Uuid,
    #[sqlx(flatten)]
    pub role: RoleSummary,
}

/// Role assignments for a batch of users, used when rendering list pages.
pub async fn roles_for_many(pool: &PgPool, user_ids: &[Uuid]) -> Result<Vec<UserRole>, sqlx::Error> {
    sqlx::query_as::<_, UserRole>(
        "SELECT ur.user_id, r.id, r.name FROM user_roles ur
         JOIN roles r ON r.id = ur.role_id
         WHERE ur.user_id = ANY($1) ORDER BY r.name",
    )
    .bind(user_ids)
    .fetch_all(pool)
    .await
}

/// Replace the user's role set. Call inside a transaction.
pub async fn sync_roles(
    conn: &mut sqlx::PgConnection,
    user_id: Uuid,
    role_ids: &[Uuid],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        "INSERT INTO user_roles (user_id, role_id)
         SELECT $1, unnest($2::uuid[]) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(role_ids)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn has_role(pool: &PgPool, user_id: Uuid, role_name: &str) -> Result<bool, sqlx::Error> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS (
             SELECT 1 FROM user_roles ur JOIN roles r ON r.id = ur.role_id
             WHERE ur.user_id = $1 AND r.name = $2)",
    )
    .bind(user_id)
    .bind(role_name)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}
