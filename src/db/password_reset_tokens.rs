use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::PasswordResetToken;

/// Store a new reset token, retiring any outstanding one for the same user.
pub async fn replace(
    pool: &PgPool,
    user_id: Uuid,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<PasswordResetToken, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE password_reset_tokens SET used = true WHERE user_id = $1 AND used = false")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let token = sqlx::query_as::<_, PasswordResetToken>(
        "INSERT INTO password_reset_tokens (id, user_id, token_hash, expires_at)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(token)
}

pub async fn find_valid_by_hash(
    pool: &PgPool,
    token_hash: &str,
) -> Result<Option<PasswordResetToken>, sqlx::Error> {
    sqlx::query_as::<_, PasswordResetToken>(
        "SELECT * FROM password_reset_tokens
         WHERE token_hash = $1 AND used = false AND expires_at > now()",
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await
}

/// Consume a reset token. Returns `false` when it was already used or has expired,
/// so two concurrent resets with the same token cannot both succeed.
pub async fn mark_used<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE password_reset_tokens SET used = true
         WHERE id = $1 AND used = false AND expires_at > now()",
    )
    .bind(id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}
