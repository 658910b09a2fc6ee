use axum::Json;
use axum::extract::State;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::auth::extractor::AuthUser;
use crate::auth::{password, token};
use crate::db;
use crate::error::AppError;
use crate::extract::ApiJson;
use crate::i18n::{Locale, Message};
use crate::rbac;
use crate::response::{self, SessionUser};
use crate::state::SharedState;
use crate::validation::Validator;

const TOKEN_NAME: &str = "dashboard";
const RESET_TOKEN_TTL_MINUTES: i64 = 60;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
}

pub async fn login(
    State(state): State<SharedState>,
    locale: Locale,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let mut v = Validator::new(locale);
    let email = v.required("email", req.email.as_deref());
    if let Some(email) = email {
        v.email("email", email);
    }
    let password = v.required_secret("password", req.password.as_deref());
    v.finish()?;

    let email = email.unwrap_or_default().to_lowercase();
    let password = password.unwrap_or_default();

    if let Err(seconds) = state.login_limiter.check(&email) {
        return Err(AppError::RateLimited(
            locale.format(Message::AuthThrottle, &[("seconds", &seconds.to_string())]),
        ));
    }

    let invalid = || AppError::Unauthorized(locale.t(Message::AuthFailed).to_string());

    let Some(user) = db::users::find_by_email(&state.pool, &email).await? else {
        password::verify_dummy(password);
        state.login_limiter.record_failure(&email);
        return Err(invalid());
    };

    let valid = password::verify(password, &user.password_hash).map_err(AppError::Internal)?;
    if !valid {
        state.login_limiter.record_failure(&email);
        return Err(invalid());
    }

    state.login_limiter.reset(&email);

    let plaintext = token::generate();
    let expires_at = state
        .config
        .token_ttl_minutes
        .map(|minutes| Utc::now() + Duration::minutes(minutes));
    db::access_tokens::create(
        &state.pool,
        user.id,
        TOKEN_NAME,
        &token::hash(&plaintext),
        expires_at,
    )
    .await?;

    let grants = rbac::grants_for(&state.pool, &state.permissions, user.id).await?;
    tracing::info!("User {} logged in", user.id);

    Ok(response::with_message(
        locale.t(Message::LoginSuccess),
        json!({
            "user": SessionUser::new(&state.config, user, &grants),
            "token": plaintext,
            "token_type": "Bearer",
            "expires_at": expires_at,
        }),
    ))
}

pub async fn logout(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> Result<Json<Value>, AppError> {
    db::access_tokens::delete(&state.pool, auth.token_id).await?;
    Ok(response::message(auth.locale.t(Message::LogoutSuccess)))
}

pub async fn me(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> Result<Json<Value>, AppError> {
    let message = auth.locale.t(Message::UserRetrieved);
    Ok(response::with_message(
        message,
        SessionUser::new(&state.config, auth.user, &auth.grants),
    ))
}

pub async fn forgot_password(
    State(state): State<SharedState>,
    locale: Locale,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    let mut v = Validator::new(locale);
    let email = v.required("email", req.email.as_deref());
    if let Some(email) = email {
        v.email("email", email);
    }
    v.finish()?;
    let email = email.unwrap_or_default().to_lowercase();

    // Same response whether or not the account exists; the lookup and mail run detached.
    let response = response::message(locale.t(Message::ResetLinkSent));

    let pool = state.pool.clone();
    let mailer = state.system_mailer.clone();
    let frontend_url = state.config.frontend_url.trim_end_matches('/').to_string();

    tokio::spawn(async move {
        let user = match db::users::find_by_email(&pool, &email).await {
            Ok(Some(user)) => user,
            Ok(None) => return,
            Err(e) => {
                tracing::error!("Password reset lookup failed: {e}");
                return;
            }
        };

        let plaintext = token::generate();
        let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        if let Err(e) =
            db::password_reset_tokens::replace(&pool, user.id, &token::hash(&plaintext), expires_at)
                .await
        {
            tracing::error!("Failed to store password reset token: {e}");
            return;
        }

        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("token", &plaintext)
            .append_pair("email", &user.email)
            .finish();
        let reset_url = format!("{frontend_url}/reset-password?{query}");

        let user_locale = user
            .locale
            .as_deref()
            .and_then(Locale::from_code)
            .unwrap_or(locale);

        match mailer {
            Some(mailer) => {
                if let Err(e) = mailer
                    .send_password_reset(&user.email, &user.name, &reset_url, user_locale)
                    .await
                {
                    tracing::error!("Failed to send password reset email: {e}");
                }
            }
            None => {
                tracing::warn!("System SMTP not configured. Password reset link: {reset_url}");
            }
        }
    });

    Ok(response)
}

pub async fn reset_password(
    State(state): State<SharedState>,
    locale: Locale,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    let mut v = Validator::new(locale);
    let reset_token = v.required("token", req.token.as_deref());
    let email = v.required("email", req.email.as_deref());
    if let Some(email) = email {
        v.email("email", email);
    }
    let password = v.required_secret("password", req.password.as_deref());
    if let Some(password) = password {
        v.min_len("password", password, 8);
        v.confirmed("password", password, req.password_confirmation.as_deref());
    }
    v.finish()?;

    let invalid = || AppError::BadRequest(locale.t(Message::ResetTokenInvalid).to_string());

    let stored = db::password_reset_tokens::find_valid_by_hash(
        &state.pool,
        &token::hash(reset_token.unwrap_or_default()),
    )
    .await?
    .ok_or_else(invalid)?;

    let user = db::users::find_by_id(&state.pool, stored.user_id)
        .await?
        .ok_or_else(invalid)?;
    if user.email != email.unwrap_or_default().to_lowercase() {
        return Err(invalid());
    }

    let hash = password::hash(password.unwrap_or_default()).map_err(AppError::Internal)?;

    let mut tx = state.pool.begin().await?;
    if !db::password_reset_tokens::mark_used(&mut *tx, stored.id).await? {
        return Err(invalid());
    }
    db::users::update_password(&mut *tx, user.id, &hash).await?;
    db::access_tokens::delete_all_for_user(&mut *tx, user.id).await?;
    tx.commit().await?;

    tracing::info!("Password reset for user {}", user.id);
    Ok(response::message(locale.t(Message::PasswordResetDone)))
}
