use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::Value;

use crate::auth::extractor::AuthUser;
use crate::auth::password;
use crate::db;
use crate::db::users::UserFields;
use crate::error::{AppError, is_unique_violation};
use crate::extract::ApiJson;
use crate::i18n::{Locale, Message};
use crate::response::{self, SessionUser};
use crate::state::SharedState;
use crate::validation::{Validator, optional};

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub timezone: Option<String>,
    pub bio: Option<String>,
    /// Absent leaves the stored preference alone; an empty string clears it.
    pub locale: Option<String>,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
}

pub async fn update(
    State(state): State<SharedState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<Json<Value>, AppError> {
    auth.require("edit_profile")?;

    let mut v = Validator::new(auth.locale);
    let name = v.required("name", req.name.as_deref());
    v.max_len("name", name, 255);
    let email = v.required("email", req.email.as_deref()).map(str::to_lowercase);
    if let Some(email) = email.as_deref() {
        v.email("email", email);
        v.max_len("email", Some(email), 255);
        if !v.has("email") && db::users::email_taken(&state.pool, email, Some(auth.user_id())).await? {
            v.add("email", Message::Unique, &[]);
        }
    }
    let phone = optional(req.phone.as_deref());
    v.max_len("phone", phone, 20);
    let timezone = optional(req.timezone.as_deref());
    v.max_len("timezone", timezone, 50);
    let bio = optional(req.bio.as_deref());
    v.max_len("bio", bio, 500);
    let locale = req.locale.as_deref().map(|code| optional(Some(code)));
    if let Some(Some(code)) = locale {
        if Locale::from_code(code).is_none() {
            v.add("locale", Message::In, &[]);
        }
    }
    v.finish()?;

    let email = email.unwrap_or_default();
    let fields = UserFields {
        name: name.unwrap_or_default(),
        email: &email,
        phone,
        timezone,
        bio,
    };

    let mut tx = state.pool.begin().await?;
    let mut user = db::users::update_fields(&mut *tx, auth.user_id(), &fields)
        .await
        .map_err(|e| unique_email(e, auth.locale))?;
    if let Some(code) = locale {
        let code = code.and_then(Locale::from_code).map(Locale::code);
        user = db::users::update_locale(&mut *tx, auth.user_id(), code).await?;
    }
    tx.commit().await?;

    let reply_locale = match locale {
        Some(_) => user.locale.as_deref().and_then(Locale::from_code).unwrap_or(auth.locale),
        None => auth.locale,
    };

    Ok(response::with_message(
        reply_locale.t(Message::ProfileUpdated),
        SessionUser::new(&state.config, user, &auth.grants),
    ))
}

pub async fn change_password(
    State(state): State<SharedState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> Result<Json<Value>, AppError> {
    let mut v = Validator::new(auth.locale);
    let current = v.required_secret("current_password", req.current_password.as_deref());
    let new_password = v.required_secret("password", req.password.as_deref());
    if let Some(new_password) = new_password {
        v.min_len("password", new_password, 8);
        v.confirmed("password", new_password, req.password_confirmation.as_deref());
    }
    v.finish()?;

    let valid = password::verify(current.unwrap_or_default(), &auth.user.password_hash)
        .map_err(AppError::Internal)?;
    if !valid {
        return Err(AppError::field(
            auth.locale.t(Message::ValidationFailed),
            "current_password",
            auth.locale.t(Message::OldPasswordIncorrect),
        ));
    }

    let hash = password::hash(new_password.unwrap_or_default()).map_err(AppError::Internal)?;
    let mut tx = state.pool.begin().await?;
    db::users::update_password(&mut *tx, auth.user_id(), &hash).await?;
    db::access_tokens::delete_others_for_user(&mut *tx, auth.user_id(), auth.token_id).await?;
    tx.commit().await?;

    tracing::info!("User {} changed their password", auth.user_id());
    Ok(response::message(auth.locale.t(Message::PasswordChanged)))
}

/// Map a race on the unique email index to the same field error the pre-check produces.
pub(crate) fn unique_email(err: sqlx::Error, locale: Locale) -> AppError {
    if is_unique_violation(&err) {
        AppError::field(
            locale.t(Message::ValidationFailed),
            "email",
            locale.format(Message::Unique, &[("attribute", "email")]),
        )
    } else {
        err.into()
    }
}
