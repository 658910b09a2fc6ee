use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use chrono::Utc;
use uuid::Uuid;

use crate::auth::token;
use crate::db;
use crate::error::AppError;
use crate::i18n::{self, Locale, Message};
use crate::models::User;
use crate::rbac::{self, Grants};
use crate::state::SharedState;

/// The authenticated caller, resolved from the bearer token on every request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub token_id: Uuid,
    pub grants: Arc<Grants>,
    pub locale: Locale,
}

impl AuthUser {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    pub fn can(&self, permission: &str) -> bool {
        self.grants.can(permission)
    }

    pub fn is_super_admin(&self) -> bool {
        self.grants.is_super_admin()
    }

    pub fn forbidden(&self, msg: Message) -> AppError {
        AppError::Forbidden(self.locale.t(msg).to_string())
    }

    pub fn require(&self, permission: &str) -> Result<(), AppError> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(self.forbidden(Message::Forbidden))
        }
    }

    pub fn require_any(&self, permissions: &[&str]) -> Result<(), AppError> {
        if self.grants.can_any(permissions) {
            Ok(())
        } else {
            Err(self.forbidden(Message::Forbidden))
        }
    }
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let request_locale = i18n::from_request(&parts.headers, &parts.uri, None);
        let unauthorized = |msg: Message| AppError::Unauthorized(request_locale.t(msg).to_string());

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| unauthorized(Message::Unauthenticated))?;

        let stored = db::access_tokens::find_by_hash(&state.pool, &token::hash(bearer.token()))
            .await?
            .ok_or_else(|| unauthorized(Message::TokenInvalid))?;

        if stored.is_expired(Utc::now()) {
            db::access_tokens::delete(&state.pool, stored.id).await?;
            return Err(unauthorized(Message::TokenExpired));
        }

        let user = db::users::find_by_id(&state.pool, stored.user_id)
            .await?
            .ok_or_else(|| unauthorized(Message::TokenInvalid))?;

        let grants = rbac::grants_for(&state.pool, &state.permissions, user.id).await?;

        if let Err(e) = db::access_tokens::touch(&state.pool, stored.id).await {
            tracing::warn!("Failed to record token use: {e}");
        }

        let locale = i18n::from_request(&parts.headers, &parts.uri, user.locale.as_deref());

        Ok(AuthUser {
            user,
            token_id: stored.id,
            grants,
            locale,
        })
    }
}
