use axum::Json;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::avatar::{self, AvatarSize, AvatarStore, ImageKind};
use crate::db;
use crate::error::AppError;
use crate::i18n::Message;
use crate::response;
use crate::state::SharedState;
use crate::validation::Validator;

const FIELD: &str = "avatar";

/// Pull the `avatar` part out of a multipart body.
async fn read_avatar_field(headers: &HeaderMap, body: Bytes) -> Result<Option<Bytes>, String> {
    let boundary = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .ok_or_else(|| "Missing multipart boundary".to_string())?;

    let stream = futures_util::stream::once(async { Ok::<_, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Multipart error: {e}"))?
    {
        if field.name() == Some(FIELD) {
            let data = field
                .bytes()
                .await
                .map_err(|e| format!("Field read error: {e}"))?;
            return Ok(Some(data));
        }
    }

    Ok(None)
}

fn add_too_large(v: &mut Validator) {
    let kilobytes = (avatar::MAX_BYTES / 1024).to_string();
    v.add(FIELD, Message::FileMax, &[("max", &kilobytes)]);
}

pub async fn upload(
    State(state): State<SharedState>,
    auth: AuthUser,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Value>, AppError> {
    auth.require("upload_avatar")?;

    let mut v = Validator::new(auth.locale);
    // Bodies cut off by the request size limit fail like any other oversized avatar.
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                add_too_large(&mut v);
            } else {
                tracing::debug!("Unreadable avatar upload body: {rejection}");
                v.add(FIELD, Message::Required, &[]);
            }
            v.finish()?;
            return Err(AppError::BadRequest(rejection.body_text()));
        }
    };
    let data = match read_avatar_field(&headers, body).await {
        Ok(Some(data)) if !data.is_empty() => Some(data),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("Rejected avatar upload: {e}");
            None
        }
    };

    let kind = data.as_deref().and_then(ImageKind::sniff);
    match &data {
        None => v.add(FIELD, Message::Required, &[]),
        Some(data) => {
            if kind.is_none() {
                v.add(FIELD, Message::Image, &[("values", ImageKind::ALLOWED)]);
            }
            if data.len() > avatar::MAX_BYTES {
                add_too_large(&mut v);
            }
        }
    }
    v.finish()?;
    let (Some(data), Some(kind)) = (data, kind) else {
        return Err(AppError::Internal("avatar missing after validation".to_string()));
    };

    let store = AvatarStore::new(&state.config.storage_dir);
    // Time-ordered and unique, so two uploads in the same instant never share a file.
    let filename = format!(
        "{}_{}.{}",
        auth.user_id(),
        Uuid::now_v7().simple(),
        kind.extension()
    );
    store
        .save(&filename, &data)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to store avatar: {e}")))?;

    let change = match db::users::replace_avatar(&state.pool, auth.user_id(), Some(&filename)).await {
        Ok(Some(change)) => change,
        Ok(None) => {
            store.remove(&filename).await;
            return Err(AppError::Unauthorized(auth.locale.t(Message::Unauthenticated).to_string()));
        }
        Err(e) => {
            store.remove(&filename).await;
            return Err(e.into());
        }
    };
    let user = change.user;

    if let Some(previous) = change.previous_avatar.as_deref() {
        store.remove(previous).await;
    }

    tracing::info!("User {} uploaded avatar {filename}", user.id);
    Ok(response::with_message(
        auth.locale.t(Message::AvatarUploaded),
        json!({
            "avatar": filename,
            "avatar_url": avatar::public_url(&state.config, &filename),
        }),
    ))
}

pub async fn delete(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> Result<Json<Value>, AppError> {
    auth.require("delete_avatar")?;

    let not_found = || AppError::NotFound(auth.locale.t(Message::AvatarNotFound).to_string());
    let change = db::users::replace_avatar(&state.pool, auth.user_id(), None)
        .await?
        .ok_or_else(not_found)?;
    let previous = change.previous_avatar.ok_or_else(not_found)?;
    AvatarStore::new(&state.config.storage_dir).remove(&previous).await;
    let user = change.user;

    Ok(response::with_message(
        auth.locale.t(Message::AvatarDeleted),
        json!({
            "avatar": Value::Null,
            "avatar_url": avatar::url_for(&state.config, &user),
        }),
    ))
}

pub async fn show(
    State(state): State<SharedState>,
    auth: AuthUser,
) -> Result<Json<Value>, AppError> {
    Ok(render(&state, &auth, AvatarSize::Original))
}

pub async fn show_sized(
    State(state): State<SharedState>,
    auth: AuthUser,
    Path(size): Path<String>,
) -> Result<Json<Value>, AppError> {
    Ok(render(&state, &auth, AvatarSize::parse(&size)))
}

fn render(state: &SharedState, auth: &AuthUser, size: AvatarSize) -> Json<Value> {
    let user = &auth.user;
    let payload = match user.avatar.as_deref() {
        Some(filename) => json!({
            "avatar": filename,
            "avatar_url": avatar::public_url(&state.config, filename),
            "is_default": false,
            "size": size.pixels(),
        }),
        None => json!({
            "avatar": Value::Null,
            "avatar_url": avatar::default_data_uri(&user.name, &user.email, size.pixels()),
            "is_default": true,
            "size": size.pixels(),
        }),
    };

    response::with_message(auth.locale.t(Message::AvatarRetrieved), payload)
}
