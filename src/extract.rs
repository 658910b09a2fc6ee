use axum::extract::FromRequest;

use crate::error::AppError;

/// `axum::Json` whose rejection renders through [`AppError`] as a 422 envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);
