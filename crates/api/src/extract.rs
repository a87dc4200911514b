//! Request body extraction with the API's error envelope.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;

use crate::error::AppError;

/// Drop-in replacement for [`Json`] whose rejection is an `INVALID_JSON`
/// [`AppError`] instead of axum's plain-text response.
///
/// Malformed syntax, a missing `Content-Type`, and values of the wrong type
/// (for example an unparsable timestamp) all end up here.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                tracing::debug!(error = %rejection.body_text(), "Rejected request body");
                Err(AppError::bad_request(
                    "INVALID_JSON",
                    format!("Request body must be valid JSON. {}", rejection.body_text()),
                ))
            }
        }
    }
}
