use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use super::auth::PasswordError;
use crate::store::StoreError;

pub const UNAUTHENTICATED_MESSAGE: &str = "Basic Auth Required.";
pub const DUPLICATE_USERNAME_MESSAGE: &str = "Username already in use";
pub const PASSWORD_TOO_LONG_MESSAGE: &str = "Password must be at most 72 bytes";
const BASIC_CHALLENGE: &str = r#"Basic realm="tripstore""#;

/// Terminal outcome of a failed request.
#[derive(Debug)]
pub enum ApiError {
    /// A required field is missing or the body has the wrong shape.
    Validation(&'static str),
    DuplicateUsername,
    /// Any credential problem; the cause is never revealed.
    Unauthenticated,
    /// Unknown id and foreign id alike.
    NotFound,
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            Self::DuplicateUsername => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": DUPLICATE_USERNAME_MESSAGE })),
            )
                .into_response(),
            Self::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                [(WWW_AUTHENTICATE, HeaderValue::from_static(BASIC_CHALLENGE))],
                Json(json!({ "error": UNAUTHENTICATED_MESSAGE })),
            )
                .into_response(),
            Self::NotFound => StatusCode::NOT_FOUND.into_response(),
            Self::Internal(message) => {
                error!("Failed to handle request: {message}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(_) => Self::DuplicateUsername,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::TooLong => Self::Validation(PASSWORD_TOO_LONG_MESSAGE),
            other => Self::Internal(other.to_string()),
        }
    }
}
