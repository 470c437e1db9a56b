use crate::services::object_store::StoreError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Error taxonomy for the whole service. Every failure a handler can produce
/// maps onto one of these variants, and every variant maps onto exactly one
/// HTTP status. Bodies are always `{"error": <message>}`.
#[derive(Debug, Error)]
pub enum AppError {
    /// The requested identity is not one of the two configured slots.
    /// The rejected token is carried for logging only; the response body
    /// stays terse.
    #[error("Invalid user")]
    InvalidSlot(String),

    /// An upload declared a media type other than `application/pdf`.
    #[error("Only PDF files are allowed")]
    UnsupportedMediaType,

    /// An upload carried no file field, or a file field with zero bytes.
    #[error("File missing")]
    MissingPayload,

    /// An upload body exceeded the configured size cap.
    #[error("File too large")]
    PayloadTooLarge,

    /// The `admin-password` header was absent or did not match.
    #[error("Unauthorized")]
    Unauthorized,

    /// No stored file satisfies the request. The message varies by call
    /// site ("No files found", "No file found for <slot>", ...).
    #[error("{0}")]
    NotFound(String),

    /// The external object store failed or answered with an error.
    #[error(transparent)]
    Upstream(#[from] StoreError),

    /// A catalog database operation failed.
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// Reading or writing the display-names file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Anything else. The underlying message is surfaced in the response
    /// body rather than masked.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidSlot(_)
            | AppError::UnsupportedMediaType
            | AppError::MissingPayload => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(_)
            | AppError::Database(_)
            | AppError::Io(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Upstream(_)
            | AppError::Database(_)
            | AppError::Io(_)
            | AppError::Internal(_) => {
                tracing::error!("request failed: {:#}", self);
            }
            AppError::InvalidSlot(token) => {
                tracing::debug!("rejected unknown slot token {}", token);
            }
            other => {
                tracing::debug!("client error: {}", other);
            }
        }

        let body = Json(json!({ "error": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}
