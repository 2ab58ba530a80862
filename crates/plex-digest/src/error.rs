//! Error types for the webhook endpoint.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use digest_core::{RecordError, StoreError};
use thiserror::Error;

/// Errors that can occur while ingesting a notification.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Payload missing, unreadable or not a valid notification.
    #[error("Malformed notification: {0}")]
    Malformed(String),

    /// The record could not be durably buffered.
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// The thumbnail could not be stored.
    #[error("Image error: {0}")]
    Image(#[from] std::io::Error),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RecordError> for WebhookError {
    fn from(err: RecordError) -> Self {
        WebhookError::Malformed(err.to_string())
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::Malformed(msg) => {
                tracing::warn!("Rejected notification: {}", msg);
                StatusCode::BAD_REQUEST
            }
            WebhookError::Persistence(err) => {
                tracing::error!("Persistence error: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            WebhookError::Image(err) => {
                tracing::error!("Image error: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            WebhookError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, Json(body)).into_response()
    }
}

/// Result type for webhook handlers.
pub type Result<T> = std::result::Result<T, WebhookError>;
