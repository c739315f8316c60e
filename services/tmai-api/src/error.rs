//! Boundary translation from the core error taxonomy to HTTP.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use tmai_core::CoreError;

/// Error response body: every failure returns a structured reason string.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// HTTP-facing wrapper around [`CoreError`].
#[derive(Debug)]
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CoreError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            CoreError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            CoreError::Forbidden { .. } => StatusCode::FORBIDDEN,
            CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            CoreError::AlreadyExists { .. } | CoreError::Conflict { .. } => StatusCode::CONFLICT,
            CoreError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            CoreError::Upstream { .. } | CoreError::EmbeddingMismatch { .. } => {
                error!(error = %self.0, "upstream provider failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            CoreError::Storage(_) | CoreError::Internal { .. } => {
                error!(error = %self.0, "internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}
