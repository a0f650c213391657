use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use super::response::ApiResponse;
use crate::generator::GenerationError;
use crate::materializer::MaterializeError;

/// Handler error. Internal details are logged server-side; clients only see
/// a sanitized message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<MaterializeError> for ApiError {
    fn from(err: MaterializeError) -> Self {
        match err {
            MaterializeError::NotFound(_) => Self::NotFound("Lesson not found".to_string()),
            MaterializeError::GenerationFailed(e) => Self::Generation(e),
            MaterializeError::PersistenceFailed(reason) => {
                Self::Internal(anyhow::anyhow!("Failed to persist lesson content: {}", reason))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => {
                tracing::warn!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, msg)
            }
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Generation(e) => {
                tracing::warn!("Generation error: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "Failed to generate content, please try again".to_string(),
                )
            }
            Self::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server Error".to_string())
            }
        };

        (status, Json(ApiResponse::<()>::error(message))).into_response()
    }
}
