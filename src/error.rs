use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::models::separation::ErrorResponse;
use crate::services::media_host::MediaHostError;
use crate::services::replicate::PredictionError;

/// User-facing message for every pipeline failure.
pub const GENERIC_FAILURE: &str = "Failed to process audio";

/// Failures of the submit -> poll -> relay pipeline.
///
/// Causes are logged where the error is handled; responses only ever carry
/// the generic message (or the not-found / missing-input variants).
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("missing input: {0}")]
    MissingInput(&'static str),

    #[error("submission failed: {0}")]
    Submission(String),

    #[error("processing failed: {0}")]
    Processing(String),

    #[error("relay failed: {0}")]
    Relay(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upload exceeds the body limit")]
    TooLarge,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::MissingInput(_) => StatusCode::BAD_REQUEST,
            PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn submission(err: PredictionError) -> Self {
        PipelineError::Submission(err.to_string())
    }

    pub fn relay(err: MediaHostError) -> Self {
        PipelineError::Relay(err.to_string())
    }
}

impl PipelineError {
    /// Render the error, using `failure_message` as the body of any 500.
    pub fn into_response_with(self, failure_message: &str) -> Response {
        match self {
            PipelineError::NotFound(path) => {
                tracing::warn!(path = %path, "File not found");
                (StatusCode::NOT_FOUND, "File not found").into_response()
            }
            PipelineError::MissingInput(field) => {
                tracing::warn!(field, "Rejected request with missing input");
                let body = ErrorResponse {
                    error: format!("Missing {field}"),
                };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            PipelineError::TooLarge => {
                tracing::warn!("Rejected upload over the body limit");
                let body = ErrorResponse {
                    error: "Audio file is too large".to_string(),
                };
                (StatusCode::PAYLOAD_TOO_LARGE, Json(body)).into_response()
            }
            other => {
                tracing::error!(error = %other, "Audio separation failed");
                let body = ErrorResponse {
                    error: failure_message.to_string(),
                };
                (other.status_code(), Json(body)).into_response()
            }
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        self.into_response_with(GENERIC_FAILURE)
    }
}
