use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use garde::Validate;

use crate::app_state::AppState;
use crate::error::PipelineError;
use crate::models::separation::{ErrorResponse, SeparateRequest, SeparateResponse};
use crate::services::backend::AudioInput;

/// Body of every 500 from this endpoint.
const SEPARATION_FAILED: &str = "Audio separation failed.";

/// POST /api/separate: separate audio that is already hosted at `fileUrl`.
pub async fn separate_audio(
    State(state): State<AppState>,
    payload: Result<Json<SeparateRequest>, JsonRejection>,
) -> Result<Json<SeparateResponse>, Response> {
    let missing = || PipelineError::MissingInput("fileUrl or model").into_response();

    let Json(request) = payload.map_err(|_| missing())?;
    request.validate().map_err(|_| missing())?;

    tracing::info!(
        file_url = %request.file_url,
        model = %request.model,
        "Received separation request"
    );

    let urls = state
        .backend
        .separate(&state.policy, AudioInput::Url(request.file_url), &request.model)
        .await
        .map_err(|e| e.into_response_with(SEPARATION_FAILED))?;

    Ok(Json(SeparateResponse {
        vocal: urls.vocal,
        instrumental: urls.instrumental,
    }))
}

/// Any other method on /api/separate.
pub async fn method_not_allowed() -> Response {
    let body = ErrorResponse {
        error: "Only POST method is allowed".to_string(),
    };
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
        Json(body),
    )
        .into_response()
}
