use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app_state::AppState;
use crate::error::PipelineError;
use crate::models::separation::UploadResponse;
use crate::services::backend::AudioInput;

/// Multipart field carrying the audio file.
const AUDIO_FIELD: &str = "audio";

/// A body cut off at the size limit is not a missing field.
fn read_failure(err: MultipartError) -> PipelineError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        PipelineError::TooLarge
    } else {
        PipelineError::Submission(format!("failed to read upload: {}", err.body_text()))
    }
}

/// POST /upload: separate an uploaded audio file into vocal and instrumental tracks.
pub async fn upload_audio(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, PipelineError> {
    let mut audio: Option<AudioInput> = None;

    while let Some(field) = multipart.next_field().await.map_err(read_failure)? {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let data = field.bytes().await.map_err(read_failure)?;

        if !data.is_empty() {
            audio = Some(AudioInput::Upload {
                file_name,
                bytes: data.to_vec(),
            });
        }
    }

    let audio = audio.ok_or(PipelineError::MissingInput(AUDIO_FIELD))?;

    if let AudioInput::Upload { file_name, bytes } = &audio {
        tracing::info!(file_name = %file_name, size = bytes.len(), "Received audio upload");
    }

    let urls = state
        .backend
        .separate(&state.policy, audio, &state.default_model)
        .await?;

    Ok(Json(UploadResponse {
        message: "Audio separation completed successfully.".to_string(),
        vocal_url: urls.vocal,
        instrumental_url: urls.instrumental,
    }))
}
