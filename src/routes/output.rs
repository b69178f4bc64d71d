use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::{header, HeaderValue};
use axum::response::Response;
use tower_http::services::ServeFile;

use crate::app_state::AppState;
use crate::error::PipelineError;

/// `attachment` disposition carrying the original file name when it fits in a header.
fn attachment(file_name: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// GET /output/{*path}: stream a separated track from disk.
pub async fn download_output(
    State(state): State<AppState>,
    Path(requested): Path<String>,
    request: Request,
) -> Result<Response, PipelineError> {
    let outputs = state
        .backend
        .outputs()
        .ok_or_else(|| PipelineError::NotFound(requested.clone()))?;

    let path = outputs.resolve(&requested).await?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("download")
        .to_string();

    let mut response = ServeFile::new(&path)
        .try_call(request)
        .await?
        .map(Body::new);

    if response.status().is_success() {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, attachment(&file_name));
    }

    Ok(response)
}
