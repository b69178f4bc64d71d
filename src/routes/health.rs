use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<ComponentHealth>,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub latency_ms: Option<u64>,
}

/// GET /health: liveness plus a writable-output check for the local backend.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let output_dir = match state.backend.outputs() {
        Some(outputs) => {
            let start = std::time::Instant::now();
            Some(match tokio::fs::create_dir_all(outputs.root()).await {
                Ok(_) => ComponentHealth {
                    status: "ok".to_string(),
                    latency_ms: Some(start.elapsed().as_millis() as u64),
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Output directory is not writable");
                    ComponentHealth {
                        status: "error".to_string(),
                        latency_ms: None,
                    }
                }
            })
        }
        None => None,
    };

    let healthy = output_dir.as_ref().map_or(true, |c| c.status == "ok");
    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: state.backend.kind().to_string(),
        output_dir,
    };

    (status_code, Json(response))
}
