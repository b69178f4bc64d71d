pub mod health;
pub mod metrics;
pub mod output;
pub mod separate;
pub mod upload;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::response::Html;
use axum::{routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Build the HTTP router. `/metrics` is only mounted when a recorder is installed.
pub fn router(state: AppState, prometheus: Option<Arc<PrometheusHandle>>) -> Router {
    let body_limit = state.max_upload_bytes;

    let mut api = Router::new()
        // Static UI (embedded at compile time)
        .route("/", get(|| async { Html(include_str!("../../static/index.html")) }))
        .route("/health", get(health::health_check))
        .route("/upload", post(upload::upload_audio))
        .route(
            "/api/separate",
            post(separate::separate_audio).fallback(separate::method_not_allowed),
        );

    // Results only live on disk for the local backend.
    if state.backend.outputs().is_some() {
        api = api.route("/output/{*path}", get(output::download_output));
    }

    let mut app = api.with_state(state);

    if let Some(handle) = prometheus {
        app = app.route("/metrics", get(metrics::prometheus_metrics).with_state(handle));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
}
