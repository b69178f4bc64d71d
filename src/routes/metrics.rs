use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Prometheus scrape endpoint for the separation job counters.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}

/// Register descriptions for the metrics the pipeline records.
pub fn describe() {
    metrics::describe_counter!("separation_jobs_total", "Separation jobs submitted");
    metrics::describe_counter!(
        "separation_jobs_completed",
        "Separation jobs that produced both tracks"
    );
    metrics::describe_counter!(
        "separation_jobs_failed",
        "Separation jobs that failed at any stage"
    );
    metrics::describe_counter!(
        "separation_polls_total",
        "Status checks issued against running jobs"
    );
    metrics::describe_histogram!(
        "separation_processing_seconds",
        "Time from submission to relayed results"
    );
}
