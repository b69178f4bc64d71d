//! Test helper utilities: app construction, a live server, and upstream fakes

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use audio_separator::app_state::AppState;
use audio_separator::config::{AppConfig, BackendKind};
use audio_separator::routes;
use reqwest::multipart;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::fixtures::*;

/// Status URL the fake Replicate hands out.
pub fn status_url(server: &MockServer) -> String {
    format!("{}/v1/predictions/abc123", server.uri())
}

/// Config for the local backend with `script` run through `sh`.
pub fn local_config(root: &Path, script: &Path) -> AppConfig {
    AppConfig {
        backend: BackendKind::Local,
        output_dir: root.join("output").to_string_lossy().into_owned(),
        upload_dir: root.join("uploads").to_string_lossy().into_owned(),
        separator_program: "sh".to_string(),
        separator_args: vec![script.to_string_lossy().into_owned()],
        ..AppConfig::default()
    }
}

/// Write a shell script body into `dir` and return its path.
pub fn write_tool(dir: &Path, body: &str) -> PathBuf {
    let script = dir.join("tool.sh");
    std::fs::write(&script, body).expect("failed to write fake tool");
    script
}

/// Config for the remote backend with both upstreams served by `server`.
pub fn remote_config(server: &MockServer) -> AppConfig {
    AppConfig {
        backend: BackendKind::Remote,
        replicate_api_url: server.uri(),
        replicate_api_token: Some(API_TOKEN.to_string()),
        cloudinary_api_url: server.uri(),
        cloudinary_cloud_name: Some(CLOUD_NAME.to_string()),
        cloudinary_api_key: Some("123456".to_string()),
        cloudinary_api_secret: Some("shhh".to_string()),
        poll_interval_ms: 10,
        ..AppConfig::default()
    }
}

pub fn state_for(config: &AppConfig) -> AppState {
    AppState::from_config(config).expect("failed to build app state")
}

/// Serve the router on an ephemeral port and return its base URL.
pub async fn spawn_app(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let addr = listener.local_addr().expect("no local addr");

    tokio::spawn(async move {
        axum::serve(listener, routes::router(state, None))
            .await
            .expect("test server failed");
    });

    format!("http://{addr}")
}

/// POST an audio file to /upload.
pub async fn upload_audio(
    client: &reqwest::Client,
    base_url: &str,
    field: &str,
    file_name: &str,
    bytes: &[u8],
) -> reqwest::Response {
    let form = multipart::Form::new().part(
        field.to_string(),
        multipart::Part::bytes(bytes.to_vec())
            .file_name(file_name.to_string())
            .mime_str("audio/wav")
            .expect("valid mime"),
    );

    client
        .post(format!("{base_url}/upload"))
        .multipart(form)
        .send()
        .await
        .expect("upload request failed")
}

pub async fn mount_create_prediction(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/predictions"))
        .and(header("Authorization", format!("Token {API_TOKEN}").as_str()))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(created_prediction(&status_url(server))),
        )
        .expect(1)
        .mount(server)
        .await;
}

/// Mount one status response per entry, served in order.
pub async fn mount_status_sequence(server: &MockServer, statuses: &[serde_json::Value]) {
    for body in statuses {
        Mock::given(method("GET"))
            .and(path("/v1/predictions/abc123"))
            .and(header("Authorization", format!("Token {API_TOKEN}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
            .up_to_n_times(1)
            .expect(1)
            .mount(server)
            .await;
    }
}

/// Cloudinary accepts uploads whose form body mentions `needle`.
pub async fn mount_media_upload(server: &MockServer, needle: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(format!("/v1_1/{CLOUD_NAME}/auto/upload")))
        .and(body_string_contains(needle))
        .respond_with(response)
        .mount(server)
        .await;
}

pub async fn mount_successful_relay(server: &MockServer) {
    mount_media_upload(
        server,
        PROVIDER_VOCAL,
        ResponseTemplate::new(200).set_body_json(uploaded(HOSTED_VOCAL)),
    )
    .await;
    mount_media_upload(
        server,
        PROVIDER_INSTRUMENTAL,
        ResponseTemplate::new(200).set_body_json(uploaded(HOSTED_INSTRUMENTAL)),
    )
    .await;
}

pub fn short(ms: u64) -> Duration {
    Duration::from_millis(ms)
}
