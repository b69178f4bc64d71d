//! HTTP gateway tests against a live server on an ephemeral port

mod fixtures;
mod helpers;

use audio_separator::models::separation::{ErrorResponse, SeparateResponse, UploadResponse};
use fixtures::*;
use helpers::*;
use reqwest::StatusCode;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use wiremock::MockServer;

#[cfg(unix)]
#[tokio::test]
async fn upload_then_download_both_tracks() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_tool(dir.path(), TOOL_OK);
    let base_url = spawn_app(state_for(&local_config(dir.path(), &script))).await;
    let client = reqwest::Client::new();

    let response = upload_audio(&client, &base_url, "audio", "song.wav", FAKE_WAV).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: UploadResponse = response.json().await.unwrap();
    assert_eq!(body.message, "Audio separation completed successfully.");

    let download = client
        .get(format!("{base_url}{}", body.vocal_url))
        .send()
        .await
        .unwrap();
    assert_eq!(download.status(), StatusCode::OK);
    let disposition = download
        .headers()
        .get("content-disposition")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert_eq!(disposition, "attachment; filename=\"vocals.mp3\"");
    assert_eq!(download.text().await.unwrap(), "vocals");

    let download = client
        .get(format!("{base_url}{}", body.instrumental_url))
        .send()
        .await
        .unwrap();
    assert_eq!(download.text().await.unwrap(), "instrumental");
}

#[cfg(unix)]
#[tokio::test]
async fn tool_failure_returns_generic_error() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_tool(dir.path(), TOOL_FAILS);
    let base_url = spawn_app(state_for(&local_config(dir.path(), &script))).await;
    let client = reqwest::Client::new();

    let response = upload_audio(&client, &base_url, "audio", "song.wav", FAKE_WAV).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.error, "Failed to process audio");
}

#[tokio::test]
async fn upload_without_audio_field_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_tool(dir.path(), TOOL_OK);
    let base_url = spawn_app(state_for(&local_config(dir.path(), &script))).await;
    let client = reqwest::Client::new();

    let response = upload_audio(&client, &base_url, "file", "song.wav", FAKE_WAV).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json().await.unwrap();
    assert_eq!(body.error, "Missing audio");
    assert!(!dir.path().join("output").exists());
}

#[tokio::test]
async fn large_track_is_streamed_intact() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_tool(dir.path(), TOOL_OK);
    let job_dir = dir.path().join("output").join("0b7f4c1e-job");
    std::fs::create_dir_all(&job_dir).unwrap();
    let track: Vec<u8> = (0..3 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
    std::fs::write(job_dir.join("instrumental.mp3"), &track).unwrap();
    let base_url = spawn_app(state_for(&local_config(dir.path(), &script))).await;

    let response = reqwest::get(format!("{base_url}/output/0b7f4c1e-job/instrumental.mp3"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "audio/mpeg");
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"instrumental.mp3\""
    );
    let body = response.bytes().await.unwrap();
    assert_eq!(body.len(), track.len());
    assert!(body.as_ref() == track.as_slice());
}

/// Hand-written chunked request so the body length is unknown up front.
fn chunked_upload(host: &str, payload_len: usize) -> Vec<u8> {
    let boundary = "separator-boundary";
    let mut body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"audio\"; filename=\"song.wav\"\r\n\
         Content-Type: audio/wav\r\n\r\n"
    )
    .into_bytes();
    body.extend(std::iter::repeat(b'a').take(payload_len));
    body.extend(format!("\r\n--{boundary}--\r\n").into_bytes());

    let mut request = format!(
        "POST /upload HTTP/1.1\r\n\
         Host: {host}\r\n\
         Content-Type: multipart/form-data; boundary={boundary}\r\n\
         Transfer-Encoding: chunked\r\n\
         Connection: close\r\n\r\n"
    )
    .into_bytes();
    for chunk in body.chunks(256) {
        request.extend(format!("{:x}\r\n", chunk.len()).into_bytes());
        request.extend_from_slice(chunk);
        request.extend_from_slice(b"\r\n");
    }
    request.extend_from_slice(b"0\r\n\r\n");
    request
}

#[tokio::test]
async fn chunked_upload_over_limit_is_payload_too_large() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_tool(dir.path(), TOOL_OK);
    let mut config = local_config(dir.path(), &script);
    config.max_upload_bytes = 1024;
    let base_url = spawn_app(state_for(&config)).await;
    let host = base_url.trim_start_matches("http://").to_string();

    let mut stream = tokio::net::TcpStream::connect(&host).await.unwrap();
    stream.write_all(&chunked_upload(&host, 1500)).await.unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let response = String::from_utf8_lossy(&raw);

    assert!(response.starts_with("HTTP/1.1 413"), "{response}");
    assert!(response.contains("Audio file is too large"), "{response}");
    assert!(!response.contains("Missing audio"));
    assert!(!dir.path().join("output").exists());
}

#[tokio::test]
async fn missing_download_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_tool(dir.path(), TOOL_OK);
    let base_url = spawn_app(state_for(&local_config(dir.path(), &script))).await;

    let response = reqwest::get(format!("{base_url}/output/vocals.mp3")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.text().await.unwrap(), "File not found");
}

#[tokio::test]
async fn download_cannot_escape_output_root() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_tool(dir.path(), TOOL_OK);
    std::fs::create_dir_all(dir.path().join("output")).unwrap();
    std::fs::write(dir.path().join("secret.txt"), "top secret").unwrap();
    let base_url = spawn_app(state_for(&local_config(dir.path(), &script))).await;

    for encoded in ["%2E%2E%2Fsecret.txt", "..%2Fsecret.txt", "%2E%2E/tool.sh"] {
        let response = reqwest::get(format!("{base_url}/output/{encoded}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{encoded}");
    }
}

#[tokio::test]
async fn separate_requires_file_url_and_model() {
    let server = MockServer::start().await;
    let base_url = spawn_app(state_for(&remote_config(&server))).await;
    let client = reqwest::Client::new();

    for body in [
        json!({}),
        json!({ "fileUrl": HOSTED_SOURCE }),
        json!({ "model": MODEL_VERSION }),
    ] {
        let response = client
            .post(format!("{base_url}/api/separate"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = response.json().await.unwrap();
        assert_eq!(error.error, "Missing fileUrl or model");
    }
}

#[tokio::test]
async fn separate_only_accepts_post() {
    let server = MockServer::start().await;
    let base_url = spawn_app(state_for(&remote_config(&server))).await;

    let client = reqwest::Client::new();
    for request in [
        client.get(format!("{base_url}/api/separate")),
        client.put(format!("{base_url}/api/separate")),
    ] {
        let response = request.send().await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()["allow"], "POST");
        let body: ErrorResponse = response.json().await.unwrap();
        assert_eq!(body.error, "Only POST method is allowed");
    }
}

#[tokio::test]
async fn separate_song_end_to_end() {
    let server = MockServer::start().await;
    mount_create_prediction(&server).await;
    mount_status_sequence(
        &server,
        &[prediction_with_status("processing"), succeeded_prediction()],
    )
    .await;
    mount_successful_relay(&server).await;

    let base_url = spawn_app(state_for(&remote_config(&server))).await;
    let response = reqwest::Client::new()
        .post(format!("{base_url}/api/separate"))
        .json(&json!({ "fileUrl": HOSTED_SOURCE, "model": MODEL_VERSION }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: SeparateResponse = response.json().await.unwrap();
    assert_eq!(body.vocal, HOSTED_VOCAL);
    assert_eq!(body.instrumental, HOSTED_INSTRUMENTAL);
}

#[tokio::test]
async fn remote_upload_returns_hosted_urls() {
    let server = MockServer::start().await;
    mount_media_upload(
        &server,
        "filename=\"song.wav\"",
        wiremock::ResponseTemplate::new(200).set_body_json(uploaded(HOSTED_SOURCE)),
    )
    .await;
    mount_create_prediction(&server).await;
    mount_status_sequence(&server, &[succeeded_prediction()]).await;
    mount_successful_relay(&server).await;

    let base_url = spawn_app(state_for(&remote_config(&server))).await;
    let client = reqwest::Client::new();
    let response = upload_audio(&client, &base_url, "audio", "song.wav", FAKE_WAV).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: UploadResponse = response.json().await.unwrap();
    assert_eq!(body.vocal_url, HOSTED_VOCAL);
    assert_eq!(body.instrumental_url, HOSTED_INSTRUMENTAL);
}

#[tokio::test]
async fn remote_relay_failure_returns_no_urls() {
    let server = MockServer::start().await;
    mount_create_prediction(&server).await;
    mount_status_sequence(&server, &[succeeded_prediction()]).await;
    mount_media_upload(
        &server,
        PROVIDER_VOCAL,
        wiremock::ResponseTemplate::new(200).set_body_json(uploaded(HOSTED_VOCAL)),
    )
    .await;
    mount_media_upload(&server, PROVIDER_INSTRUMENTAL, wiremock::ResponseTemplate::new(500)).await;

    let base_url = spawn_app(state_for(&remote_config(&server))).await;
    let response = reqwest::Client::new()
        .post(format!("{base_url}/api/separate"))
        .json(&json!({ "fileUrl": HOSTED_SOURCE, "model": MODEL_VERSION }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Audio separation failed." }));
}

#[tokio::test]
async fn remote_backend_has_no_download_route() {
    let server = MockServer::start().await;
    let base_url = spawn_app(state_for(&remote_config(&server))).await;

    let response = reqwest::get(format!("{base_url}/output/vocals.mp3")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_backend() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_tool(dir.path(), TOOL_OK);
    let base_url = spawn_app(state_for(&local_config(dir.path(), &script))).await;

    let response = reqwest::get(format!("{base_url}/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], "local");
}
