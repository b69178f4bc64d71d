use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// Client for Cloudinary signed uploads.
pub struct CloudinaryClient {
    http: Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    folder: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    error: Option<UploadErrorBody>,
}

#[derive(Deserialize)]
struct UploadErrorBody {
    message: String,
}

/// Sign upload parameters: sorted `k=v` pairs joined by `&`, secret appended, SHA-256 hex.
pub fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

impl CloudinaryClient {
    pub fn new(
        base_url: &str,
        cloud_name: &str,
        api_key: &str,
        api_secret: &str,
        folder: &str,
    ) -> Result<Self, MediaHostError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(MediaHostError::Http)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            cloud_name: cloud_name.to_string(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            folder: folder.to_string(),
        })
    }

    /// Have Cloudinary fetch `source_url` and return its permanent public URL.
    pub async fn upload_remote(&self, source_url: &str) -> Result<String, MediaHostError> {
        let form = self.signed_form().text("file", source_url.to_string());
        self.send(form).await
    }

    /// Upload raw audio bytes and return the permanent public URL.
    pub async fn upload_bytes(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
    ) -> Result<String, MediaHostError> {
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = self.signed_form().part("file", part);
        self.send(form).await
    }

    fn signed_form(&self) -> Form {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(
            &[("folder", self.folder.as_str()), ("timestamp", timestamp.as_str())],
            &self.api_secret,
        );

        Form::new()
            .text("folder", self.folder.clone())
            .text("timestamp", timestamp)
            .text("api_key", self.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256")
    }

    async fn send(&self, form: Form) -> Result<String, MediaHostError> {
        let url = format!("{}/v1_1/{}/auto/upload", self.base_url, self.cloud_name);

        let response = self.http.post(&url).multipart(form).send().await?;
        let status = response.status();
        let text = response.text().await?;

        let body: Option<UploadResponse> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            let message = body
                .and_then(|b| b.error)
                .map(|e| e.message)
                .unwrap_or(text);
            return Err(MediaHostError::Api {
                status: status.as_u16(),
                message,
            });
        }

        body.and_then(|b| b.secure_url)
            .ok_or(MediaHostError::MissingUrl)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MediaHostError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Cloudinary API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Cloudinary response has no secure_url")]
    MissingUrl,
}
