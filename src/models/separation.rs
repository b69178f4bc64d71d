use garde::Validate;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/separate`: the audio is already hosted at `file_url`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SeparateRequest {
    #[garde(length(min = 1))]
    #[serde(default)]
    pub file_url: String,

    #[garde(length(min = 1))]
    #[serde(default)]
    pub model: String,
}

/// Response after a successful `POST /upload`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub vocal_url: String,
    pub instrumental_url: String,
}

/// Response after a successful `POST /api/separate`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SeparateResponse {
    pub vocal: String,
    pub instrumental: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
