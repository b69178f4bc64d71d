use serde::Deserialize;
use strum::Display;

/// Which separation collaborator the server drives.
#[derive(Debug, Clone, Copy, Deserialize, Display, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BackendKind {
    /// Spawn a separation tool as a subprocess and serve its output from disk.
    Local,
    /// Replicate prediction API with Cloudinary as the media host.
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Separation backend to run: `local` or `remote`.
    #[serde(default = "default_backend")]
    pub backend: BackendKind,

    /// Root directory for per-job separation output (local backend).
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Directory where uploaded audio is staged before separation (local backend).
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    /// Program invoked as `<program> [args...] <input> <output_dir>`.
    #[serde(default = "default_separator_program")]
    pub separator_program: String,

    /// Leading arguments for the separator program (comma-separated in the environment).
    #[serde(default)]
    pub separator_args: Vec<String>,

    /// Model identifier used for `/upload` requests.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Replicate API base URL
    #[serde(default = "default_replicate_api_url")]
    pub replicate_api_url: String,

    /// Replicate API token (remote backend)
    pub replicate_api_token: Option<String>,

    /// Cloudinary API base URL
    #[serde(default = "default_cloudinary_api_url")]
    pub cloudinary_api_url: String,

    pub cloudinary_cloud_name: Option<String>,
    pub cloudinary_api_key: Option<String>,
    pub cloudinary_api_secret: Option<String>,

    /// Cloudinary folder that receives relayed results.
    #[serde(default = "default_cloudinary_folder")]
    pub cloudinary_folder: String,

    /// Fixed delay between prediction status checks.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on the whole poll phase. `0` waits forever.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_backend() -> BackendKind {
    BackendKind::Local
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

fn default_separator_program() -> String {
    "separate".to_string()
}

fn default_model() -> String {
    "demucs_quantized".to_string()
}

fn default_replicate_api_url() -> String {
    "https://api.replicate.com".to_string()
}

fn default_cloudinary_api_url() -> String {
    "https://api.cloudinary.com".to_string()
}

fn default_cloudinary_folder() -> String {
    "audio-separator".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_poll_timeout_secs() -> u64 {
    900
}

fn default_max_upload_bytes() -> usize {
    100 * 1024 * 1024
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            backend: default_backend(),
            output_dir: default_output_dir(),
            upload_dir: default_upload_dir(),
            separator_program: default_separator_program(),
            separator_args: Vec::new(),
            default_model: default_model(),
            replicate_api_url: default_replicate_api_url(),
            replicate_api_token: None,
            cloudinary_api_url: default_cloudinary_api_url(),
            cloudinary_cloud_name: None,
            cloudinary_api_key: None,
            cloudinary_api_secret: None,
            cloudinary_folder: default_cloudinary_folder(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_timeout_secs: default_poll_timeout_secs(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Separator arguments with blank entries dropped (an empty env var parses as `[""]`).
    pub fn separator_args(&self) -> Vec<String> {
        self.separator_args
            .iter()
            .map(|arg| arg.trim().to_string())
            .filter(|arg| !arg.is_empty())
            .collect()
    }
}

/// A required setting is absent for the selected backend.
#[derive(Debug, thiserror::Error)]
#[error("{0} must be set when BACKEND={1}")]
pub struct ConfigError(pub &'static str, pub BackendKind);

/// Unwrap an optional secret, naming the env var when it is missing.
pub fn require<'a>(
    value: &'a Option<String>,
    name: &'static str,
    backend: BackendKind,
) -> Result<&'a str, ConfigError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError(name, backend))
}
