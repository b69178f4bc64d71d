use async_trait::async_trait;

use crate::config::{require, AppConfig, BackendKind, ConfigError};
use crate::error::PipelineError;
use crate::models::job::{PollOutcome, SeparationJob, SeparationResult};
use crate::services::local_tool::LocalToolBackend;
use crate::services::media_host::{CloudinaryClient, MediaHostError};
use crate::services::pipeline::{self, PollPolicy};
use crate::services::remote::ReplicateBackend;
use crate::services::replicate::{PredictionError, ReplicateClient};
use crate::services::storage::OutputStore;

/// Audio handed to the gateway, before it is staged for a backend.
#[derive(Debug)]
pub enum AudioInput {
    /// Bytes from a multipart upload.
    Upload { file_name: String, bytes: Vec<u8> },
    /// Audio already reachable at a URL.
    Url(String),
}

/// One external separation collaborator.
///
/// The pipeline drives every implementation the same way: stage the input,
/// submit a job, poll it until terminal, relay the results.
#[async_trait]
pub trait SeparationBackend: Send + Sync {
    /// Whatever the poller needs to observe a submitted job.
    type Handle: Send;

    fn name(&self) -> &'static str;

    /// Turn inbound audio into a source reference the collaborator understands.
    async fn stage(&self, input: AudioInput) -> Result<String, PipelineError>;

    /// Release a staged source once the job is over.
    async fn discard(&self, _source: &str) {}

    async fn submit(&self, job: &SeparationJob) -> Result<Self::Handle, PipelineError>;

    /// Check the job once. May block until the next observable change.
    async fn poll(&self, handle: &mut Self::Handle) -> Result<PollOutcome, PipelineError>;

    /// Make the results of a succeeded job reachable by the caller.
    async fn relay(
        &self,
        handle: &Self::Handle,
        job: &SeparationJob,
    ) -> Result<SeparationResult, PipelineError>;
}

/// The backend selected at startup.
pub enum Backend {
    Local(LocalToolBackend),
    Remote(ReplicateBackend),
}

impl Backend {
    pub fn from_config(config: &AppConfig) -> Result<Self, BackendInitError> {
        match config.backend {
            BackendKind::Local => Ok(Backend::Local(LocalToolBackend::new(
                &config.separator_program,
                config.separator_args(),
                &config.upload_dir,
                OutputStore::new(&config.output_dir),
                config.max_upload_bytes,
            )?)),
            BackendKind::Remote => {
                let kind = config.backend;
                let predictions = ReplicateClient::new(
                    &config.replicate_api_url,
                    require(&config.replicate_api_token, "REPLICATE_API_TOKEN", kind)?,
                )?;
                let media = CloudinaryClient::new(
                    &config.cloudinary_api_url,
                    require(&config.cloudinary_cloud_name, "CLOUDINARY_CLOUD_NAME", kind)?,
                    require(&config.cloudinary_api_key, "CLOUDINARY_API_KEY", kind)?,
                    require(&config.cloudinary_api_secret, "CLOUDINARY_API_SECRET", kind)?,
                    &config.cloudinary_folder,
                )?;
                Ok(Backend::Remote(ReplicateBackend::new(predictions, media)))
            }
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Local(_) => BackendKind::Local,
            Backend::Remote(_) => BackendKind::Remote,
        }
    }

    /// Output directory served by the download route (local backend only).
    pub fn outputs(&self) -> Option<&OutputStore> {
        match self {
            Backend::Local(local) => Some(local.outputs()),
            Backend::Remote(_) => None,
        }
    }

    pub async fn separate(
        &self,
        policy: &PollPolicy,
        input: AudioInput,
        model: &str,
    ) -> Result<SeparationResult, PipelineError> {
        match self {
            Backend::Local(local) => pipeline::separate(local, policy, input, model).await,
            Backend::Remote(remote) => pipeline::separate(remote, policy, input, model).await,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BackendInitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to initialize Replicate client: {0}")]
    Prediction(#[from] PredictionError),

    #[error("failed to initialize Cloudinary client: {0}")]
    MediaHost(#[from] MediaHostError),
}
