use async_trait::async_trait;

use crate::error::PipelineError;
use crate::models::job::{PollOutcome, ResultPair, SeparationJob, SeparationResult};
use crate::services::backend::{AudioInput, SeparationBackend};
use crate::services::media_host::CloudinaryClient;
use crate::services::replicate::ReplicateClient;

/// Replicate predictions with Cloudinary hosting inputs and relayed results.
pub struct ReplicateBackend {
    predictions: ReplicateClient,
    media: CloudinaryClient,
}

/// A submitted prediction.
#[derive(Debug, Clone)]
pub struct PredictionHandle {
    pub prediction_id: Option<String>,
    pub status_url: String,
}

impl ReplicateBackend {
    pub fn new(predictions: ReplicateClient, media: CloudinaryClient) -> Self {
        Self { predictions, media }
    }
}

#[async_trait]
impl SeparationBackend for ReplicateBackend {
    type Handle = PredictionHandle;

    fn name(&self) -> &'static str {
        "remote"
    }

    async fn stage(&self, input: AudioInput) -> Result<String, PipelineError> {
        match input {
            AudioInput::Url(url) => Ok(url),
            AudioInput::Upload { file_name, bytes } => {
                let url = self
                    .media
                    .upload_bytes(bytes, &file_name)
                    .await
                    .map_err(|e| PipelineError::Submission(format!("input upload failed: {e}")))?;
                tracing::debug!(url = %url, "Uploaded input audio to Cloudinary");
                Ok(url)
            }
        }
    }

    async fn submit(&self, job: &SeparationJob) -> Result<PredictionHandle, PipelineError> {
        let prediction = self
            .predictions
            .create_prediction(job.model_identifier(), job.source_reference())
            .await
            .map_err(PipelineError::submission)?;

        let status_url = prediction
            .status_url()
            .map(str::to_string)
            .ok_or_else(|| PipelineError::Submission("prediction has no status URL".into()))?;

        tracing::info!(
            job_id = %job.id(),
            prediction_id = prediction.id.as_deref().unwrap_or("unknown"),
            "Replicate prediction created"
        );

        Ok(PredictionHandle {
            prediction_id: prediction.id,
            status_url,
        })
    }

    async fn poll(&self, handle: &mut PredictionHandle) -> Result<PollOutcome, PipelineError> {
        let prediction = self
            .predictions
            .get_prediction(&handle.status_url)
            .await
            .map_err(|e| PipelineError::Processing(format!("status check failed: {e}")))?;

        tracing::debug!(
            prediction_id = handle.prediction_id.as_deref().unwrap_or("unknown"),
            status = ?prediction.status,
            "Polled prediction"
        );

        Ok(prediction.outcome())
    }

    /// Re-upload both provider URLs. Either failure discards the pair.
    async fn relay(
        &self,
        _handle: &PredictionHandle,
        job: &SeparationJob,
    ) -> Result<SeparationResult, PipelineError> {
        let results = job
            .result_references()
            .ok_or_else(|| PipelineError::Relay(format!("job {} has no results", job.id())))?;

        let vocal = self
            .media
            .upload_remote(&results.vocal)
            .await
            .map_err(PipelineError::relay)?;
        let instrumental = self
            .media
            .upload_remote(&results.instrumental)
            .await
            .map_err(PipelineError::relay)?;

        Ok(ResultPair::new(vocal, instrumental))
    }
}
