use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

/// Status of a separation job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// Ordered `(vocal, instrumental)` result locators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPair {
    pub vocal: String,
    pub instrumental: String,
}

impl ResultPair {
    pub fn new(vocal: impl Into<String>, instrumental: impl Into<String>) -> Self {
        Self {
            vocal: vocal.into(),
            instrumental: instrumental.into(),
        }
    }
}

/// What a single status check observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Pending,
    Processing,
    Succeeded(ResultPair),
    Failed(String),
}

/// Caller-reachable locators returned by the relay stage.
pub type SeparationResult = ResultPair;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("job {job_id} is already {status} and cannot change")]
pub struct JobFinalized {
    pub job_id: Uuid,
    pub status: JobStatus,
}

/// One in-flight or completed separation request.
///
/// Result references are only reachable once the job has succeeded, and a
/// failed job always carries its cause. Terminal jobs reject every further
/// transition.
#[derive(Debug, Clone)]
pub struct SeparationJob {
    id: Uuid,
    source_reference: String,
    model_identifier: String,
    status: JobStatus,
    result_references: Option<ResultPair>,
    error: Option<String>,
}

impl SeparationJob {
    pub fn new(source_reference: impl Into<String>, model_identifier: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_reference: source_reference.into(),
            model_identifier: model_identifier.into(),
            status: JobStatus::Pending,
            result_references: None,
            error: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source_reference(&self) -> &str {
        &self.source_reference
    }

    pub fn model_identifier(&self) -> &str {
        &self.model_identifier
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn result_references(&self) -> Option<&ResultPair> {
        match self.status {
            JobStatus::Succeeded => self.result_references.as_ref(),
            _ => None,
        }
    }

    /// Fold one poll observation into the job.
    pub fn apply(&mut self, outcome: PollOutcome) -> Result<JobStatus, JobFinalized> {
        self.ensure_open()?;
        match outcome {
            PollOutcome::Pending => self.status = JobStatus::Pending,
            PollOutcome::Processing => self.status = JobStatus::Processing,
            PollOutcome::Succeeded(pair) => {
                self.result_references = Some(pair);
                self.status = JobStatus::Succeeded;
            }
            PollOutcome::Failed(cause) => {
                self.error = Some(cause);
                self.status = JobStatus::Failed;
            }
        }
        Ok(self.status)
    }

    pub fn fail(&mut self, cause: impl Into<String>) -> Result<(), JobFinalized> {
        self.apply(PollOutcome::Failed(cause.into())).map(|_| ())
    }

    fn ensure_open(&self) -> Result<(), JobFinalized> {
        if self.status.is_terminal() {
            return Err(JobFinalized {
                job_id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> ResultPair {
        ResultPair::new("https://a/vocal.mp3", "https://a/instr.mp3")
    }

    #[test]
    fn new_job_is_pending_without_results() {
        let job = SeparationJob::new("song.wav", "demucs_quantized");
        assert_eq!(job.status(), JobStatus::Pending);
        assert!(job.result_references().is_none());
        assert!(job.error().is_none());
    }

    #[test]
    fn succeeded_job_exposes_results() {
        let mut job = SeparationJob::new("song.wav", "m");
        job.apply(PollOutcome::Processing).unwrap();
        assert!(job.result_references().is_none());

        let status = job.apply(PollOutcome::Succeeded(pair())).unwrap();
        assert_eq!(status, JobStatus::Succeeded);
        assert_eq!(job.result_references(), Some(&pair()));
    }

    #[test]
    fn failed_job_carries_cause_and_no_results() {
        let mut job = SeparationJob::new("song.wav", "m");
        job.fail("exit code 2").unwrap();
        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(job.error(), Some("exit code 2"));
        assert!(job.result_references().is_none());
    }

    #[test]
    fn terminal_job_rejects_transitions() {
        let mut job = SeparationJob::new("song.wav", "m");
        job.apply(PollOutcome::Succeeded(pair())).unwrap();

        let err = job.apply(PollOutcome::Processing).unwrap_err();
        assert_eq!(err.status, JobStatus::Succeeded);
        assert!(job.fail("late").is_err());
        assert_eq!(job.status(), JobStatus::Succeeded);
        assert!(job.error().is_none());
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&JobStatus::Succeeded).unwrap(), "\"succeeded\"");
        assert_eq!(JobStatus::Processing.to_string(), "processing");
    }
}
