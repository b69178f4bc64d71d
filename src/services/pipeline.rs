use std::time::{Duration, Instant};

use tokio::time::sleep;

use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::models::job::{JobStatus, SeparationJob, SeparationResult};
use crate::services::backend::{AudioInput, SeparationBackend};

/// How the completion poller waits.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    /// Constant delay between status checks.
    pub interval: Duration,
    /// Bound on the whole poll phase; `None` waits as long as the job takes.
    pub deadline: Option<Duration>,
}

impl PollPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.poll_interval_ms),
            deadline: (config.poll_timeout_secs > 0)
                .then(|| Duration::from_secs(config.poll_timeout_secs)),
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Stage the input, run the job, and release the staged input.
pub async fn separate<B: SeparationBackend>(
    backend: &B,
    policy: &PollPolicy,
    input: AudioInput,
    model: &str,
) -> Result<SeparationResult, PipelineError> {
    let source = backend.stage(input).await?;
    let result = run(backend, policy, &source, model).await;
    backend.discard(&source).await;
    result
}

/// Submit -> poll -> relay for one source reference.
pub async fn run<B: SeparationBackend>(
    backend: &B,
    policy: &PollPolicy,
    source: &str,
    model: &str,
) -> Result<SeparationResult, PipelineError> {
    let mut job = SeparationJob::new(source, model);
    let backend_name = backend.name();
    let start = Instant::now();

    metrics::counter!("separation_jobs_total", "backend" => backend_name).increment(1);
    tracing::info!(
        job_id = %job.id(),
        backend = backend_name,
        model,
        "Submitting separation job"
    );

    let result = drive(backend, policy, &mut job).await;
    let elapsed = start.elapsed();

    match &result {
        Ok(urls) => {
            metrics::counter!("separation_jobs_completed", "backend" => backend_name).increment(1);
            metrics::histogram!("separation_processing_seconds", "backend" => backend_name)
                .record(elapsed.as_secs_f64());
            tracing::info!(
                job_id = %job.id(),
                duration_ms = elapsed.as_millis() as u64,
                vocal = %urls.vocal,
                instrumental = %urls.instrumental,
                "Separation job completed"
            );
        }
        Err(e) => {
            if !job.status().is_terminal() {
                let _ = job.fail(e.to_string());
            }
            metrics::counter!("separation_jobs_failed", "backend" => backend_name).increment(1);
            tracing::warn!(
                job_id = %job.id(),
                duration_ms = elapsed.as_millis() as u64,
                status = %job.status(),
                cause = job.error().unwrap_or("unknown"),
                "Separation job failed"
            );
        }
    }

    result
}

async fn drive<B: SeparationBackend>(
    backend: &B,
    policy: &PollPolicy,
    job: &mut SeparationJob,
) -> Result<SeparationResult, PipelineError> {
    // A failed submission never reaches the poller.
    let mut handle = backend.submit(job).await?;

    let completion = wait_for_completion(backend, policy.interval, job, &mut handle);
    match policy.deadline {
        Some(limit) => tokio::time::timeout(limit, completion).await.map_err(|_| {
            PipelineError::Processing(format!(
                "job did not finish within {} seconds",
                limit.as_secs()
            ))
        })??,
        None => completion.await?,
    }

    backend.relay(&handle, job).await
}

/// Poll on a fixed interval until the job is terminal.
///
/// Terminal outcomes return immediately; only non-terminal ones sleep.
async fn wait_for_completion<B: SeparationBackend>(
    backend: &B,
    interval: Duration,
    job: &mut SeparationJob,
    handle: &mut B::Handle,
) -> Result<(), PipelineError> {
    let mut attempts: u64 = 0;

    loop {
        let outcome = backend.poll(handle).await?;
        attempts += 1;
        metrics::counter!("separation_polls_total", "backend" => backend.name()).increment(1);

        let status = job
            .apply(outcome)
            .map_err(|e| PipelineError::Processing(e.to_string()))?;

        match status {
            JobStatus::Succeeded => {
                tracing::debug!(job_id = %job.id(), attempts, "Job succeeded");
                return Ok(());
            }
            JobStatus::Failed => {
                return Err(PipelineError::Processing(
                    job.error().unwrap_or("separation failed").to_string(),
                ));
            }
            JobStatus::Pending | JobStatus::Processing => {
                tracing::trace!(
                    job_id = %job.id(),
                    attempts,
                    status = %status,
                    "Job not finished, sleeping"
                );
                sleep(interval).await;
            }
        }
    }
}
