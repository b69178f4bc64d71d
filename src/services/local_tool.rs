use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::models::job::{PollOutcome, ResultPair, SeparationJob, SeparationResult};
use crate::services::backend::{AudioInput, SeparationBackend};
use crate::services::storage::OutputStore;

/// File stems the separation tool must write into its output directory.
const VOCAL_STEM: &str = "vocals";
const INSTRUMENTAL_STEM: &str = "instrumental";

/// Runs a separation tool as `<program> [args...] <input> <output_dir>`.
pub struct LocalToolBackend {
    program: String,
    args: Vec<String>,
    upload_dir: PathBuf,
    outputs: OutputStore,
    http: Client,
    max_download_bytes: usize,
}

/// A running tool process and the directory it writes into.
pub struct LocalJob {
    job_id: Uuid,
    output_dir: PathBuf,
    child: Option<Child>,
}

impl LocalToolBackend {
    pub fn new(
        program: &str,
        args: Vec<String>,
        upload_dir: impl Into<PathBuf>,
        outputs: OutputStore,
        max_download_bytes: usize,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(300))
            .build()?;

        Ok(Self {
            program: program.to_string(),
            args,
            upload_dir: upload_dir.into(),
            outputs,
            http,
            max_download_bytes,
        })
    }

    pub fn outputs(&self) -> &OutputStore {
        &self.outputs
    }

    /// Reserve a unique path in the upload directory for `file_name`.
    async fn staging_path(&self, file_name: &str) -> Result<PathBuf, PipelineError> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        Ok(self
            .upload_dir
            .join(format!("{}-{}", Uuid::new_v4(), sanitize_file_name(file_name))))
    }

    async fn write_upload(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, PipelineError> {
        let path = self.staging_path(file_name).await?;
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Fetch `url` into the upload directory, refusing bodies over `max_download_bytes`.
    async fn download(&self, url: &str) -> Result<PathBuf, PipelineError> {
        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PipelineError::Submission(format!("failed to fetch {url}: {e}")))?;

        if let Some(length) = response.content_length() {
            if length > self.max_download_bytes as u64 {
                return Err(self.too_large(url));
            }
        }

        let file_name = response
            .url()
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .unwrap_or("input")
            .to_string();

        let path = self.staging_path(&file_name).await?;
        let mut file = tokio::fs::File::create(&path).await?;

        if let Err(e) = self.copy_body(&mut response, &mut file, url).await {
            drop(file);
            self.discard(&path.to_string_lossy()).await;
            return Err(e);
        }

        Ok(path)
    }

    /// Stream the response body into `file`, counting bytes as they arrive.
    async fn copy_body(
        &self,
        response: &mut reqwest::Response,
        file: &mut tokio::fs::File,
        url: &str,
    ) -> Result<(), PipelineError> {
        let mut received = 0usize;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| PipelineError::Submission(format!("failed to read {url}: {e}")))?
        {
            received += chunk.len();
            if received > self.max_download_bytes {
                return Err(self.too_large(url));
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }

    fn too_large(&self, url: &str) -> PipelineError {
        PipelineError::Submission(format!(
            "{url} is larger than the {} byte limit",
            self.max_download_bytes
        ))
    }
}

/// Keep only the final path component and replace anything outside `[A-Za-z0-9._-]`.
fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Find `<stem>.*` in `dir`.
async fn find_by_stem(dir: &Path, stem: &str) -> std::io::Result<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.file_stem().and_then(|s| s.to_str()) == Some(stem) && path.is_file() {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

fn file_name_of(path: &str) -> Option<&str> {
    Path::new(path).file_name().and_then(|n| n.to_str())
}

#[async_trait]
impl SeparationBackend for LocalToolBackend {
    type Handle = LocalJob;

    fn name(&self) -> &'static str {
        "local"
    }

    async fn stage(&self, input: AudioInput) -> Result<String, PipelineError> {
        let path = match input {
            AudioInput::Upload { file_name, bytes } => {
                self.write_upload(&file_name, &bytes).await?
            }
            AudioInput::Url(url) => self.download(&url).await?,
        };
        tracing::debug!(path = %path.display(), "Staged input audio");
        Ok(path.to_string_lossy().into_owned())
    }

    async fn discard(&self, source: &str) {
        if let Err(e) = tokio::fs::remove_file(source).await {
            tracing::debug!(path = source, error = %e, "Could not remove staged input");
        }
    }

    async fn submit(&self, job: &SeparationJob) -> Result<LocalJob, PipelineError> {
        let input = Path::new(job.source_reference());
        if !tokio::fs::try_exists(input).await.unwrap_or(false) {
            return Err(PipelineError::Submission(format!(
                "input file does not exist: {}",
                input.display()
            )));
        }

        let output_dir = self.outputs.job_dir(job.id());
        tokio::fs::create_dir_all(&output_dir).await?;

        tracing::info!(
            job_id = %job.id(),
            program = %self.program,
            input = %input.display(),
            output_dir = %output_dir.display(),
            "Starting separation tool"
        );

        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(input)
            .arg(&output_dir)
            .env("SEPARATION_MODEL", job.model_identifier())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                PipelineError::Submission(format!("failed to start {}: {e}", self.program))
            })?;

        Ok(LocalJob {
            job_id: job.id(),
            output_dir,
            child: Some(child),
        })
    }

    async fn poll(&self, handle: &mut LocalJob) -> Result<PollOutcome, PipelineError> {
        let child = handle.child.take().ok_or_else(|| {
            PipelineError::Processing("separation tool was already reaped".to_string())
        })?;

        let output = child.wait_with_output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let cause = match output.status.code() {
                Some(code) => format!("separation tool exited with code {code}"),
                None => "separation tool was terminated by a signal".to_string(),
            };
            tracing::error!(
                job_id = %handle.job_id,
                exit_code = ?output.status.code(),
                stdout = %stdout,
                stderr = %stderr,
                "Separation tool failed"
            );
            return Ok(PollOutcome::Failed(cause));
        }

        tracing::debug!(
            job_id = %handle.job_id,
            stdout = %stdout,
            stderr = %stderr,
            "Separation tool finished"
        );

        let vocal = find_by_stem(&handle.output_dir, VOCAL_STEM).await?;
        let instrumental = find_by_stem(&handle.output_dir, INSTRUMENTAL_STEM).await?;

        match (vocal, instrumental) {
            (Some(vocal), Some(instrumental)) => Ok(PollOutcome::Succeeded(ResultPair::new(
                vocal.to_string_lossy(),
                instrumental.to_string_lossy(),
            ))),
            _ => Ok(PollOutcome::Failed(format!(
                "separation tool exited 0 but {}.* or {}.* is missing in {}",
                VOCAL_STEM,
                INSTRUMENTAL_STEM,
                handle.output_dir.display()
            ))),
        }
    }

    async fn relay(
        &self,
        handle: &LocalJob,
        job: &SeparationJob,
    ) -> Result<SeparationResult, PipelineError> {
        let results = job
            .result_references()
            .ok_or_else(|| PipelineError::Relay(format!("job {} has no results", job.id())))?;

        let url_for = |path: &str| {
            file_name_of(path)
                .map(|name| OutputStore::public_url(handle.job_id, name))
                .ok_or_else(|| {
                    PipelineError::Relay(format!("result path has no file name: {path}"))
                })
        };

        Ok(ResultPair::new(
            url_for(&results.vocal)?,
            url_for(&results.instrumental)?,
        ))
    }
}
