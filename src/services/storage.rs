use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

use crate::error::PipelineError;

/// On-disk layout for local separation output.
///
/// Every job writes into its own `<root>/<job_id>/` directory, and downloads
/// are resolved strictly inside `root`.
#[derive(Debug, Clone)]
pub struct OutputStore {
    root: PathBuf,
}

impl OutputStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn job_dir(&self, job_id: Uuid) -> PathBuf {
        self.root.join(job_id.to_string())
    }

    /// Relative download URL for a file inside a job directory.
    pub fn public_url(job_id: Uuid, file_name: &str) -> String {
        format!("/output/{job_id}/{file_name}")
    }

    /// Resolve a requested download path to an existing file under the root.
    ///
    /// Anything that is not a plain relative path, or that canonicalizes
    /// outside the root (e.g. through a symlink), is reported as not found.
    pub async fn resolve(&self, requested: &str) -> Result<PathBuf, PipelineError> {
        let not_found = || PipelineError::NotFound(requested.to_string());

        let relative = Path::new(requested);
        let mut components = relative.components().peekable();
        if components.peek().is_none()
            || !components.all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(not_found());
        }

        let candidate = self.root.join(relative);
        if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return Err(not_found());
        }

        let root = tokio::fs::canonicalize(&self.root)
            .await
            .map_err(|_| not_found())?;
        let resolved = tokio::fs::canonicalize(&candidate)
            .await
            .map_err(|_| not_found())?;

        if !resolved.starts_with(&root) {
            return Err(not_found());
        }

        let metadata = tokio::fs::metadata(&resolved)
            .await
            .map_err(|_| not_found())?;
        if !metadata.is_file() {
            return Err(not_found());
        }

        Ok(resolved)
    }
}
