use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{
    backend::{Backend, BackendInitError},
    pipeline::PollPolicy,
};

/// Shared application state passed to all route handlers.
///
/// Everything here is read-only; each request owns its own job.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<Backend>,
    pub policy: PollPolicy,
    pub default_model: Arc<str>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        backend: Backend,
        policy: PollPolicy,
        default_model: &str,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            backend: Arc::new(backend),
            policy,
            default_model: Arc::from(default_model),
            max_upload_bytes,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, BackendInitError> {
        Ok(Self::new(
            Backend::from_config(config)?,
            PollPolicy::from_config(config),
            &config.default_model,
            config.max_upload_bytes,
        ))
    }
}
