//! Shared application state.
//!
//! Everything in here is read-only after startup: configuration, the upload
//! validator, the bounded job runner, and the injected detection backends.
//! No image buffer or option structure ever lives here.

use std::sync::Arc;

use pixelmill_core::Config;
use pixelmill_processing::detector::UnavailableBackend;
use pixelmill_processing::{Capabilities, UploadValidator};

use crate::jobs::JobRunner;

pub struct AppState {
    pub config: Config,
    pub validator: UploadValidator,
    pub jobs: JobRunner,
    pub capabilities: Capabilities,
}

impl AppState {
    /// Production state: no detection backends unless a deployment wires
    /// them in via `with_capabilities`.
    pub fn new(config: Config) -> Arc<Self> {
        let capabilities = Capabilities {
            detector: Arc::new(UnavailableBackend),
            segmenter: Arc::new(UnavailableBackend),
            font_path: config.font_path.clone(),
        };
        Self::with_capabilities(config, capabilities)
    }

    pub fn with_capabilities(config: Config, capabilities: Capabilities) -> Arc<Self> {
        let validator = UploadValidator::new(config.max_upload_bytes);
        let jobs = JobRunner::new(config.max_concurrent_jobs, config.job_timeout_secs);
        Arc::new(Self {
            config,
            validator,
            jobs,
            capabilities,
        })
    }
}
