use std::sync::Arc;

use hark_common::{AppConfig, Result};
use hark_stt::backend::build_backend;
use hark_stt::{RequestValidator, SttBackend};

use crate::slots::SlotPool;

/// Shared application state
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Upload limit checks
    pub validator: RequestValidator,

    /// Active transcription backend
    pub backend: Arc<dyn SttBackend>,

    /// Concurrency slots, sized to the backend
    pub slots: SlotPool,
}

impl AppState {
    /// Create application state with the configured backend.
    pub fn new(config: AppConfig) -> Result<Self> {
        let backend = build_backend(&config)?;
        Ok(Self::with_backend(config, backend))
    }

    /// Create application state around an already-built backend.
    ///
    /// Used by tests to substitute a scripted backend.
    pub fn with_backend(config: AppConfig, backend: Arc<dyn SttBackend>) -> Self {
        let validator = RequestValidator::from_config(&config);
        let slots = SlotPool::new(backend.concurrency());
        Self {
            config,
            validator,
            backend,
            slots,
        }
    }
}
