//! Transcription backend abstraction
//!
//! The request pipeline depends on the [`SttBackend`] trait instead of a
//! concrete engine, which keeps orchestration decoupled from inference
//! code and lets tests substitute a scripted backend.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use hark_common::{AppConfig, BackendKind, HarkError, Result};

use crate::audio::AudioBuffer;
use crate::types::{TranscribeOptions, Transcription};

#[cfg(feature = "whisper")]
pub mod local;
pub mod mock;
pub mod remote;

/// Backend contract implemented by transcription engines.
///
/// Implementations translate their own failures into the error taxonomy
/// at this boundary; engine-specific errors never cross it.
#[async_trait]
pub trait SttBackend: Send + Sync {
    /// Run inference on decoded 16kHz mono audio.
    async fn transcribe(
        &self,
        audio: AudioBuffer,
        options: &TranscribeOptions,
    ) -> Result<Transcription>;

    /// Short backend name for logs and health output.
    fn name(&self) -> &'static str;

    /// Number of requests this backend can serve concurrently.
    ///
    /// Sized by the adapter: a single in-process model context serves one
    /// stream at a time, a remote service can take several.
    fn concurrency(&self) -> usize;

    /// Probe whether the backend can currently serve requests.
    async fn check_ready(&self) -> Result<()> {
        Ok(())
    }
}

impl fmt::Debug for dyn SttBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SttBackend")
            .field("name", &self.name())
            .finish()
    }
}

/// Build the configured backend implementation.
pub fn build_backend(config: &AppConfig) -> Result<Arc<dyn SttBackend>> {
    match config.backend_kind {
        BackendKind::Local => {
            #[cfg(feature = "whisper")]
            {
                Ok(Arc::new(local::LocalWhisperBackend::new(config)?))
            }
            #[cfg(not(feature = "whisper"))]
            {
                Err(HarkError::config(
                    "BACKEND_KIND=local requires a build with the `whisper` feature enabled",
                ))
            }
        }
        BackendKind::Remote => {
            let endpoint = config.backend_endpoint.clone().ok_or_else(|| {
                HarkError::config("BACKEND_KIND=remote requires BACKEND_ENDPOINT to be set")
            })?;
            Ok(Arc::new(remote::RemoteHttpBackend::new(
                endpoint,
                config.backend_api_key.clone(),
                config.request_timeout_seconds,
            )?))
        }
    }
}
