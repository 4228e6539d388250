//! Local whisper.cpp backend
//!
//! In-process inference through whisper-rs. The model context is loaded
//! once at startup and shared; each request gets its own inference
//! state. Compiled only with the `whisper` feature.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use hark_common::{AppConfig, HarkError, Result};

use crate::audio::AudioBuffer;
use crate::backend::SttBackend;
use crate::types::{Segment, TranscribeOptions, Transcription};

/// Segments whose no-speech probability exceeds this are suppressed by
/// the engine.
const NO_SPEECH_THRESHOLD: f32 = 0.6;

/// GPU device type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuDevice {
    Cuda,
    Metal,
    Cpu,
}

/// Backend adapter for an in-process whisper.cpp model.
pub struct LocalWhisperBackend {
    ctx: Arc<WhisperContext>,
    gpu_device: GpuDevice,
}

impl LocalWhisperBackend {
    /// Detect the GPU backend selected at compile time (CUDA > Metal > CPU).
    fn detect_gpu_device() -> GpuDevice {
        if cfg!(feature = "cuda") {
            info!("CUDA feature enabled; using CUDA backend");
            GpuDevice::Cuda
        } else if cfg!(feature = "metal") {
            info!("Metal feature enabled; using Metal backend");
            GpuDevice::Metal
        } else {
            info!("No GPU features enabled; running inference on CPU");
            GpuDevice::Cpu
        }
    }

    pub fn new(config: &AppConfig) -> Result<Self> {
        let path: &Path = config.whisper_model.as_ref();

        if !path.exists() {
            return Err(HarkError::config(format!(
                "whisper model file not found: {}",
                path.display()
            )));
        }

        let path_str = path
            .to_str()
            .ok_or_else(|| HarkError::config("whisper model path is not valid UTF-8"))?;

        info!("Loading whisper model from: {}", path.display());
        let gpu_device = Self::detect_gpu_device();

        let ctx =
            match WhisperContext::new_with_params(path_str, WhisperContextParameters::default()) {
                Ok(ctx) => ctx,
                Err(e) => {
                    // GPU initialization can fail on machines without the
                    // device; retry once before giving up.
                    if gpu_device != GpuDevice::Cpu {
                        warn!("Failed to load model with {:?}: {}; retrying", gpu_device, e);
                        WhisperContext::new_with_params(
                            path_str,
                            WhisperContextParameters::default(),
                        )
                        .map_err(|e| {
                            HarkError::config(format!("failed to load whisper model: {}", e))
                        })?
                    } else {
                        return Err(HarkError::config(format!(
                            "failed to load whisper model: {}",
                            e
                        )));
                    }
                }
            };

        info!("Whisper model loaded with {:?}", gpu_device);

        Ok(Self {
            ctx: Arc::new(ctx),
            gpu_device,
        })
    }

    pub fn gpu_device(&self) -> GpuDevice {
        self.gpu_device
    }

    /// Run inference synchronously. Called from a blocking thread.
    fn run_inference(
        ctx: &WhisperContext,
        samples: &[f32],
        language: Option<&str>,
        temperature: f32,
    ) -> Result<Transcription> {
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        if let Some(lang) = language {
            params.set_language(Some(lang));
        }
        params.set_temperature(temperature);
        params.set_no_speech_thold(NO_SPEECH_THRESHOLD);

        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        let mut state = ctx
            .create_state()
            .map_err(|e| HarkError::backend_internal(format!("whisper state: {}", e)))?;

        debug!(samples = samples.len(), "Starting whisper inference");
        state
            .full(params, samples)
            .map_err(|e| HarkError::backend_internal(format!("whisper inference: {}", e)))?;

        let num_segments = state
            .full_n_segments()
            .map_err(|e| HarkError::backend_internal(format!("segment count: {}", e)))?;

        let mut segments = Vec::new();
        let mut full_text = String::new();

        for i in 0..num_segments {
            let text = state
                .full_get_segment_text(i)
                .map_err(|e| HarkError::backend_internal(format!("segment text: {}", e)))?;

            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }

            let start = state
                .full_get_segment_t0(i)
                .map_err(|e| HarkError::backend_internal(format!("segment start: {}", e)))?;
            let end = state
                .full_get_segment_t1(i)
                .map_err(|e| HarkError::backend_internal(format!("segment end: {}", e)))?;

            // Timestamps arrive in centiseconds
            let start_sec = start as f32 / 100.0;
            let end_sec = end as f32 / 100.0;

            let confidence = Self::segment_confidence(&state, i)?;

            if !full_text.is_empty() {
                full_text.push(' ');
            }
            full_text.push_str(trimmed);

            segments.push(Segment::new(start_sec, end_sec, trimmed.to_string(), confidence));
        }

        debug!(segments = segments.len(), "Whisper inference complete");

        Ok(Transcription::new(
            full_text,
            segments,
            language.map(|l| l.to_string()),
        ))
    }

    /// Mean token probability of a segment.
    fn segment_confidence(state: &whisper_rs::WhisperState, segment: i32) -> Result<f32> {
        let num_tokens = state
            .full_n_tokens(segment)
            .map_err(|e| HarkError::backend_internal(format!("token count: {}", e)))?;

        if num_tokens == 0 {
            return Ok(0.0);
        }

        let mut sum = 0.0f32;
        for t in 0..num_tokens {
            sum += state
                .full_get_token_prob(segment, t)
                .map_err(|e| HarkError::backend_internal(format!("token prob: {}", e)))?;
        }

        Ok(sum / num_tokens as f32)
    }
}

#[async_trait]
impl SttBackend for LocalWhisperBackend {
    async fn transcribe(
        &self,
        audio: AudioBuffer,
        options: &TranscribeOptions,
    ) -> Result<Transcription> {
        let ctx = Arc::clone(&self.ctx);
        let samples = audio.samples;
        let language = options.language.clone();
        let temperature = options.temperature;

        // whisper.cpp inference is CPU/GPU bound and can run for seconds;
        // keep it off the async runtime.
        tokio::task::spawn_blocking(move || {
            Self::run_inference(&ctx, &samples, language.as_deref(), temperature)
        })
        .await
        .map_err(|e| HarkError::internal(format!("inference task panicked: {}", e)))?
    }

    fn name(&self) -> &'static str {
        "local"
    }

    fn concurrency(&self) -> usize {
        // One model context, one inference stream at a time.
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_missing_model_is_config_error() {
        let mut config = AppConfig::default();
        config.whisper_model = PathBuf::from("/nonexistent/ggml-model.bin");

        let err = LocalWhisperBackend::new(&config).unwrap_err();
        assert_eq!(err.kind(), "ConfigError");
    }

    #[test]
    fn test_gpu_detection_is_deterministic() {
        assert_eq!(
            LocalWhisperBackend::detect_gpu_device(),
            LocalWhisperBackend::detect_gpu_device()
        );
    }
}
