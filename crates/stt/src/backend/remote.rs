//! Remote transcription backend
//!
//! Sends decoded audio to an external transcription service as base64
//! WAV over JSON. All transport and service failures are translated into
//! the error taxonomy here; reqwest errors never leak upstream.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use hark_common::{HarkError, Result};

use crate::audio::AudioBuffer;
use crate::backend::SttBackend;
use crate::types::{Segment, TranscribeOptions, Transcription};
use crate::wav::encode_wav;

/// Concurrent requests a remote service is assumed to absorb.
const REMOTE_CONCURRENCY: usize = 4;

/// Request to the remote transcription service
#[derive(Debug, Serialize)]
struct RemoteRequest {
    /// Base64 encoded audio (WAV, 16kHz mono)
    audio_b64: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<String>,
    temperature: f32,
}

/// Response from the remote transcription service
#[derive(Debug, Deserialize)]
struct RemoteResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    segments: Vec<RemoteSegment>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: f32,
}

#[derive(Debug, Deserialize)]
struct RemoteSegment {
    start: f32,
    end: f32,
    text: String,
    #[serde(default = "default_confidence")]
    confidence: f32,
}

fn default_confidence() -> f32 {
    1.0
}

/// Backend adapter for an HTTP transcription service.
pub struct RemoteHttpBackend {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl RemoteHttpBackend {
    pub fn new(endpoint: String, api_key: Option<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| HarkError::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn translate_send_error(e: reqwest::Error) -> HarkError {
        if e.is_timeout() {
            HarkError::backend_timeout(format!("transcription service timed out: {}", e))
        } else if e.is_connect() {
            HarkError::backend_unavailable(format!("transcription service unreachable: {}", e))
        } else {
            HarkError::backend_unavailable(format!("transcription request failed: {}", e))
        }
    }
}

#[async_trait]
impl SttBackend for RemoteHttpBackend {
    async fn transcribe(
        &self,
        audio: AudioBuffer,
        options: &TranscribeOptions,
    ) -> Result<Transcription> {
        let audio_duration = audio.duration();
        let wav = encode_wav(&audio);

        let request = RemoteRequest {
            audio_b64: BASE64.encode(&wav),
            language: options.language.clone(),
            temperature: options.temperature,
        };

        let url = format!("{}/transcribe", self.endpoint);
        debug!(url = %url, wav_bytes = wav.len(), "Sending audio to remote backend");

        let mut req = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(Self::translate_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(HarkError::backend_internal(format!(
                "transcription service returned {}: {}",
                status, snippet
            )));
        }

        let remote: RemoteResponse = response.json().await.map_err(|e| {
            HarkError::backend_internal(format!("malformed transcription response: {}", e))
        })?;

        debug!(
            segments = remote.segments.len(),
            language = ?remote.language,
            reported_duration = remote.duration,
            "Remote backend responded"
        );

        let mut segments: Vec<Segment> = remote
            .segments
            .into_iter()
            .map(|s| Segment::new(s.start, s.end, s.text, s.confidence))
            .collect();

        // A service that returns plain text without timing still yields a
        // usable single-span segment.
        if segments.is_empty() && !remote.text.trim().is_empty() {
            segments.push(Segment::new(0.0, audio_duration, remote.text.clone(), 1.0));
        }

        Ok(Transcription::new(remote.text, segments, remote.language))
    }

    fn name(&self) -> &'static str {
        "remote"
    }

    fn concurrency(&self) -> usize {
        REMOTE_CONCURRENCY
    }

    async fn check_ready(&self) -> Result<()> {
        let url = format!("{}/health", self.endpoint);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Self::translate_send_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(HarkError::backend_unavailable(format!(
                "transcription service health probe returned {}",
                response.status()
            )))
        }
    }
}
