//! Scripted backend for tests
//!
//! Produces a deterministic transcript derived from the audio duration,
//! or fails/stalls on demand. Tracks call and concurrency counters so
//! tests can assert how the pipeline drove it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use hark_common::{HarkError, Result};

use crate::audio::AudioBuffer;
use crate::backend::SttBackend;
use crate::types::{Segment, TranscribeOptions, Transcription};

/// What the mock does when asked to transcribe.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return a deterministic transcript
    Succeed,
    /// Return this error
    Fail(HarkError),
    /// Sleep this long, then return a transcript
    Hang(Duration),
}

/// Test double implementing [`SttBackend`].
pub struct MockBackend {
    behavior: MockBehavior,
    delay: Option<Duration>,
    concurrency: usize,
    ready: bool,
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            behavior: MockBehavior::Succeed,
            delay: None,
            concurrency: 2,
            ready: true,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Mock that fails every call with the given error.
    pub fn failing(err: HarkError) -> Self {
        Self {
            behavior: MockBehavior::Fail(err),
            ..Self::new()
        }
    }

    /// Mock that stalls for `duration` before answering.
    pub fn hanging(duration: Duration) -> Self {
        Self {
            behavior: MockBehavior::Hang(duration),
            ..Self::new()
        }
    }

    /// Mock whose readiness probe fails.
    pub fn unready() -> Self {
        Self {
            ready: false,
            ..Self::new()
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Add per-call latency to successful transcriptions.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Total transcribe calls received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of transcribe calls in flight at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Calls currently in flight.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    fn scripted_transcription(audio: &AudioBuffer, options: &TranscribeOptions) -> Transcription {
        let duration = audio.duration();
        // One segment per two seconds of audio, at least one.
        let count = ((duration / 2.0).ceil() as usize).max(1);

        let mut segments = Vec::with_capacity(count);
        let mut text = String::new();
        for i in 0..count {
            let start = i as f32 * 2.0;
            let end = (start + 2.0).min(duration.max(start));
            let segment_text = format!("mock transcript segment {}", i + 1);
            if i > 0 {
                text.push(' ');
            }
            text.push_str(&segment_text);
            segments.push(Segment::new(start, end, segment_text, 0.95));
        }

        let language = options.language.clone().or_else(|| Some("en".to_string()));
        Transcription::new(text, segments, language)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the active counter even when the call future is dropped
/// at a timeout.
struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SttBackend for MockBackend {
    async fn transcribe(
        &self,
        audio: AudioBuffer,
        options: &TranscribeOptions,
    ) -> Result<Transcription> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_active, Ordering::SeqCst);
        let _guard = ActiveGuard(&self.active);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.behavior {
            MockBehavior::Succeed => Ok(Self::scripted_transcription(&audio, options)),
            MockBehavior::Fail(err) => Err(err.clone()),
            MockBehavior::Hang(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(Self::scripted_transcription(&audio, options))
            }
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }

    fn concurrency(&self) -> usize {
        self.concurrency
    }

    async fn check_ready(&self) -> Result<()> {
        if self.ready {
            Ok(())
        } else {
            Err(HarkError::backend_unavailable("mock backend is not ready"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_second_audio() -> AudioBuffer {
        AudioBuffer::new(vec![0.0; 16000], 16000, 1)
    }

    #[tokio::test]
    async fn test_mock_transcript_is_deterministic() {
        let backend = MockBackend::new();
        let options = TranscribeOptions::default();

        let a = backend
            .transcribe(one_second_audio(), &options)
            .await
            .unwrap();
        let b = backend
            .transcribe(one_second_audio(), &options)
            .await
            .unwrap();

        assert_eq!(a.text, b.text);
        assert_eq!(a.segments.len(), b.segments.len());
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_segments_cover_duration() {
        let backend = MockBackend::new();
        let five_seconds = AudioBuffer::new(vec![0.0; 16000 * 5], 16000, 1);

        let result = backend
            .transcribe(five_seconds, &TranscribeOptions::default())
            .await
            .unwrap();

        // 5 seconds at one segment per 2s -> 3 segments
        assert_eq!(result.segments.len(), 3);
        assert_eq!(result.segments[0].start, 0.0);
        let last = result.segments.last().unwrap();
        assert!((last.end - 5.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_mock_fail_mode() {
        let backend = MockBackend::failing(HarkError::backend_internal("scripted"));
        let err = backend
            .transcribe(one_second_audio(), &TranscribeOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "BackendInternal");
    }

    #[tokio::test]
    async fn test_mock_echoes_language_hint() {
        let backend = MockBackend::new();
        let options = TranscribeOptions::default().with_language("ko");

        let result = backend
            .transcribe(one_second_audio(), &options)
            .await
            .unwrap();
        assert_eq!(result.language.as_deref(), Some("ko"));
    }

    #[tokio::test]
    async fn test_mock_readiness() {
        assert!(MockBackend::new().check_ready().await.is_ok());
        let err = MockBackend::unready().check_ready().await.unwrap_err();
        assert_eq!(err.kind(), "BackendUnavailable");
    }

    #[tokio::test]
    async fn test_active_counter_resets_after_calls() {
        let backend = MockBackend::new();
        backend
            .transcribe(one_second_audio(), &TranscribeOptions::default())
            .await
            .unwrap();
        assert_eq!(backend.active(), 0);
        assert_eq!(backend.peak_concurrency(), 1);
    }
}
