use serde::{Deserialize, Serialize};
use std::str::FromStr;

use hark_common::HarkError;

/// Single transcription segment with timestamps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Start time in seconds
    pub start: f32,

    /// End time in seconds
    pub end: f32,

    /// Transcribed text
    pub text: String,

    /// Confidence score in [0.0, 1.0]
    pub confidence: f32,
}

impl Segment {
    /// Create a new segment; confidence is clamped to [0.0, 1.0]
    pub fn new(start: f32, end: f32, text: String, confidence: f32) -> Self {
        Self {
            start,
            end,
            text,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Get duration in seconds
    pub fn duration(&self) -> f32 {
        self.end - self.start
    }
}

/// Complete transcription result, immutable once produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcription {
    /// Full transcribed text
    pub text: String,

    /// Individual segments with timestamps
    pub segments: Vec<Segment>,

    /// Detected or hinted language (ISO code), when known
    pub language: Option<String>,

    /// Overall confidence score in [0.0, 1.0]
    pub confidence: f32,
}

impl Transcription {
    /// Create a new transcription; overall confidence is the mean of the
    /// segment confidences unless the caller supplies one.
    pub fn new(text: String, segments: Vec<Segment>, language: Option<String>) -> Self {
        let confidence = mean_confidence(&segments);
        Self {
            text,
            segments,
            language,
            confidence,
        }
    }

    /// Create a transcription with an explicitly reported overall confidence
    pub fn with_confidence(
        text: String,
        segments: Vec<Segment>,
        language: Option<String>,
        confidence: f32,
    ) -> Self {
        Self {
            text,
            segments,
            language,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// End time of the last segment, in seconds
    pub fn spoken_duration(&self) -> f32 {
        self.segments.last().map(|seg| seg.end).unwrap_or(0.0)
    }
}

fn mean_confidence(segments: &[Segment]) -> f32 {
    if segments.is_empty() {
        return 0.0;
    }
    let sum: f32 = segments.iter().map(|s| s.confidence).sum();
    (sum / segments.len() as f32).clamp(0.0, 1.0)
}

/// Timestamp detail requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Include per-segment timestamps in the response
    #[default]
    Segment,
    /// Text only; segments are omitted from the response
    None,
}

impl FromStr for Granularity {
    type Err = HarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "segment" => Ok(Self::Segment),
            "none" => Ok(Self::None),
            other => Err(HarkError::invalid_request(format!(
                "unknown timestamp granularity '{}' (expected 'segment' or 'none')",
                other
            ))),
        }
    }
}

/// Transcription options
#[derive(Debug, Clone)]
pub struct TranscribeOptions {
    /// Language hint (e.g., "en", "ko"); None lets the engine detect
    pub language: Option<String>,

    /// Timestamp detail for the response
    pub granularity: Granularity,

    /// Temperature for sampling (0.0 = greedy)
    pub temperature: f32,
}

impl Default for TranscribeOptions {
    fn default() -> Self {
        Self {
            language: None,
            granularity: Granularity::Segment,
            temperature: 0.0,
        }
    }
}

impl TranscribeOptions {
    /// Create new options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set language hint
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Set timestamp granularity
    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }
}
