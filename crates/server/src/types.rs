//! API request and response types

use serde::{Deserialize, Serialize};

use hark_common::HarkError;
use hark_stt::{Granularity, Transcription};

/// Successful transcription response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeResponse {
    /// Full transcribed text
    pub text: String,

    /// Detected or hinted language (ISO code), null when unknown
    pub language: Option<String>,

    /// Duration of the decoded audio in seconds
    pub duration_seconds: f32,

    /// Timestamped segments; empty when timestamps=none was requested
    pub segments: Vec<SegmentDto>,

    /// Overall confidence score in [0.0, 1.0]
    pub confidence: f32,
}

/// Single transcript segment on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentDto {
    /// Start time in seconds
    pub start: f32,

    /// End time in seconds
    pub end: f32,

    /// Transcribed text
    pub text: String,

    /// Confidence score in [0.0, 1.0]
    pub confidence: f32,
}

impl TranscribeResponse {
    /// Shape a backend result into the response body.
    ///
    /// Pure formatting: no I/O, no clock reads. `duration_seconds` is the
    /// decoded audio duration, which can exceed the span the segments
    /// cover (trailing silence).
    pub fn from_transcription(
        transcription: Transcription,
        duration_seconds: f32,
        granularity: Granularity,
    ) -> Self {
        let segments = match granularity {
            Granularity::Segment => transcription
                .segments
                .iter()
                .map(|s| SegmentDto {
                    start: s.start,
                    end: s.end,
                    text: s.text.clone(),
                    confidence: s.confidence,
                })
                .collect(),
            Granularity::None => Vec::new(),
        };

        Self {
            text: transcription.text,
            language: transcription.language,
            duration_seconds,
            segments,
            confidence: transcription.confidence,
        }
    }
}

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Machine-readable error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable taxonomy kind, e.g. "UnsupportedFormat"
    pub kind: String,

    /// Human-readable description
    pub message: String,
}

impl From<&HarkError> for ErrorResponse {
    fn from(err: &HarkError) -> Self {
        Self {
            error: ErrorBody {
                kind: err.kind().to_string(),
                message: err.to_string(),
            },
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "ok" or "unavailable"
    pub status: String,

    /// Active backend name
    pub backend: String,

    /// Transcription slots not currently in use
    pub available_slots: usize,

    /// Server version
    pub version: String,
}

/// Optional transcription parameters, accepted as query or form fields
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranscribeParams {
    /// Language hint (e.g. "en")
    pub language: Option<String>,

    /// Timestamp granularity: "segment" (default) or "none"
    pub timestamps: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use hark_stt::Segment;

    fn sample_transcription() -> Transcription {
        Transcription::new(
            "hello world".to_string(),
            vec![
                Segment::new(0.0, 1.2, "hello".to_string(), 0.9),
                Segment::new(1.2, 2.4, "world".to_string(), 0.7),
            ],
            Some("en".to_string()),
        )
    }

    #[test]
    fn test_response_with_segment_granularity() {
        let response = TranscribeResponse::from_transcription(
            sample_transcription(),
            3.0,
            Granularity::Segment,
        );

        assert_eq!(response.text, "hello world");
        assert_eq!(response.segments.len(), 2);
        assert_eq!(response.segments[0].text, "hello");
        assert_eq!(response.duration_seconds, 3.0);
        assert!((response.confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_response_with_no_timestamps() {
        let response =
            TranscribeResponse::from_transcription(sample_transcription(), 3.0, Granularity::None);

        assert_eq!(response.text, "hello world");
        assert!(response.segments.is_empty());
        // Overall confidence survives even without segments
        assert!((response.confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_error_response_shape() {
        let err = HarkError::UnsupportedFormat("application/pdf".to_string());
        let body = ErrorResponse::from(&err);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["error"]["kind"], "UnsupportedFormat");
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("application/pdf"));
    }
}
