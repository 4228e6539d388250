/// Hark error types
///
/// One taxonomy for the whole pipeline. Client-side rejections (bad format,
/// oversized payload, undecodable audio) map to 4xx; backend and orchestration
/// failures map to 5xx. Every variant carries a stable machine-readable kind
/// so callers can tell retryable failures from terminal ones.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HarkError {
    /// Declared content-type is not in the allowed set
    #[error("unsupported content-type: {0}")]
    UnsupportedFormat(String),

    /// Payload byte size exceeds the configured maximum
    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Decoded audio duration exceeds the configured maximum
    #[error("audio duration of {duration:.1}s exceeds the {limit}s limit")]
    DurationExceeded { duration: f32, limit: u64 },

    /// Malformed container, unsupported codec, or truncated stream
    #[error("audio decoding failed: {0}")]
    Decode(String),

    /// Transcription engine cannot be reached or is not loaded
    #[error("transcription backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Transcription engine did not answer within its own deadline
    #[error("transcription backend timed out: {0}")]
    BackendTimeout(String),

    /// Transcription engine failed while processing the audio
    #[error("transcription backend error: {0}")]
    BackendInternal(String),

    /// The request-level deadline elapsed before the job finished.
    /// Distinct from BackendTimeout: this is the orchestrator's own clock.
    #[error("request timed out after {timeout_secs}s")]
    TimedOut { timeout_secs: u64 },

    /// Malformed request envelope (bad multipart body, missing file field)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl HarkError {
    /// Create decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create backend-unavailable error
    pub fn backend_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::BackendUnavailable(msg.into())
    }

    /// Create backend-timeout error
    pub fn backend_timeout<S: Into<String>>(msg: S) -> Self {
        Self::BackendTimeout(msg.into())
    }

    /// Create backend-internal error
    pub fn backend_internal<S: Into<String>>(msg: S) -> Self {
        Self::BackendInternal(msg.into())
    }

    /// Create invalid-request error
    pub fn invalid_request<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

// HTTP mapping used by the server crate
impl HarkError {
    /// Stable wire identifier, unique per taxonomy entry
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "UnsupportedFormat",
            Self::PayloadTooLarge { .. } => "PayloadTooLarge",
            Self::DurationExceeded { .. } => "DurationExceeded",
            Self::Decode(_) => "DecodeError",
            Self::BackendUnavailable(_) => "BackendUnavailable",
            Self::BackendTimeout(_) => "BackendTimeout",
            Self::BackendInternal(_) => "BackendInternal",
            Self::TimedOut { .. } => "TimedOut",
            Self::InvalidRequest(_) => "InvalidRequest",
            Self::Config(_) => "ConfigError",
            Self::Internal(_) => "Internal",
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UnsupportedFormat(_) => 400,
            Self::PayloadTooLarge { .. } => 400,
            Self::DurationExceeded { .. } => 400,
            Self::Decode(_) => 400,
            Self::InvalidRequest(_) => 400,
            Self::BackendUnavailable(_) => 503,
            Self::BackendTimeout(_) => 504,
            Self::BackendInternal(_) => 502,
            Self::TimedOut { .. } => 504,
            Self::Config(_) => 500,
            Self::Internal(_) => 500,
        }
    }

    /// True for rejections the client caused; these are never retried
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<HarkError> {
        vec![
            HarkError::UnsupportedFormat("application/pdf".to_string()),
            HarkError::PayloadTooLarge { size: 10, limit: 5 },
            HarkError::DurationExceeded { duration: 10.0, limit: 5 },
            HarkError::decode("bad header"),
            HarkError::backend_unavailable("connection refused"),
            HarkError::backend_timeout("no answer in 20s"),
            HarkError::backend_internal("inference failed"),
            HarkError::TimedOut { timeout_secs: 30 },
            HarkError::invalid_request("no file field"),
            HarkError::config("missing endpoint"),
            HarkError::internal("oops"),
        ]
    }

    #[test]
    fn test_kinds_are_unique() {
        let variants = all_variants();
        let mut kinds: Vec<&str> = variants.iter().map(|e| e.kind()).collect();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), variants.len());
    }

    #[test]
    fn test_client_errors_are_4xx() {
        assert_eq!(
            HarkError::UnsupportedFormat("text/plain".to_string()).status_code(),
            400
        );
        assert_eq!(
            HarkError::PayloadTooLarge { size: 2, limit: 1 }.status_code(),
            400
        );
        assert_eq!(
            HarkError::DurationExceeded {
                duration: 9.0,
                limit: 5
            }
            .status_code(),
            400
        );
        assert_eq!(HarkError::decode("x").status_code(), 400);
        assert!(HarkError::decode("x").is_client_error());
    }

    #[test]
    fn test_backend_errors_are_5xx() {
        assert_eq!(HarkError::backend_unavailable("x").status_code(), 503);
        assert_eq!(HarkError::backend_timeout("x").status_code(), 504);
        assert_eq!(HarkError::backend_internal("x").status_code(), 502);
        assert!(!HarkError::backend_internal("x").is_client_error());
    }

    #[test]
    fn test_deadline_timeout_is_distinct_from_backend_timeout() {
        let ours = HarkError::TimedOut { timeout_secs: 30 };
        let theirs = HarkError::backend_timeout("engine");
        assert_ne!(ours.kind(), theirs.kind());
        assert_eq!(ours.status_code(), 504);
    }
}
