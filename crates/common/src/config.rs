use crate::error::HarkError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Content-types accepted when ALLOWED_CONTENT_TYPES is not set.
///
/// Covers the common MIME spellings for the containers the decoder handles.
pub const DEFAULT_ALLOWED_CONTENT_TYPES: &[&str] = &[
    "audio/wav",
    "audio/x-wav",
    "audio/wave",
    "audio/mpeg",
    "audio/mp3",
    "audio/mp4",
    "audio/m4a",
    "audio/x-m4a",
    "audio/aac",
    "audio/ogg",
    "audio/vorbis",
    "audio/flac",
    "audio/x-flac",
    "audio/webm",
];

/// Which transcription backend the service runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process whisper.cpp engine
    Local,
    /// Remote STT engine reached over HTTP
    Remote,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = HarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            other => Err(HarkError::config(format!(
                "unknown backend kind '{}' (expected 'local' or 'remote')",
                other
            ))),
        }
    }
}

/// How GET /health treats backend readiness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthReadiness {
    /// Always report ok; no dependencies checked
    Lenient,
    /// Backend must confirm readiness before reporting ok
    Strict,
}

impl FromStr for HealthReadiness {
    type Err = HarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            other => Err(HarkError::config(format!(
                "unknown health readiness '{}' (expected 'lenient' or 'strict')",
                other
            ))),
        }
    }
}

/// Hark application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server bind address
    pub server_host: String,

    /// Server port
    pub server_port: u16,

    /// Maximum accepted payload size in bytes
    pub max_payload_bytes: usize,

    /// Maximum accepted audio duration in seconds (checked after decode)
    pub max_duration_seconds: u64,

    /// End-to-end deadline per transcription request, in seconds
    pub request_timeout_seconds: u64,

    /// Which transcription backend to construct at startup
    pub backend_kind: BackendKind,

    /// Base URL of the remote STT engine (required when backend is remote)
    pub backend_endpoint: Option<String>,

    /// Optional bearer token for the remote STT engine
    pub backend_api_key: Option<String>,

    /// Lowercased content-types the validator accepts
    pub allowed_content_types: Vec<String>,

    /// Path to the whisper model file used by the local backend
    pub whisper_model: PathBuf,

    /// Health endpoint readiness mode
    pub health_readiness: HealthReadiness,

    /// Log directory
    pub log_dir: PathBuf,

    /// Log level
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 8080,
            max_payload_bytes: 25 * 1024 * 1024,
            max_duration_seconds: 300,
            request_timeout_seconds: 30,
            backend_kind: BackendKind::Local,
            backend_endpoint: None,
            backend_api_key: None,
            allowed_content_types: DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            whisper_model: PathBuf::from("models/ggml-base.bin"),
            health_readiness: HealthReadiness::Lenient,
            log_dir: PathBuf::from("./logs"),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self, HarkError> {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        let defaults = Self::default();

        let config = Self {
            server_host: std::env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: Self::get_env_parsed("SERVER_PORT")?.unwrap_or(defaults.server_port),
            max_payload_bytes: Self::get_env_parsed("MAX_PAYLOAD_BYTES")?
                .unwrap_or(defaults.max_payload_bytes),
            max_duration_seconds: Self::get_env_parsed("MAX_DURATION_SECONDS")?
                .unwrap_or(defaults.max_duration_seconds),
            request_timeout_seconds: Self::get_env_parsed("REQUEST_TIMEOUT_SECONDS")?
                .unwrap_or(defaults.request_timeout_seconds),
            backend_kind: match std::env::var("BACKEND_KIND") {
                Ok(v) => v.parse()?,
                Err(_) => defaults.backend_kind,
            },
            backend_endpoint: std::env::var("BACKEND_ENDPOINT").ok(),
            backend_api_key: std::env::var("BACKEND_API_KEY").ok(),
            allowed_content_types: match std::env::var("ALLOWED_CONTENT_TYPES") {
                Ok(v) => Self::parse_content_types(&v),
                Err(_) => defaults.allowed_content_types,
            },
            whisper_model: Self::get_env_path("WHISPER_MODEL").unwrap_or(defaults.whisper_model),
            health_readiness: match std::env::var("HEALTH_READINESS") {
                Ok(v) => v.parse()?,
                Err(_) => defaults.health_readiness,
            },
            log_dir: Self::get_env_path("LOG_DIR").unwrap_or(defaults.log_dir),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        };

        config.validate()?;

        Ok(config)
    }

    /// Get PathBuf from environment variable
    fn get_env_path(key: &str) -> Option<PathBuf> {
        std::env::var(key).ok().map(PathBuf::from)
    }

    /// Parse an environment variable, failing loudly on malformed values
    fn get_env_parsed<T: FromStr>(key: &str) -> Result<Option<T>, HarkError> {
        match std::env::var(key) {
            Ok(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| HarkError::config(format!("invalid value '{}' for {}", raw, key))),
            Err(_) => Ok(None),
        }
    }

    /// Split a comma-separated content-type list, lowercased and trimmed
    fn parse_content_types(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Get server bind address (host:port)
    pub fn server_bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), HarkError> {
        if self.server_port == 0 {
            return Err(HarkError::config("server port cannot be 0"));
        }

        if self.max_payload_bytes == 0 {
            return Err(HarkError::config("MAX_PAYLOAD_BYTES cannot be 0"));
        }

        if self.max_duration_seconds == 0 {
            return Err(HarkError::config("MAX_DURATION_SECONDS cannot be 0"));
        }

        if self.request_timeout_seconds == 0 {
            return Err(HarkError::config("REQUEST_TIMEOUT_SECONDS cannot be 0"));
        }

        if self.allowed_content_types.is_empty() {
            return Err(HarkError::config(
                "ALLOWED_CONTENT_TYPES must list at least one content-type",
            ));
        }

        if self.backend_kind == BackendKind::Remote {
            match &self.backend_endpoint {
                Some(url) if url.starts_with("http://") || url.starts_with("https://") => {}
                Some(url) => {
                    return Err(HarkError::config(format!(
                        "BACKEND_ENDPOINT must start with http:// or https://, got '{}'",
                        url
                    )));
                }
                None => {
                    return Err(HarkError::config(
                        "BACKEND_ENDPOINT is required when BACKEND_KIND is remote",
                    ));
                }
            }
        }

        Ok(())
    }
}
