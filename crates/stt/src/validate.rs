//! Upload validation
//!
//! Gate checks applied before any decode or backend work is spent on a
//! request. Each rejection carries its own error kind so clients can
//! tell a bad upload apart from a server fault.

use std::collections::HashSet;

use hark_common::{AppConfig, HarkError, Result};

use crate::audio::{AudioBuffer, AudioPayload};

/// Validates uploads against configured limits.
///
/// Checks run in a fixed order: content-type, byte size, then (once the
/// payload is decoded) duration. Pure inspection, no side effects.
#[derive(Debug, Clone)]
pub struct RequestValidator {
    max_payload_bytes: usize,
    max_duration_seconds: u64,
    allowed_content_types: HashSet<String>,
}

impl RequestValidator {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_payload_bytes: config.max_payload_bytes,
            max_duration_seconds: config.max_duration_seconds,
            allowed_content_types: config
                .allowed_content_types
                .iter()
                .map(|ct| ct.to_lowercase())
                .collect(),
        }
    }

    /// Check declared content-type and byte size, before decoding.
    ///
    /// An unsupported type is reported even when the payload is also
    /// oversized; the type check runs first.
    pub fn check_payload(&self, payload: &AudioPayload) -> Result<()> {
        if !self.allowed_content_types.contains(&payload.content_type) {
            return Err(HarkError::UnsupportedFormat(payload.content_type.clone()));
        }

        if payload.size() > self.max_payload_bytes {
            return Err(HarkError::PayloadTooLarge {
                size: payload.size(),
                limit: self.max_payload_bytes,
            });
        }

        Ok(())
    }

    /// Check decoded duration against the configured limit.
    pub fn check_duration(&self, audio: &AudioBuffer) -> Result<()> {
        let duration = audio.duration();
        if duration > self.max_duration_seconds as f32 {
            return Err(HarkError::DurationExceeded {
                duration,
                limit: self.max_duration_seconds,
            });
        }
        Ok(())
    }

    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }

    pub fn max_duration_seconds(&self) -> u64 {
        self.max_duration_seconds
    }
}
