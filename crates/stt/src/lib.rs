//! Hark speech-to-text pipeline
//!
//! Audio decoding, upload validation, and the transcription backend
//! abstraction (local whisper.cpp or a remote HTTP service).

pub mod audio;
pub mod backend;
pub mod decode;
pub mod types;
pub mod validate;
pub mod wav;

// Re-export main types
pub use audio::{AudioBuffer, AudioPayload, TARGET_SAMPLE_RATE};
pub use backend::{build_backend, SttBackend};
pub use decode::decode_audio;
pub use types::{Granularity, Segment, TranscribeOptions, Transcription};
pub use validate::RequestValidator;
