//! Audio buffer handling and conversion
//!
//! Down-mixing and resampling to the canonical form transcription
//! backends consume: mono f32 samples at 16kHz.

use tracing::debug;

/// Sample rate every backend consumes
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Uploaded audio exactly as received, before decoding.
///
/// Owned by the request handler for one call and discarded after decoding.
#[derive(Debug, Clone)]
pub struct AudioPayload {
    /// Raw container bytes
    pub bytes: Vec<u8>,

    /// Declared content-type, lowercased, parameters stripped
    pub content_type: String,
}

impl AudioPayload {
    /// Create a payload, normalizing the declared content-type
    pub fn new(bytes: Vec<u8>, content_type: &str) -> Self {
        Self {
            bytes,
            content_type: normalize_content_type(content_type),
        }
    }

    /// Payload size in bytes
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Lowercase a content-type and drop parameters (`audio/ogg; codecs=opus`)
pub fn normalize_content_type(raw: &str) -> String {
    raw.split(';').next().unwrap_or("").trim().to_lowercase()
}

/// Container file extension for a declared content-type.
///
/// Used to give the format probe a hint; decoding still sniffs the bytes.
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    match content_type {
        "audio/wav" | "audio/x-wav" | "audio/wave" => Some("wav"),
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/mp4" | "audio/m4a" | "audio/x-m4a" => Some("m4a"),
        "audio/aac" => Some("aac"),
        "audio/ogg" | "audio/vorbis" => Some("ogg"),
        "audio/flac" | "audio/x-flac" => Some("flac"),
        "audio/webm" => Some("webm"),
        _ => None,
    }
}

/// Content-type for a filename extension.
///
/// Fallback for multipart parts uploaded as application/octet-stream.
pub fn content_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_lowercase().as_str() {
        "wav" => Some("audio/wav"),
        "mp3" | "mpga" => Some("audio/mpeg"),
        "m4a" | "mp4" => Some("audio/mp4"),
        "aac" => Some("audio/aac"),
        "ogg" | "oga" => Some("audio/ogg"),
        "flac" => Some("audio/flac"),
        "webm" => Some("audio/webm"),
        _ => None,
    }
}

/// Decoded audio (mono, 16kHz, f32 samples)
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Audio samples normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Number of channels
    pub channels: u16,
}

impl AudioBuffer {
    /// Create a new audio buffer
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Get duration in seconds
    pub fn duration(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        let frames = self.samples.len() / self.channels.max(1) as usize;
        frames as f32 / self.sample_rate as f32
    }

    /// Convert to mono by averaging channels
    pub fn to_mono(mut self) -> Self {
        if self.channels <= 1 {
            return self;
        }

        debug!("Converting {} channel audio to mono", self.channels);

        let channels = self.channels as usize;
        let num_frames = self.samples.len() / channels;
        let mut mono_samples = Vec::with_capacity(num_frames);

        for frame_idx in 0..num_frames {
            let mut sum = 0.0;
            for ch in 0..channels {
                sum += self.samples[frame_idx * channels + ch];
            }
            mono_samples.push(sum / channels as f32);
        }

        self.samples = mono_samples;
        self.channels = 1;
        self
    }

    /// Resample to target sample rate.
    ///
    /// Linear interpolation, single pass. Deterministic: the same input
    /// always yields bit-identical output samples.
    pub fn resample(mut self, target_rate: u32) -> Self {
        if self.sample_rate == target_rate || self.samples.is_empty() {
            self.sample_rate = target_rate;
            return self;
        }

        debug!("Resampling from {}Hz to {}Hz", self.sample_rate, target_rate);

        let ratio = self.sample_rate as f64 / target_rate as f64;
        let new_length = (self.samples.len() as f64 / ratio) as usize;
        let mut resampled = Vec::with_capacity(new_length);

        for i in 0..new_length {
            let src_index = i as f64 * ratio;
            let src_index_floor = src_index.floor() as usize;
            let src_index_ceil = (src_index_floor + 1).min(self.samples.len() - 1);
            let fraction = src_index - src_index_floor as f64;

            // Linear interpolation
            let sample = self.samples[src_index_floor] * (1.0 - fraction) as f32
                + self.samples[src_index_ceil] * fraction as f32;

            resampled.push(sample);
        }

        self.samples = resampled;
        self.sample_rate = target_rate;
        self
    }
}
