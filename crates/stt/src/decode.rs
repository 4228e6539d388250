//! Audio container decoding
//!
//! Decodes uploaded bytes (WAV, MP3, M4A/AAC, OGG, FLAC) into a mono
//! 16kHz [`AudioBuffer`] using symphonia. Decoding is CPU-bound and
//! synchronous; callers run it on a blocking thread.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use hark_common::{HarkError, Result};

use crate::audio::{extension_for_content_type, AudioBuffer, AudioPayload, TARGET_SAMPLE_RATE};

/// Decode an uploaded payload into mono 16kHz PCM.
///
/// The declared content-type only seeds the format probe hint; the
/// container is identified from the bytes themselves, so a mislabeled
/// upload still decodes if the bytes are a supported format.
pub fn decode_audio(payload: AudioPayload) -> Result<AudioBuffer> {
    if payload.bytes.is_empty() {
        return Err(HarkError::decode("empty audio payload"));
    }

    let cursor = Cursor::new(payload.bytes);
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension_for_content_type(&payload.content_type) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| HarkError::decode(format!("unrecognized audio container: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| HarkError::decode("no audio track found"))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let source_rate = codec_params
        .sample_rate
        .ok_or_else(|| HarkError::decode("source sample rate unknown"))?;
    let channels = codec_params.channels.map(|c| c.count()).unwrap_or(1) as u16;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| HarkError::decode(format!("unsupported codec: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(HarkError::decode(format!("packet read failed: {}", e)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(error = %e, "Skipping corrupt audio frame");
                continue;
            }
            Err(e) => {
                return Err(HarkError::decode(format!("decode failed: {}", e)));
            }
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();
        if num_frames == 0 {
            continue;
        }

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(sample_buf.samples());
    }

    if samples.is_empty() {
        return Err(HarkError::decode("no audio samples decoded"));
    }

    let buffer = AudioBuffer::new(samples, source_rate, channels)
        .to_mono()
        .resample(TARGET_SAMPLE_RATE);

    debug!(
        samples = buffer.samples.len(),
        duration_secs = buffer.duration(),
        source_rate,
        source_channels = channels,
        "Decoded audio to 16kHz mono PCM"
    );

    Ok(buffer)
}
