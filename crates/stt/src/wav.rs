//! WAV encoding
//!
//! Writes decoded PCM back into a canonical 16-bit WAV container for
//! backends that accept audio over the wire.

use crate::audio::AudioBuffer;

/// Encode an audio buffer as a 16-bit PCM WAV file.
///
/// Standard 44-byte RIFF header followed by interleaved little-endian
/// i16 samples.
pub fn encode_wav(buffer: &AudioBuffer) -> Vec<u8> {
    let num_samples = buffer.samples.len();
    let data_len = (num_samples * 2) as u32;
    let byte_rate = buffer.sample_rate * buffer.channels as u32 * 2;
    let block_align = buffer.channels * 2;

    let mut out = Vec::with_capacity(44 + num_samples * 2);

    // RIFF chunk
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    // fmt chunk (PCM)
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&buffer.channels.to_le_bytes());
    out.extend_from_slice(&buffer.sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());

    // data chunk
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());

    for &sample in &buffer.samples {
        let clamped = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        out.extend_from_slice(&clamped.to_le_bytes());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_header_fields() {
        let buffer = AudioBuffer::new(vec![0.0; 160], 16000, 1);
        let wav = encode_wav(&buffer);

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // channels at 22-23, sample rate at 24-27, bits at 34-35
        assert_eq!(u16::from_le_bytes([wav[22], wav[23]]), 1);
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 16000);
        assert_eq!(u16::from_le_bytes([wav[34], wav[35]]), 16);
        assert_eq!(wav.len(), 44 + 160 * 2);
    }

    #[test]
    fn test_wav_clamps_out_of_range_samples() {
        let buffer = AudioBuffer::new(vec![2.0, -2.0], 16000, 1);
        let wav = encode_wav(&buffer);

        let first = i16::from_le_bytes([wav[44], wav[45]]);
        let second = i16::from_le_bytes([wav[46], wav[47]]);
        assert_eq!(first, 32767);
        assert_eq!(second, -32767);
    }
}
