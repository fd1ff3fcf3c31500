//! PCM decoder for synthesized speech
//!
//! The synthesis service answers with raw little-endian 16-bit signed PCM,
//! mono, 24 kHz, wrapped in base64. The format is fixed by the service and
//! never negotiated.

use super::AudioBuffer;
use crate::error::DecodeError;
use base64::{engine::general_purpose, Engine as _};
use log::debug;

/// Sample rate of synthesized speech
pub const PCM_SAMPLE_RATE: u32 = 24_000;

/// Channel count of synthesized speech
pub const PCM_CHANNELS: usize = 1;

/// Scale from i16 to [-1.0, 1.0)
const I16_SCALE: f32 = 32768.0;

/// Decode a base64 PCM payload into an audio buffer
pub fn decode_pcm_base64(payload: &str) -> Result<AudioBuffer, DecodeError> {
    // Line-wrapped base64 is still valid input
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    let bytes = general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| DecodeError::Base64(e.to_string()))?;

    decode_pcm_bytes(&bytes)
}

/// Decode raw little-endian i16 PCM bytes
pub fn decode_pcm_bytes(bytes: &[u8]) -> Result<AudioBuffer, DecodeError> {
    if bytes.len() % 2 != 0 {
        return Err(DecodeError::OddLength(bytes.len()));
    }

    let samples: Vec<f32> = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / I16_SCALE)
        .collect();

    debug!(
        "Decoded {} PCM frames ({:.2}s)",
        samples.len() / PCM_CHANNELS,
        samples.len() as f64 / PCM_SAMPLE_RATE as f64
    );

    Ok(AudioBuffer::mono(PCM_SAMPLE_RATE, samples))
}

/// Encode i16 samples the way the synthesis service does
pub fn encode_pcm_base64(samples: &[i16]) -> String {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    general_purpose::STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_samples() {
        let payload = encode_pcm_base64(&[0, 16384, -16384, i16::MAX, i16::MIN]);
        let buffer = decode_pcm_base64(&payload).unwrap();

        assert_eq!(buffer.sample_rate(), PCM_SAMPLE_RATE);
        assert_eq!(buffer.channel_count(), PCM_CHANNELS);

        let samples = buffer.channel(0).unwrap();
        assert_eq!(samples[0], 0.0);
        assert_eq!(samples[1], 0.5);
        assert_eq!(samples[2], -0.5);
        assert!((samples[3] - 32767.0 / 32768.0).abs() < f32::EPSILON);
        assert_eq!(samples[4], -1.0);
    }

    #[test]
    fn test_decode_empty() {
        let buffer = decode_pcm_base64("").unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.duration(), 0.0);
    }

    #[test]
    fn test_malformed_base64() {
        let err = decode_pcm_base64("not*base64!").unwrap_err();
        assert!(matches!(err, DecodeError::Base64(_)));
    }

    #[test]
    fn test_odd_trailing_byte() {
        // Three bytes: one full frame plus a dangling byte
        let payload = general_purpose::STANDARD.encode([0x01u8, 0x00, 0x7f]);
        assert_eq!(decode_pcm_base64(&payload), Err(DecodeError::OddLength(3)));
    }

    #[test]
    fn test_wrapped_payload() {
        let payload = encode_pcm_base64(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let (head, tail) = payload.split_at(8);
        let wrapped = format!("{}\n{}\n", head, tail);
        assert_eq!(decode_pcm_base64(&wrapped).unwrap().frames(), 8);
    }
}
