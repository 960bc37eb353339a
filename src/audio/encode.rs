// WAV encoding
// Serializes rendered waveforms to 16-bit PCM for the browser players

use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;

use super::ingest::{AudioError, Waveform};

const PCM16_FULL_SCALE: f32 = 32767.0;

/// Encode a mono waveform as 16-bit PCM WAV bytes
///
/// Samples outside [-1.0, 1.0] are clamped rather than wrapped.
pub fn encode_wav(waveform: &Waveform) -> Result<Vec<u8>, AudioError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: waveform.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut bytes = Vec::with_capacity(44 + waveform.len() * 2);
    {
        let mut writer = WavWriter::new(Cursor::new(&mut bytes), spec)?;
        for &sample in &waveform.samples {
            let clamped = if sample.is_finite() {
                sample.clamp(-1.0, 1.0)
            } else {
                0.0
            };
            writer.write_sample((clamped * PCM16_FULL_SCALE).round() as i16)?;
        }
        writer.finalize()?;
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decode_wav;

    #[test]
    fn test_encode_header_and_length() {
        let waveform = Waveform::new(vec![0.0, 0.5, -0.5, 1.0], 44100);
        let bytes = encode_wav(&waveform).unwrap();

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(bytes.len(), 44 + 4 * 2);
    }

    #[test]
    fn test_encode_clamps_out_of_range() {
        let waveform = Waveform::new(vec![2.0, -3.0, f32::NAN], 8000);
        let decoded = decode_wav(&encode_wav(&waveform).unwrap()).unwrap();

        assert!((decoded.samples[0] - 1.0).abs() < 1e-3);
        assert!((decoded.samples[1] + 1.0).abs() < 1e-3);
        assert_eq!(decoded.samples[2], 0.0);
        assert_eq!(decoded.sample_rate, 8000);
    }
}
