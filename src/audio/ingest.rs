// Audio ingestion module
// Reads WAV files from disk or memory and folds them down to mono f32 waveforms

use hound::{SampleFormat, WavReader};
use std::io::{Cursor, Read};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Failed to read WAV file: {0}")]
    WavReadError(#[from] hound::Error),

    #[error("Failed to open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Audio file has no samples: {0}")]
    Empty(String),
}

/// A mono clip at its native sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    /// Samples normalized to f32 in range [-1.0, 1.0]
    pub samples: Vec<f32>,

    /// Sample rate in Hz (e.g., 44100, 48000)
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample value
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }
}

/// Load a WAV file from disk as a mono waveform
pub fn load_wav(path: &Path) -> Result<Waveform, AudioError> {
    let file = std::fs::File::open(path).map_err(|source| AudioError::Open {
        path: path.display().to_string(),
        source,
    })?;
    let reader = WavReader::new(std::io::BufReader::new(file))?;
    let waveform = read_mono(reader)?;

    if waveform.is_empty() {
        return Err(AudioError::Empty(path.display().to_string()));
    }

    log::debug!(
        "Loaded {}: {} Hz, {:.2}s",
        path.display(),
        waveform.sample_rate,
        waveform.duration_secs()
    );

    Ok(waveform)
}

/// Decode WAV bytes held in memory as a mono waveform
pub fn decode_wav(data: &[u8]) -> Result<Waveform, AudioError> {
    let reader = WavReader::new(Cursor::new(data))?;
    read_mono(reader)
}

fn read_mono<R: Read>(mut reader: WavReader<R>) -> Result<Waveform, AudioError> {
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    // hound hands back signed values for every integer width (8-bit included),
    // so a single full-scale divisor per bit depth is enough
    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, bits @ (8 | 16 | 24 | 32)) => {
            let full_scale = (1i64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / full_scale))
                .collect::<Result<Vec<_>, _>>()?
        }
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        (format, bits) => {
            return Err(AudioError::UnsupportedFormat(format!(
                "{:?} {}-bit audio",
                format, bits
            )));
        }
    };

    Ok(Waveform::new(
        fold_to_mono(&interleaved, channels),
        spec.sample_rate,
    ))
}

/// Average interleaved channels into one
pub fn fold_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
