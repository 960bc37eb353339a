// Effect Processing
// Pitch shifting, three-band EQ (fundsp biquads) and peak normalization

use fundsp::hacker32::{bell_hz, highshelf_hz, lowshelf_hz, AudioNode};

use super::params::EqGains;
use super::resample::resample_by_ratio;
use super::stretch::time_stretch;
use super::RenderError;

/// Low shelf corner frequency
pub const LOW_SHELF_HZ: f32 = 200.0;
/// Mid bell center frequency
pub const MID_BELL_HZ: f32 = 1000.0;
/// High shelf corner frequency
pub const HIGH_SHELF_HZ: f32 = 5000.0;

const SHELF_Q: f32 = 0.707;
const BELL_Q: f32 = 0.9;

/// Convert decibels to an amplitude factor
pub fn db_to_gain(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}

/// Transpose audio by a number of semitones, keeping its duration
///
/// Stretches by 2^(s/12) and resamples back to the original length, so the
/// result stays at `sample_rate`.
pub fn pitch_shift(samples: &[f32], sample_rate: u32, semitones: i32) -> Result<Vec<f32>, RenderError> {
    if sample_rate == 0 {
        return Err(RenderError::InvalidParameter(
            "sample rate must be non-zero".to_string(),
        ));
    }
    if semitones == 0 || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    log::debug!(
        "Pitch shift {:+} st over {:.2}s at {} Hz",
        semitones,
        samples.len() as f64 / sample_rate as f64,
        sample_rate
    );

    let factor = 2.0f32.powf(semitones as f32 / 12.0);

    // A tempo ratio below 1.0 lengthens the clip by `factor`
    let stretched = time_stretch(samples, 1.0 / factor)?;
    let mut shifted = resample_by_ratio(&stretched, samples.len() as f64 / stretched.len() as f64)?;
    shifted.resize(samples.len(), 0.0);

    Ok(shifted)
}

/// Apply the three-band EQ
pub fn equalize(samples: &[f32], sample_rate: u32, gains: &EqGains) -> Result<Vec<f32>, RenderError> {
    if gains.is_flat() || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    if sample_rate == 0 {
        return Err(RenderError::InvalidParameter(
            "sample rate must be non-zero".to_string(),
        ));
    }

    // Shelves and bell stay below Nyquist for low-rate material
    let nyquist = sample_rate as f32 / 2.0;
    let high_hz = HIGH_SHELF_HZ.min(nyquist * 0.9);
    let mid_hz = MID_BELL_HZ.min(nyquist * 0.5);

    let mut chain = lowshelf_hz(LOW_SHELF_HZ, SHELF_Q, db_to_gain(gains.low_db))
        >> bell_hz(mid_hz, BELL_Q, db_to_gain(gains.mid_db))
        >> highshelf_hz(high_hz, SHELF_Q, db_to_gain(gains.high_db));
    chain.set_sample_rate(sample_rate as f64);
    chain.reset();

    Ok(samples.iter().map(|&x| chain.filter_mono(x)).collect())
}

/// Scale the signal so its largest absolute sample is 1.0
///
/// Silent input is left as is.
pub fn peak_normalize(samples: &mut [f32]) {
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak <= f32::EPSILON || !peak.is_finite() {
        return;
    }

    for sample in samples.iter_mut() {
        *sample /= peak;
    }
}
