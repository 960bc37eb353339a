// Resampling using rubato
// Used for pitch shifting and for aligning stems recorded at different rates

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use super::RenderError;

/// Resample a mono signal by `ratio` (output rate / input rate)
///
/// The sinc filter's delay is compensated so the output starts at the same
/// instant as the input. Output length is `round(len * ratio)`.
pub fn resample_by_ratio(samples: &[f32], ratio: f64) -> Result<Vec<f32>, RenderError> {
    if !ratio.is_finite() || ratio <= 0.0 {
        return Err(RenderError::InvalidParameter(format!(
            "resample ratio must be positive, got {}",
            ratio
        )));
    }

    if (ratio - 1.0).abs() < 1e-9 || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    // Pad the tail so the filter flushes the last real samples
    let padded_len = samples.len() + sinc_params().sinc_len * 3;
    let mut padded = Vec::with_capacity(padded_len);
    padded.extend_from_slice(samples);
    padded.resize(padded_len, 0.0);

    // A unit impulse runs through a second channel of the same resampler;
    // its peak position is the delay to skip
    let mut impulse = vec![0.0f32; padded_len];
    impulse[0] = 1.0;

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, sinc_params(), padded_len, 2)
        .map_err(|e| RenderError::Resample(e.to_string()))?;
    let mut waves_out = resampler
        .process(&[padded, impulse], None)
        .map_err(|e| RenderError::Resample(e.to_string()))?;

    let response = waves_out.pop().unwrap_or_default();
    let delay = peak_index(&response);
    log::trace!("Sinc resampler delay at ratio {:.4}: {} samples", ratio, delay);

    let target_len = (samples.len() as f64 * ratio).round() as usize;
    let mut output: Vec<f32> = waves_out
        .into_iter()
        .next()
        .unwrap_or_default()
        .into_iter()
        .skip(delay)
        .take(target_len)
        .collect();
    output.resize(target_len, 0.0);

    Ok(output)
}

fn sinc_params() -> SincInterpolationParameters {
    SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    }
}

/// Index of the largest sample
fn peak_index(samples: &[f32]) -> usize {
    samples
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(index, _)| index)
        .unwrap_or(0)
}

/// Convert a signal from one sample rate to another
pub fn resample_rate(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, RenderError> {
    if from_rate == 0 || to_rate == 0 {
        return Err(RenderError::InvalidParameter(format!(
            "cannot resample between {} Hz and {} Hz",
            from_rate, to_rate
        )));
    }
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    log::debug!("Resampling {} samples from {} Hz to {} Hz", samples.len(), from_rate, to_rate);
    resample_by_ratio(samples, to_rate as f64 / from_rate as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_same_rate_is_identity() {
        let input = vec![0.1, 0.2, 0.3];
        assert_eq!(resample_rate(&input, 44100, 44100).unwrap(), input);
    }

    #[test]
    fn test_output_length() {
        let input = vec![0.0f32; 48000];
        let output = resample_rate(&input, 48000, 44100).unwrap();
        assert_eq!(output.len(), 44100);

        let output = resample_by_ratio(&input, 0.5).unwrap();
        assert_eq!(output.len(), 24000);
    }

    #[test]
    fn test_rejects_zero_rate() {
        assert!(resample_rate(&[0.0; 8], 0, 44100).is_err());
        assert!(resample_by_ratio(&[0.0; 8], 0.0).is_err());
    }

    #[test]
    fn test_delay_is_compensated() {
        // A slow sine should still start near zero and rise, not start with silence
        let input: Vec<f32> = (0..8000)
            .map(|i| (2.0 * PI * 100.0 * i as f32 / 8000.0).sin())
            .collect();
        let output = resample_by_ratio(&input, 2.0).unwrap();

        assert_eq!(output.len(), 16000);
        // Quarter period of 100 Hz at 16 kHz is sample 40
        assert!(output[40] > 0.9, "peak misplaced: {}", output[40]);
    }

    #[test]
    fn test_impulse_stays_in_place() {
        let mut input = vec![0.0f32; 4000];
        input[1000] = 1.0;

        for (ratio, expected) in [(2.0, 2000usize), (0.5, 500), (1.5, 1500)] {
            let output = resample_by_ratio(&input, ratio).unwrap();
            let peak = peak_index(&output);
            assert!(
                peak.abs_diff(expected) <= 1,
                "ratio {}: impulse at {}, expected {}",
                ratio,
                peak,
                expected
            );
        }
    }

    #[test]
    fn test_slow_sine_keeps_phase_at_half_rate() {
        let input: Vec<f32> = (0..16000)
            .map(|i| (2.0 * PI * 50.0 * i as f32 / 16000.0).sin())
            .collect();
        let output = resample_by_ratio(&input, 0.5).unwrap();

        // Quarter period of 50 Hz at 8 kHz is sample 40
        assert!(output[40] > 0.9, "peak misplaced: {}", output[40]);
        assert!(output[120] < -0.9, "trough misplaced: {}", output[120]);
    }
}
