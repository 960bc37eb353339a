// Time Stretching - Phase vocoder time-scale modification
// Changes playback speed without changing pitch

use realfft::num_complex::Complex;
use realfft::RealFftPlanner;
use std::f32::consts::PI;

use super::RenderError;

/// Configuration for the phase vocoder
#[derive(Debug, Clone)]
pub struct StretchConfig {
    /// FFT window size in samples (power of 2)
    pub window_size: usize,

    /// Synthesis hop size in samples
    /// Analysis hop is derived from this and the tempo ratio
    pub synthesis_hop: usize,
}

impl Default for StretchConfig {
    fn default() -> Self {
        StretchConfig {
            window_size: 2048,
            synthesis_hop: 512,
        }
    }
}

/// Ratios this close to 1.0 leave the signal untouched
const IDENTITY_EPSILON: f32 = 1e-6;

/// Stretch audio in time by a tempo ratio
///
/// A ratio above 1.0 speeds the clip up (shorter output), below 1.0 slows it
/// down. Output length is `round(len / tempo_ratio)`.
pub fn time_stretch(samples: &[f32], tempo_ratio: f32) -> Result<Vec<f32>, RenderError> {
    time_stretch_with_config(samples, tempo_ratio, &StretchConfig::default())
}

/// Stretch audio in time with a custom phase vocoder configuration
pub fn time_stretch_with_config(
    samples: &[f32],
    tempo_ratio: f32,
    config: &StretchConfig,
) -> Result<Vec<f32>, RenderError> {
    if !tempo_ratio.is_finite() || tempo_ratio <= 0.0 {
        return Err(RenderError::InvalidParameter(format!(
            "tempo ratio must be positive, got {}",
            tempo_ratio
        )));
    }

    if (tempo_ratio - 1.0).abs() < IDENTITY_EPSILON || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let n = config.window_size;
    let synthesis_hop = config.synthesis_hop.max(1);
    let analysis_hop = ((synthesis_hop as f32 * tempo_ratio).round() as usize).max(1);
    let output_len = (samples.len() as f32 / tempo_ratio).round() as usize;

    let window = hann_window(n);
    let bins = n / 2 + 1;

    let mut planner = RealFftPlanner::<f32>::new();
    let forward = planner.plan_fft_forward(n);
    let inverse = planner.plan_fft_inverse(n);

    let mut frame = forward.make_input_vec();
    let mut spectrum = forward.make_output_vec();
    let mut resynth = inverse.make_output_vec();

    let mut previous_phase = vec![0.0f32; bins];
    let mut synthesis_phase = vec![0.0f32; bins];

    let frame_count = samples.len() / analysis_hop + 1;
    let buffer_len = frame_count * synthesis_hop + n;
    let mut output = vec![0.0f32; buffer_len];
    let mut window_sum = vec![0.0f32; buffer_len];

    for frame_idx in 0..frame_count {
        let read_pos = frame_idx * analysis_hop;

        // Windowed analysis frame, zero-padded past the end of the input
        for (i, slot) in frame.iter_mut().enumerate() {
            let sample = samples.get(read_pos + i).copied().unwrap_or(0.0);
            *slot = sample * window[i];
        }

        forward
            .process(&mut frame, &mut spectrum)
            .map_err(|e| RenderError::Fft(e.to_string()))?;

        for k in 0..bins {
            let magnitude = spectrum[k].norm();
            let phase = spectrum[k].arg();

            if frame_idx == 0 {
                synthesis_phase[k] = phase;
            } else {
                let bin_freq = 2.0 * PI * k as f32 / n as f32;
                let expected = bin_freq * analysis_hop as f32;
                let deviation = wrap_phase(phase - previous_phase[k] - expected);
                let true_freq = bin_freq + deviation / analysis_hop as f32;
                synthesis_phase[k] = wrap_phase(synthesis_phase[k] + true_freq * synthesis_hop as f32);
            }
            previous_phase[k] = phase;

            spectrum[k] = Complex::from_polar(magnitude, synthesis_phase[k]);
        }

        // DC and Nyquist must be purely real for the inverse transform
        spectrum[0].im = 0.0;
        spectrum[bins - 1].im = 0.0;

        inverse
            .process(&mut spectrum, &mut resynth)
            .map_err(|e| RenderError::Fft(e.to_string()))?;

        let write_pos = frame_idx * synthesis_hop;
        for i in 0..n {
            // realfft leaves the inverse unnormalized
            output[write_pos + i] += resynth[i] / n as f32 * window[i];
            window_sum[write_pos + i] += window[i] * window[i];
        }
    }

    for (sample, weight) in output.iter_mut().zip(window_sum.iter()) {
        if *weight > 1e-6 {
            *sample /= weight;
        }
    }

    output.resize(output_len, 0.0);
    Ok(output)
}

/// Hann window of size n (periodic form, suited to overlap-add)
pub fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / n as f32).cos())
        .collect()
}

/// Wrap a phase value into [-PI, PI]
fn wrap_phase(phase: f32) -> f32 {
    phase - 2.0 * PI * ((phase + PI) / (2.0 * PI)).floor()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin() * 0.5)
            .collect()
    }

    /// Count sign changes as a cheap pitch proxy
    fn zero_crossings(samples: &[f32]) -> usize {
        samples
            .windows(2)
            .filter(|w| (w[0] < 0.0) != (w[1] < 0.0))
            .count()
    }

    #[test]
    fn test_identity_ratio_returns_input() {
        let input = sine(440.0, 44100, 4096);
        let output = time_stretch(&input, 1.0).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_rejects_invalid_ratio() {
        assert!(time_stretch(&[0.0; 16], 0.0).is_err());
        assert!(time_stretch(&[0.0; 16], -1.2).is_err());
        assert!(time_stretch(&[0.0; 16], f32::NAN).is_err());
    }

    #[test]
    fn test_output_length_follows_ratio() {
        let input = sine(440.0, 44100, 44100);

        let faster = time_stretch(&input, 2.0).unwrap();
        assert_eq!(faster.len(), 22050);

        let slower = time_stretch(&input, 0.8).unwrap();
        assert_eq!(slower.len(), 55125);
    }

    #[test]
    fn test_pitch_preserved_when_slowing_down() {
        let sample_rate = 44100;
        let input = sine(440.0, sample_rate, sample_rate as usize);
        let output = time_stretch(&input, 0.5).unwrap();

        // Compare crossing density away from the edges
        let input_rate = zero_crossings(&input[4096..40000]) as f32 / (40000 - 4096) as f32;
        let output_rate = zero_crossings(&output[4096..80000]) as f32 / (80000 - 4096) as f32;
        assert!(
            (input_rate - output_rate).abs() / input_rate < 0.05,
            "crossing rate drifted: {} vs {}",
            input_rate,
            output_rate
        );
    }

    #[test]
    fn test_short_input_is_handled() {
        let output = time_stretch(&[0.1, -0.1, 0.2], 1.5).unwrap();
        assert_eq!(output.len(), 2);
        assert!(output.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_wrap_phase_range() {
        for &p in &[0.0, 3.5, -3.5, 10.0, -10.0, PI] {
            let wrapped = wrap_phase(p);
            assert!(wrapped >= -PI - 1e-5 && wrapped <= PI + 1e-5);
        }
    }
}
