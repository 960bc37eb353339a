// Stem Mixing and Stimulus Rendering
// Combines stems into one mix, then runs the transform chain over it

use std::path::Path;

use super::effects::{equalize, peak_normalize, pitch_shift};
use super::params::TransformParams;
use super::resample::resample_rate;
use super::stretch::time_stretch;
use super::RenderError;
use crate::audio::{encode_wav, load_wav, Waveform};

/// A rendered stimulus ready to be served
#[derive(Debug, Clone)]
pub struct RenderedClip {
    pub waveform: Waveform,
    /// 16-bit PCM WAV encoding of `waveform`
    pub wav_bytes: Vec<u8>,
}

/// Sum stems into one peak-normalized mix
///
/// Every stem is brought to the first stem's sample rate and all of them are
/// cut to the shortest length before summing.
pub fn mix_stems(stems: &[Waveform]) -> Result<Waveform, RenderError> {
    let first = stems.first().ok_or(RenderError::NoStems)?;
    let sample_rate = first.sample_rate;

    let mut aligned: Vec<Vec<f32>> = Vec::with_capacity(stems.len());
    for stem in stems {
        if stem.sample_rate == sample_rate {
            aligned.push(stem.samples.clone());
        } else {
            log::info!(
                "Stem at {} Hz differs from mix rate {} Hz, resampling",
                stem.sample_rate,
                sample_rate
            );
            aligned.push(resample_rate(&stem.samples, stem.sample_rate, sample_rate)?);
        }
    }

    let min_len = aligned.iter().map(Vec::len).min().unwrap_or(0);
    let mut mix = vec![0.0f32; min_len];
    for stem in &aligned {
        for (acc, sample) in mix.iter_mut().zip(stem.iter()) {
            *acc += sample;
        }
    }

    peak_normalize(&mut mix);
    Ok(Waveform::new(mix, sample_rate))
}

/// Run tempo, pitch and EQ over a waveform, then peak-normalize
///
/// Effects at their identity values are skipped.
pub fn apply_transforms(waveform: Waveform, params: &TransformParams) -> Result<Waveform, RenderError> {
    let sample_rate = waveform.sample_rate;
    let mut samples = waveform.samples;

    if params.tempo_ratio != 1.0 {
        samples = time_stretch(&samples, params.tempo_ratio)?;
    }
    if params.semitones != 0 {
        samples = pitch_shift(&samples, sample_rate, params.semitones)?;
    }
    if !params.eq.is_flat() {
        samples = equalize(&samples, sample_rate, &params.eq)?;
    }

    peak_normalize(&mut samples);
    Ok(Waveform::new(samples, sample_rate))
}

/// Load the stems at `paths`, mix them and apply `params`
pub fn render_clip<P: AsRef<Path>>(paths: &[P], params: &TransformParams) -> Result<RenderedClip, RenderError> {
    let stems = paths
        .iter()
        .map(|path| load_wav(path.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    let mix = mix_stems(&stems)?;
    let waveform = apply_transforms(mix, params)?;
    let wav_bytes = encode_wav(&waveform)?;

    log::info!(
        "Rendered {} stem(s): tempo x{}, {:+} st, eq {:+}/{:+}/{:+} dB, {:.2}s",
        paths.len(),
        params.tempo_ratio,
        params.semitones,
        params.eq.low_db,
        params.eq.mid_db,
        params.eq.high_db,
        waveform.duration_secs()
    );

    Ok(RenderedClip {
        waveform,
        wav_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::params::EqGains;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_tone(dir: &Path, name: &str, freq: f32, sample_rate: u32, len: usize, amp: f32) -> PathBuf {
        let path = dir.join(name);
        let samples: Vec<f32> = (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin() * amp)
            .collect();
        std::fs::write(&path, encode_wav(&Waveform::new(samples, sample_rate)).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_mix_truncates_to_shortest_and_normalizes() {
        let a = Waveform::new(vec![0.25, 0.25, 0.25, 0.25], 44100);
        let b = Waveform::new(vec![0.25, -0.5], 44100);

        let mix = mix_stems(&[a, b]).unwrap();
        assert_eq!(mix.len(), 2);
        assert_eq!(mix.samples, vec![1.0, -0.5]);
        assert_eq!(mix.peak(), 1.0);
    }

    #[test]
    fn test_mix_requires_stems() {
        assert!(matches!(mix_stems(&[]), Err(RenderError::NoStems)));
    }

    #[test]
    fn test_mix_resamples_to_first_rate() {
        let a = Waveform::new(vec![0.1; 4410], 44100);
        let b = Waveform::new(vec![0.1; 2205], 22050);

        let mix = mix_stems(&[a, b]).unwrap();
        assert_eq!(mix.sample_rate, 44100);
        assert_eq!(mix.len(), 4410);
    }

    #[test]
    fn test_apply_transforms_identity_only_normalizes() {
        let waveform = Waveform::new(vec![0.1, -0.2, 0.05], 44100);
        let out = apply_transforms(waveform, &TransformParams::default()).unwrap();
        assert_eq!(out.samples, vec![0.5, -1.0, 0.25]);
    }

    #[test]
    fn test_render_clip_from_files() {
        let dir = TempDir::new().unwrap();
        let bass = write_tone(dir.path(), "bass.wav", 110.0, 22050, 22050, 0.3);
        let melody = write_tone(dir.path(), "melody.wav", 660.0, 22050, 11025, 0.3);

        let params = TransformParams {
            tempo_ratio: 1.25,
            semitones: 2,
            eq: EqGains::new(3.0, 0.0, -3.0),
        };
        let clip = render_clip(&[bass, melody], &params).unwrap();

        // Shortest stem is half a second; 1.25x tempo shortens it to 0.4s
        assert_eq!(clip.waveform.len(), 8820);
        assert!((clip.waveform.peak() - 1.0).abs() < 1e-6);
        assert_eq!(&clip.wav_bytes[0..4], b"RIFF");
    }

    #[test]
    fn test_render_clip_missing_file() {
        let result = render_clip(&[PathBuf::from("/nonexistent/stem.wav")], &TransformParams::default());
        assert!(matches!(result, Err(RenderError::Audio(_))));
    }
}
