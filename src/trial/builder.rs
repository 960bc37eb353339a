// Trial assembly
// Rescans the dataset, draws sources and parameters, renders and stores each clip
use chrono::Utc;
use rand::Rng;

use super::models::{Stimulus, Trial};
use super::params::{draw_params, draw_price};
use super::TrialError;
use crate::config::SurveyConfig;
use crate::dataset::{pick_sources, scan_dataset};
use crate::render::render_clip;
use crate::state::ClipStore;

/// Build trial `number`, rendering every stimulus into `clips`
///
/// Clips already written are removed again if a later stimulus fails.
pub fn build_trial<R: Rng + ?Sized>(
    config: &SurveyConfig,
    number: u32,
    clips: &ClipStore,
    rng: &mut R,
) -> Result<Trial, TrialError> {
    let dataset = &config.dataset;
    let index = scan_dataset(&dataset.root, dataset.layout, &dataset.folders)?;
    let sources = pick_sources(&index, config.design.stimuli_per_trial, rng)?;

    let mut stimuli: Vec<Stimulus> = Vec::with_capacity(sources.len());
    for source in sources {
        let params = draw_params(&config.transforms, rng);
        let price = draw_price(&config.transforms, rng);

        let stored = render_clip(&source.paths(), &params)
            .map_err(TrialError::from)
            .and_then(|clip| clips.store(&clip.wav_bytes).map_err(TrialError::from));

        match stored {
            Ok(clip_file) => stimuli.push(Stimulus {
                source,
                params,
                price,
                clip_file,
            }),
            Err(e) => {
                log::error!("Failed to render {}: {}", source.describe(), e);
                discard_clips(clips, &stimuli);
                return Err(e);
            }
        }
    }

    log::info!(
        "Built trial {} with {} stimuli ({})",
        number,
        stimuli.len(),
        index.summary()
    );

    Ok(Trial {
        number,
        stimuli,
        created_at: Utc::now(),
    })
}

/// Remove the rendered clips of `stimuli`, logging failures
pub fn discard_clips(clips: &ClipStore, stimuli: &[Stimulus]) {
    for stimulus in stimuli {
        if let Err(e) = clips.discard(&stimulus.clip_file) {
            log::warn!("Failed to discard clip {}: {}", stimulus.clip_file, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{encode_wav, Waveform};
    use crate::dataset::DatasetLayout;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_tone(path: &Path, freq: f32) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let samples: Vec<f32> = (0..8820)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / 22050.0).sin() * 0.4)
            .collect();
        std::fs::write(path, encode_wav(&Waveform::new(samples, 22050)).unwrap()).unwrap();
    }

    fn stem_dataset(root: &Path) {
        for (song, base) in [("song_a", 110.0), ("song_b", 130.0)] {
            let key_dir = root.join(song).join("major");
            write_tone(&key_dir.join("bass").join("b1.wav"), base);
            write_tone(&key_dir.join("chord").join("c1.wav"), base * 2.0);
            write_tone(&key_dir.join("melody").join("m1.wav"), base * 4.0);
        }
        write_tone(&root.join("drums").join("d1.wav"), 60.0);
    }

    #[test]
    fn test_build_trial_renders_every_stimulus() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("dataset");
        stem_dataset(&root);

        let mut config = SurveyConfig::default();
        config.dataset.root = root;
        let clips = ClipStore::new(dir.path().join("clips")).unwrap();

        let trial = build_trial(&config, 1, &clips, &mut StdRng::seed_from_u64(4)).unwrap();

        assert_eq!(trial.number, 1);
        assert_eq!(trial.stimuli.len(), 2);
        assert_ne!(trial.stimuli[0].source.song(), trial.stimuli[1].source.song());
        for stimulus in &trial.stimuli {
            assert!(config.transforms.prices.contains(&stimulus.price));
            assert!(clips.path(&stimulus.clip_file).unwrap().is_file());
        }

        discard_clips(&clips, &trial.stimuli);
        for stimulus in &trial.stimuli {
            assert!(!clips.path(&stimulus.clip_file).unwrap().exists());
        }
    }

    #[test]
    fn test_build_trial_reports_dataset_errors() {
        let dir = TempDir::new().unwrap();
        let mut config = SurveyConfig::default();
        config.dataset.root = dir.path().join("missing");
        config.dataset.layout = DatasetLayout::Flat;
        let clips = ClipStore::new(dir.path().join("clips")).unwrap();

        let result = build_trial(&config, 1, &clips, &mut StdRng::seed_from_u64(1));
        assert!(matches!(result, Err(TrialError::Dataset(_))));
    }

    #[test]
    fn test_failed_render_leaves_no_clips() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("flat");
        write_tone(&root.join("good.wav"), 220.0);
        std::fs::write(root.join("broken.wav"), b"not a wav file").unwrap();

        let mut config = SurveyConfig::default();
        config.dataset.root = root;
        config.dataset.layout = DatasetLayout::Flat;
        let clips = ClipStore::new(dir.path().join("clips")).unwrap();

        let result = build_trial(&config, 1, &clips, &mut StdRng::seed_from_u64(8));
        assert!(matches!(result, Err(TrialError::Render(_))));
        assert_eq!(std::fs::read_dir(clips.dir()).unwrap().count(), 0);
    }
}
