// Random stimulus selection
// Draws the sources for one trial so that no two stimuli are the same

use rand::seq::SliceRandom;
use rand::Rng;
use std::path::PathBuf;

use super::scan::{DatasetIndex, Song};
use super::{DatasetError, StimulusSource};

/// Redraws allowed per stimulus when songs must repeat within a trial
const MAX_REDRAWS: usize = 32;

/// Pick `count` distinct stimulus sources from the index
pub fn pick_sources<R: Rng + ?Sized>(
    index: &DatasetIndex,
    count: usize,
    rng: &mut R,
) -> Result<Vec<StimulusSource>, DatasetError> {
    match index {
        DatasetIndex::Flat { files } => {
            if files.len() < count {
                return Err(DatasetError::NotEnoughFiles {
                    needed: count,
                    found: files.len(),
                });
            }
            Ok(files
                .choose_multiple(rng, count)
                .map(|path| StimulusSource::File { path: path.clone() })
                .collect())
        }
        DatasetIndex::Stems { songs, drums } => {
            if songs.len() >= count {
                let chosen: Vec<&Song> = songs.choose_multiple(rng, count).collect();
                chosen
                    .into_iter()
                    .map(|song| pick_from_song(song, drums, rng))
                    .collect()
            } else {
                pick_with_redraws(songs, drums, count, rng)
            }
        }
    }
}

/// Fewer songs than stimuli: redraw until the stem combinations differ
fn pick_with_redraws<R: Rng + ?Sized>(
    songs: &[Song],
    drums: &[PathBuf],
    count: usize,
    rng: &mut R,
) -> Result<Vec<StimulusSource>, DatasetError> {
    let mut picked: Vec<StimulusSource> = Vec::with_capacity(count);

    while picked.len() < count {
        let mut candidate = pick_from_song(random_song(songs, rng)?, drums, rng)?;
        let mut redraws = 0;
        while picked.contains(&candidate) && redraws < MAX_REDRAWS {
            candidate = pick_from_song(random_song(songs, rng)?, drums, rng)?;
            redraws += 1;
        }
        if picked.contains(&candidate) {
            log::warn!(
                "Dataset too small for {} distinct stimuli, repeating {}",
                count,
                candidate.describe()
            );
        }
        picked.push(candidate);
    }

    Ok(picked)
}

fn random_song<'a, R: Rng + ?Sized>(songs: &'a [Song], rng: &mut R) -> Result<&'a Song, DatasetError> {
    songs
        .choose(rng)
        .ok_or_else(|| DatasetError::NoSongs("dataset index".to_string()))
}

fn pick_from_song<R: Rng + ?Sized>(
    song: &Song,
    drums: &[PathBuf],
    rng: &mut R,
) -> Result<StimulusSource, DatasetError> {
    let key = song
        .keys
        .choose(rng)
        .ok_or_else(|| DatasetError::NoKeyVariants(song.name.clone()))?;

    let pick = |files: &[PathBuf], rng: &mut R, what: &str| {
        files
            .choose(rng)
            .cloned()
            .ok_or_else(|| DatasetError::NoWavFiles(format!("{}/{}/{}", song.name, key.name, what)))
    };

    Ok(StimulusSource::Stems {
        song: song.name.clone(),
        key: key.name.clone(),
        bass: pick(key.bass.as_slice(), &mut *rng, "bass")?,
        chord: pick(key.chord.as_slice(), &mut *rng, "chord")?,
        melody: pick(key.melody.as_slice(), &mut *rng, "melody")?,
        drum: pick(drums, &mut *rng, "drums")?,
    })
}
