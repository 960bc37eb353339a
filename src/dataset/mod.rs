// Dataset Module - Candidate audio discovery and random selection
// Supports a flat folder of full mixes and a song/key/stem tree with a shared drum pool

pub mod picker;
pub mod scan;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use picker::pick_sources;
pub use scan::{scan_dataset, DatasetIndex, KeyVariant, Song};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Dataset folder does not exist: {0}")]
    MissingFolder(String),

    #[error("No WAV files in folder: {0}")]
    NoWavFiles(String),

    #[error("No song folders in dataset: {0}")]
    NoSongs(String),

    #[error("Song {0} has no key-variant folders")]
    NoKeyVariants(String),

    #[error("Need {needed} distinct files per trial but only {found} are available")]
    NotEnoughFiles { needed: usize, found: usize },

    #[error("Failed to list {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// How the dataset directory is organized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetLayout {
    /// `<root>/*.wav`, one full mix per stimulus
    Flat,
    /// `<root>/<song>/<key>/<stem>/*.wav` plus `<root>/<drums>/*.wav`
    #[default]
    Stems,
}

/// Folder names used by the stem layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StemFolders {
    pub bass: String,
    pub chord: String,
    pub melody: String,
    pub drums: String,
}

impl Default for StemFolders {
    fn default() -> Self {
        Self {
            bass: "bass".to_string(),
            chord: "chord".to_string(),
            melody: "melody".to_string(),
            drums: "drums".to_string(),
        }
    }
}

/// Where one stimulus comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StimulusSource {
    File {
        path: PathBuf,
    },
    Stems {
        song: String,
        key: String,
        bass: PathBuf,
        chord: PathBuf,
        melody: PathBuf,
        drum: PathBuf,
    },
}

impl StimulusSource {
    /// Files to load and mix, in stem order
    pub fn paths(&self) -> Vec<&Path> {
        match self {
            StimulusSource::File { path } => vec![path.as_path()],
            StimulusSource::Stems {
                bass,
                chord,
                melody,
                drum,
                ..
            } => vec![bass.as_path(), chord.as_path(), melody.as_path(), drum.as_path()],
        }
    }

    pub fn song(&self) -> &str {
        match self {
            StimulusSource::File { .. } => "",
            StimulusSource::Stems { song, .. } => song,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            StimulusSource::File { .. } => "",
            StimulusSource::Stems { key, .. } => key,
        }
    }

    /// Short human-readable description for the trial page
    pub fn describe(&self) -> String {
        match self {
            StimulusSource::File { path } => file_name(path),
            StimulusSource::Stems {
                song,
                key,
                bass,
                chord,
                melody,
                drum,
            } => format!(
                "{} ({}): {} / {} / {} / {}",
                song,
                key,
                file_name(bass),
                file_name(chord),
                file_name(melody),
                file_name(drum)
            ),
        }
    }
}

/// Final path component as a string, empty if there is none
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
