// Dataset scanning
// Walks the dataset directory and indexes every candidate WAV file

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use super::{DatasetError, DatasetLayout, StemFolders};

/// One key variant (e.g. major/minor) of a song with its stem candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyVariant {
    pub name: String,
    pub bass: Vec<PathBuf>,
    pub chord: Vec<PathBuf>,
    pub melody: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    pub name: String,
    pub keys: Vec<KeyVariant>,
}

/// Every candidate the picker can draw from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetIndex {
    Flat { files: Vec<PathBuf> },
    Stems { songs: Vec<Song>, drums: Vec<PathBuf> },
}

impl DatasetIndex {
    /// One-line summary for logs and `melopref check`
    pub fn summary(&self) -> String {
        match self {
            DatasetIndex::Flat { files } => format!("{} full-mix file(s)", files.len()),
            DatasetIndex::Stems { songs, drums } => {
                let keys: usize = songs.iter().map(|song| song.keys.len()).sum();
                let stems: usize = songs
                    .iter()
                    .flat_map(|song| song.keys.iter())
                    .map(|key| key.bass.len() + key.chord.len() + key.melody.len())
                    .sum();
                format!(
                    "{} song(s), {} key variant(s), {} stem file(s), {} drum file(s)",
                    songs.len(),
                    keys,
                    stems,
                    drums.len()
                )
            }
        }
    }
}

/// Scan `root` according to `layout`
///
/// Any missing or empty folder the picker could land on is an error.
pub fn scan_dataset(
    root: &Path,
    layout: DatasetLayout,
    folders: &StemFolders,
) -> Result<DatasetIndex, DatasetError> {
    if !root.is_dir() {
        return Err(DatasetError::MissingFolder(root.display().to_string()));
    }

    match layout {
        DatasetLayout::Flat => {
            let files = list_wav_files(root)?;
            Ok(DatasetIndex::Flat { files })
        }
        DatasetLayout::Stems => scan_stems(root, folders),
    }
}

fn scan_stems(root: &Path, folders: &StemFolders) -> Result<DatasetIndex, DatasetError> {
    let drums = list_wav_files(&root.join(&folders.drums))?;

    let song_names = list_subdirs(root, &[folders.drums.as_str()])?;
    if song_names.is_empty() {
        return Err(DatasetError::NoSongs(root.display().to_string()));
    }

    let mut songs = Vec::with_capacity(song_names.len());
    for song_name in song_names {
        let song_dir = root.join(&song_name);
        let key_names = list_subdirs(&song_dir, &[])?;
        if key_names.is_empty() {
            return Err(DatasetError::NoKeyVariants(song_name));
        }

        let mut keys = Vec::with_capacity(key_names.len());
        for key_name in key_names {
            let key_dir = song_dir.join(&key_name);
            keys.push(KeyVariant {
                bass: list_wav_files(&key_dir.join(&folders.bass))?,
                chord: list_wav_files(&key_dir.join(&folders.chord))?,
                melody: list_wav_files(&key_dir.join(&folders.melody))?,
                name: key_name,
            });
        }

        songs.push(Song {
            name: song_name,
            keys,
        });
    }

    Ok(DatasetIndex::Stems { songs, drums })
}

/// Sorted `.wav` files (case-insensitive extension) directly inside `dir`
pub fn list_wav_files(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    if !dir.is_dir() {
        return Err(DatasetError::MissingFolder(dir.display().to_string()));
    }

    let files: Vec<PathBuf> = children(dir)?
        .into_iter()
        .filter(|entry| entry.file_type().is_file())
        .map(DirEntry::into_path)
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("wav"))
                .unwrap_or(false)
        })
        .collect();

    if files.is_empty() {
        return Err(DatasetError::NoWavFiles(dir.display().to_string()));
    }

    Ok(files)
}

/// Sorted names of the subdirectories of `dir`, minus `exclude`
fn list_subdirs(dir: &Path, exclude: &[&str]) -> Result<Vec<String>, DatasetError> {
    let names = children(dir)?
        .into_iter()
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| !exclude.contains(&name.as_str()))
        .collect();
    Ok(names)
}

// Immediate children of `dir` sorted by file name, symlinks resolved
fn children(dir: &Path) -> Result<Vec<DirEntry>, DatasetError> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| DatasetError::Io {
            path: dir.display().to_string(),
            source: e.into(),
        })
}
