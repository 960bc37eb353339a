// File system operations for the data directory and rendered clips
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to get app data directory")]
    NoAppDataDir,
    #[error("Invalid clip file name: {0}")]
    InvalidClipName(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Resolve the data directory, creating it if needed
///
/// Falls back to `<platform data dir>/melopref` when nothing is configured.
pub fn resolve_data_dir(configured: Option<&Path>) -> StorageResult<PathBuf> {
    let dir = match configured {
        Some(dir) => dir.to_path_buf(),
        None => dirs::data_dir()
            .ok_or(StorageError::NoAppDataDir)?
            .join("melopref"),
    };
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Directory of rendered stimulus clips, served under `/clips`
#[derive(Debug, Clone)]
pub struct ClipStore {
    dir: PathBuf,
}

impl ClipStore {
    pub fn new(dir: PathBuf) -> StorageResult<Self> {
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a clip and return its file name
    ///
    /// Names combine a random id with the content hash, so identical clips in
    /// different sessions never share a file.
    pub fn store(&self, wav_bytes: &[u8]) -> StorageResult<String> {
        let hash = calculate_sha256(wav_bytes);
        let file_name = format!("{}-{}.wav", Uuid::new_v4().simple(), &hash[..16]);

        let mut file = fs::File::create(self.dir.join(&file_name))?;
        file.write_all(wav_bytes)?;

        log::debug!("Stored clip {} ({} bytes)", file_name, wav_bytes.len());
        Ok(file_name)
    }

    pub fn path(&self, file_name: &str) -> StorageResult<PathBuf> {
        if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name.starts_with('.') {
            return Err(StorageError::InvalidClipName(file_name.to_string()));
        }
        Ok(self.dir.join(file_name))
    }

    /// Delete a clip; a clip that is already gone is not an error
    pub fn discard(&self, file_name: &str) -> StorageResult<()> {
        match fs::remove_file(self.path(file_name)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every clip in the directory; sessions do not survive a restart
    pub fn purge(&self) -> StorageResult<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "wav") {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        if removed > 0 {
            log::info!("Purged {} leftover clip(s) from {}", removed, self.dir.display());
        }
        Ok(removed)
    }
}

/// Calculate SHA256 hash of data
pub fn calculate_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
