// Survey configuration
// TOML file with a default for every field, plus environment overrides for the remote sheet

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::dataset::{DatasetLayout, StemFolders};
use crate::trial::ResponseMode;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "melopref.toml";

pub const ENV_SHEET_ENDPOINT: &str = "MELOPREF_SHEET_ENDPOINT";
pub const ENV_SHEET_TOKEN: &str = "MELOPREF_SHEET_TOKEN";
pub const ENV_SHEET_TOKEN_B64: &str = "MELOPREF_SHEET_TOKEN_B64";

/// Upper bound for `server.session_ttl_secs` (30 days)
pub const MAX_SESSION_TTL_SECS: u64 = 30 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("MELOPREF_SHEET_TOKEN_B64 is not valid base64: {0}")]
    TokenDecode(#[from] base64::DecodeError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyConfig {
    pub server: ServerConfig,
    pub dataset: DatasetConfig,
    pub design: DesignConfig,
    pub transforms: TransformConfig,
    pub storage: StorageConfig,
    pub remote: RemoteConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, e.g. "127.0.0.1:8501"
    pub bind: String,
    /// Heading shown on every page
    pub title: String,
    /// Sessions older than this are dropped along with their pending clips
    pub session_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8501".to_string(),
            title: "Music preference survey".to_string(),
            session_ttl_secs: 2 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub root: PathBuf,
    pub layout: DatasetLayout,
    pub folders: StemFolders,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("dataset"),
            layout: DatasetLayout::default(),
            folders: StemFolders::default(),
        }
    }
}

/// Experimental design
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignConfig {
    pub trials_per_participant: u32,
    /// Clips offered per trial (1..=3)
    pub stimuli_per_trial: usize,
    pub response: ResponseMode,
    /// Show tempo/pitch/EQ values next to each player
    pub show_parameters: bool,
}

impl Default for DesignConfig {
    fn default() -> Self {
        Self {
            trials_per_participant: 10,
            stimuli_per_trial: 2,
            response: ResponseMode::Rank,
            show_parameters: true,
        }
    }
}

/// Option lists the per-stimulus parameters are drawn from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub enable_tempo: bool,
    pub tempo_ratios: Vec<f32>,

    pub enable_pitch: bool,
    pub semitones: Vec<i32>,

    pub enable_eq: bool,
    /// Gains drawn independently for each band
    pub eq_gains_db: Vec<f32>,

    pub prices: Vec<u32>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            enable_tempo: true,
            tempo_ratios: vec![0.8, 1.2, 2.0],
            enable_pitch: true,
            semitones: vec![-3, -2, -1, 0, 1, 2, 3],
            enable_eq: false,
            eq_gains_db: vec![-6.0, 0.0, 6.0],
            prices: vec![25, 50, 100],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Ledger and rendered clips; the platform data directory when unset
    pub data_dir: Option<PathBuf>,
    pub spreadsheet: String,
    pub participants_worksheet: String,
    pub responses_worksheet: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            spreadsheet: "research".to_string(),
            participants_worksheet: "participants".to_string(),
            responses_worksheet: "responses".to_string(),
        }
    }
}

/// Remote spreadsheet relay; rows stay in the local ledger when `endpoint` is unset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub endpoint: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            timeout_secs: 10,
        }
    }
}

impl SurveyConfig {
    /// Load from `path`, or `melopref.toml` in the working directory, or defaults
    ///
    /// Environment overrides are applied and the result validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                local.is_file().then_some(local)
            }
        };

        let mut config = match &path {
            Some(path) => {
                log::info!("Loading config from {}", path.display());
                Self::from_file(path)?
            }
            None => {
                log::info!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply remote endpoint and token overrides from `lookup` (the environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENV_SHEET_ENDPOINT).filter(|v| !v.is_empty()) {
            self.remote.endpoint = Some(endpoint);
        }

        if let Some(token) = lookup(ENV_SHEET_TOKEN).filter(|v| !v.is_empty()) {
            self.remote.token = Some(token);
        } else if let Some(encoded) = lookup(ENV_SHEET_TOKEN_B64).filter(|v| !v.is_empty()) {
            let decoded = base64::engine::general_purpose::STANDARD.decode(encoded.trim())?;
            let token = String::from_utf8_lossy(&decoded).trim().to_string();
            self.remote.token = Some(token);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.server.bind.parse::<SocketAddr>().is_err() {
            return invalid(format!("server.bind is not a socket address: {}", self.server.bind));
        }
        if !(1..=MAX_SESSION_TTL_SECS).contains(&self.server.session_ttl_secs) {
            return invalid(format!(
                "server.session_ttl_secs must be between 1 and {}, got {}",
                MAX_SESSION_TTL_SECS, self.server.session_ttl_secs
            ));
        }

        let design = &self.design;
        if design.trials_per_participant == 0 {
            return invalid("design.trials_per_participant must be at least 1".to_string());
        }
        if !(1..=3).contains(&design.stimuli_per_trial) {
            return invalid(format!(
                "design.stimuli_per_trial must be 1, 2 or 3, got {}",
                design.stimuli_per_trial
            ));
        }
        if design.response == ResponseMode::Choice && design.stimuli_per_trial < 2 {
            return invalid("choice mode needs at least 2 stimuli per trial".to_string());
        }

        let transforms = &self.transforms;
        if transforms.enable_tempo {
            if transforms.tempo_ratios.is_empty() {
                return invalid("transforms.tempo_ratios must not be empty".to_string());
            }
            if let Some(bad) = transforms
                .tempo_ratios
                .iter()
                .find(|r| !r.is_finite() || **r <= 0.0)
            {
                return invalid(format!("tempo ratio must be positive, got {}", bad));
            }
        }
        if transforms.enable_pitch {
            if transforms.semitones.is_empty() {
                return invalid("transforms.semitones must not be empty".to_string());
            }
            if let Some(bad) = transforms.semitones.iter().find(|s| s.abs() > 24) {
                return invalid(format!("semitone shift out of range (+/-24): {}", bad));
            }
        }
        if transforms.enable_eq {
            if transforms.eq_gains_db.is_empty() {
                return invalid("transforms.eq_gains_db must not be empty".to_string());
            }
            if let Some(bad) = transforms.eq_gains_db.iter().find(|g| !g.is_finite()) {
                return invalid(format!("EQ gain must be finite, got {}", bad));
            }
        }
        if transforms.prices.is_empty() {
            return invalid("transforms.prices must not be empty".to_string());
        }

        if let Some(endpoint) = &self.remote.endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return invalid(format!("remote.endpoint must be an http(s) URL: {}", endpoint));
            }
        }
        if self.remote.timeout_secs == 0 {
            return invalid("remote.timeout_secs must be at least 1".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_example_config_parses() {
        let config = SurveyConfig::from_toml(include_str!("../melopref.toml")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.dataset.folders.drums, "ドラム");
        assert_eq!(config.design, DesignConfig::default());
        assert_eq!(config.transforms, TransformConfig::default());
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = SurveyConfig::default();
        config.validate().unwrap();
        assert_eq!(config.design.trials_per_participant, 10);
        assert_eq!(config.transforms.prices, vec![25, 50, 100]);
        assert!(config.remote.endpoint.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SurveyConfig::from_toml(
            r#"
            [dataset]
            root = "/data/songs"
            layout = "flat"

            [design]
            response = "choice"
            stimuli_per_trial = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.dataset.root, PathBuf::from("/data/songs"));
        assert_eq!(config.dataset.layout, DatasetLayout::Flat);
        assert_eq!(config.dataset.folders, StemFolders::default());
        assert_eq!(config.design.response, ResponseMode::Choice);
        assert_eq!(config.design.trials_per_participant, 10);
        config.validate().unwrap();
    }

    #[test]
    fn test_custom_stem_folders() {
        let config = SurveyConfig::from_toml(
            r#"
            [dataset.folders]
            bass = "ベース"
            drums = "ドラム"
            "#,
        )
        .unwrap();
        assert_eq!(config.dataset.folders.bass, "ベース");
        assert_eq!(config.dataset.folders.chord, "chord");
        assert_eq!(config.dataset.folders.drums, "ドラム");
    }

    #[test]
    fn test_validation_rejects_bad_designs() {
        let mut config = SurveyConfig::default();
        config.design.stimuli_per_trial = 4;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = SurveyConfig::default();
        config.design.response = ResponseMode::Choice;
        config.design.stimuli_per_trial = 1;
        assert!(config.validate().is_err());

        let mut config = SurveyConfig::default();
        config.transforms.tempo_ratios = vec![1.0, 0.0];
        assert!(config.validate().is_err());

        let mut config = SurveyConfig::default();
        config.transforms.prices.clear();
        assert!(config.validate().is_err());

        let mut config = SurveyConfig::default();
        config.server.bind = "not an address".to_string();
        assert!(config.validate().is_err());

        let mut config = SurveyConfig::default();
        config.server.session_ttl_secs = 0;
        assert!(config.validate().is_err());
        config.server.session_ttl_secs = MAX_SESSION_TTL_SECS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_disabled_effect_skips_its_list() {
        let mut config = SurveyConfig::default();
        config.transforms.enable_tempo = false;
        config.transforms.tempo_ratios.clear();
        config.validate().unwrap();
    }

    #[test]
    fn test_env_overrides() {
        let mut config = SurveyConfig::default();
        config
            .apply_overrides(env(&[
                (ENV_SHEET_ENDPOINT, "https://sheets.example/exec"),
                (ENV_SHEET_TOKEN_B64, "c2VjcmV0LXRva2VuCg=="),
            ]))
            .unwrap();

        assert_eq!(config.remote.endpoint.as_deref(), Some("https://sheets.example/exec"));
        assert_eq!(config.remote.token.as_deref(), Some("secret-token"));
    }

    #[test]
    fn test_plain_token_wins_over_base64() {
        let mut config = SurveyConfig::default();
        config
            .apply_overrides(env(&[
                (ENV_SHEET_TOKEN, "plain"),
                (ENV_SHEET_TOKEN_B64, "!!! not base64"),
            ]))
            .unwrap();
        assert_eq!(config.remote.token.as_deref(), Some("plain"));
    }

    #[test]
    fn test_bad_base64_token() {
        let mut config = SurveyConfig::default();
        let result = config.apply_overrides(env(&[(ENV_SHEET_TOKEN_B64, "!!!")]));
        assert!(matches!(result, Err(ConfigError::TokenDecode(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("survey.toml");
        std::fs::write(&path, "[design]\ntrials_per_participant = 3\n").unwrap();

        let config = SurveyConfig::from_file(&path).unwrap();
        assert_eq!(config.design.trials_per_participant, 3);

        let missing = SurveyConfig::from_file(&dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
