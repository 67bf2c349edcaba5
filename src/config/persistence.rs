use crate::config::preferences::Preferences;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const PREFERENCES_FILE: &str = "preferences.toml";

#[derive(Error, Debug)]
pub enum PreferencesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone)]
pub struct PreferencesStoreConfig {
    pub config_dir: PathBuf,
}

impl Default for PreferencesStoreConfig {
    fn default() -> Self {
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let config_dir = home_dir.join(".config").join("centre");

        Self { config_dir }
    }
}

/// Reads and writes `preferences.toml`
#[derive(Debug, Clone)]
pub struct PreferencesStore {
    config: PreferencesStoreConfig,
}

impl PreferencesStore {
    pub fn new(config: PreferencesStoreConfig) -> Self {
        Self { config }
    }

    /// Store rooted at an explicit directory
    pub fn at(config_dir: impl Into<PathBuf>) -> Self {
        Self::new(PreferencesStoreConfig {
            config_dir: config_dir.into(),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.config.config_dir.join(PREFERENCES_FILE)
    }

    /// Load preferences, falling back to defaults when the file is absent
    pub fn load(&self) -> Result<Preferences, PreferencesError> {
        let file_path = self.path();

        if !file_path.exists() {
            debug!(path = %file_path.display(), "No preferences file, using defaults");
            return Ok(Preferences::default());
        }

        let content = fs::read_to_string(&file_path)?;
        let preferences: Preferences = toml::from_str(&content)?;
        Ok(preferences)
    }

    pub fn save(&self, preferences: &Preferences) -> Result<(), PreferencesError> {
        if !self.config.config_dir.exists() {
            fs::create_dir_all(&self.config.config_dir)?;
        }

        let file_path = self.path();
        let content = toml::to_string_pretty(preferences)?;
        write_atomically(&file_path, &content)?;

        info!(path = %file_path.display(), "Preferences saved");
        Ok(())
    }
}

impl Default for PreferencesStore {
    fn default() -> Self {
        Self::new(PreferencesStoreConfig::default())
    }
}

pub(crate) fn write_atomically(path: &Path, content: &str) -> std::io::Result<()> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content)?;
    fs::rename(temp_path, path)
}
