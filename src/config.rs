//! Provider configuration: base URL, API key, default model.
//!
//! Settings load from `config.toml` under the platform config directory and
//! can be overridden per-process with `CAUSERIE_*` environment variables.
//! A missing file is not an error; defaults apply.

use std::env;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;

/// Default endpoint when no configuration is present.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Errors that can occur when loading configuration from disk.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the configuration file as valid TOML.
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "Failed to read config at {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(
                    f,
                    "Failed to parse config at {}: {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

/// Provider settings consumed by [`crate::client::ChatClient`].
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: None,
        }
    }
}

impl Config {
    /// Loads configuration from the platform config directory, then applies
    /// environment overrides. A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match config_path() {
            Some(path) if path.exists() => Self::load_from_path(&path)?,
            _ => Config::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from an explicit file path.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var("CAUSERIE_BASE_URL") {
            if !value.is_empty() {
                self.base_url = value;
            }
        }
        if let Ok(value) = env::var("CAUSERIE_API_KEY") {
            if !value.is_empty() {
                self.api_key = Some(value);
            }
        }
        if let Ok(value) = env::var("CAUSERIE_MODEL") {
            if !value.is_empty() {
                self.model = Some(value);
            }
        }
    }
}

fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "permacommons", "causerie")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
