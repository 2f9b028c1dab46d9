//! Runtime configuration.
//!
//! Loaded from (later sources override earlier):
//! 1. Default values
//! 2. TOML file (`--config`, or `<config_dir>/freiarbeitd/config.toml`)
//! 3. Environment variables prefixed with `FREIARBEITD_`, `__` between
//!    section and key (`FREIARBEITD_SEARCH__PAGE_SIZE=30`)

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = "freiarbeitd";
const ENV_PREFIX: &str = "FREIARBEITD_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(Box<figment::Error>),

    #[error("invalid configuration: {message}")]
    Validation { message: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub search: SearchConfig,
    pub sessions: SessionsConfig,
    pub import: ImportConfig,
    pub courses: CoursesConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Workspace opened at start-up. Without one the client must call
    /// `workspace.select` first.
    pub workspace: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum number of hits returned by a person search.
    pub page_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Number of today's entries listed under a session form.
    pub recent_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Prefix length, in bytes, used to detect the CSV delimiter.
    pub sniff_bytes: usize,
    /// Group for imported rows with a blank group column.
    pub default_group: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoursesConfig {
    /// Note stored on every absent record; blank stores none.
    pub absent_note: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { page_size: 20 }
    }
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self { recent_limit: 40 }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            sniff_bytes: 1024,
            default_group: "Ohne Lerngruppe".to_string(),
        }
    }
}

impl Default for CoursesConfig {
    fn default() -> Self {
        Self {
            absent_note: "nicht da".to_string(),
        }
    }
}

impl Config {
    /// Load configuration with an optional explicit file path.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_file = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.page_size == 0 {
            return Err(ConfigError::Validation {
                message: "search.page_size must be greater than 0".to_string(),
            });
        }
        if self.sessions.recent_limit == 0 {
            return Err(ConfigError::Validation {
                message: "sessions.recent_limit must be greater than 0".to_string(),
            });
        }
        if self.import.sniff_bytes == 0 {
            return Err(ConfigError::Validation {
                message: "import.sniff_bytes must be greater than 0".to_string(),
            });
        }
        if self.import.default_group.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "import.default_group must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
