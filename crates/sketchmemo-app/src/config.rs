//! Application configuration.
//!
//! Read from `config.toml` in the data directory (or an explicit path), then
//! overridden by `SKETCHMEMO_DATA_DIR` and `SKETCHMEMO_OWNER`.

use serde::{Deserialize, Serialize};
use sketchmemo_core::session::DEFAULT_STROKE_WIDTH;
use sketchmemo_core::storage::default_data_dir;
use sketchmemo_core::{OwnerId, StrokeColor};
use sketchmemo_render::MAX_PREVIEW_SIZE;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const ENV_DATA_DIR: &str = "SKETCHMEMO_DATA_DIR";
pub const ENV_OWNER: &str = "SKETCHMEMO_OWNER";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to write config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("{ENV_OWNER} is not a valid owner id: {0:?}")]
    InvalidOwner(String),
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("Could not determine data directory: {0}")]
    NoDataDir(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where records and blobs live. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,
    /// The logged-in user. Without one, every memo command is refused.
    pub owner_id: Option<OwnerId>,
    /// Base URL previews are served from; `file://` URLs otherwise.
    pub public_base_url: Option<String>,
    pub preview_width: u32,
    pub preview_height: u32,
    /// Maximum undo depth; unbounded when absent.
    pub history_limit: Option<usize>,
    pub default_color: StrokeColor,
    pub default_width: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            owner_id: None,
            public_base_url: None,
            preview_width: 320,
            preview_height: 160,
            history_limit: None,
            default_color: StrokeColor::BLACK,
            default_width: DEFAULT_STROKE_WIDTH,
        }
    }
}

impl AppConfig {
    /// Load configuration the way the binary does.
    ///
    /// An explicit `path` must exist. Otherwise `config.toml` in the data
    /// directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    pub fn load_with_env(
        path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::read(path)?,
            None => {
                let dir = match env(ENV_DATA_DIR) {
                    Some(dir) => PathBuf::from(dir),
                    None => default_data_dir().map_err(|e| ConfigError::NoDataDir(e.to_string()))?,
                };
                let candidate = dir.join(CONFIG_FILE_NAME);
                if candidate.is_file() {
                    Self::read(&candidate)?
                } else {
                    log::debug!("No config at {}, using defaults", candidate.display());
                    Self::default()
                }
            }
        };
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded config from {}", path.display());
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(dir) = env(ENV_DATA_DIR) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(owner) = env(ENV_OWNER) {
            let owner = owner
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidOwner(owner.clone()))?;
            self.owner_id = Some(owner);
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.default_width.is_finite() && self.default_width > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "default_width",
                reason: format!("must be positive, got {}", self.default_width),
            });
        }
        for (field, value) in [("preview_width", self.preview_width), ("preview_height", self.preview_height)] {
            if !(1..=MAX_PREVIEW_SIZE).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("must be between 1 and {MAX_PREVIEW_SIZE}, got {value}"),
                });
            }
        }
        if self.history_limit == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "history_limit",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// The configured data directory, or the platform default.
    pub fn resolved_data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_data_dir().map_err(|e| ConfigError::NoDataDir(e.to_string())),
        }
    }
}
