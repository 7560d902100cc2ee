//! On-disk configuration
//!
//! Read once at startup from `config.toml` in the user's config directory
//! (`$PADSHELL_CONFIG` overrides the path). A missing file is replaced by the
//! defaults, so the shell always starts; a malformed one is an error.

use crate::controller::StickCalibration;
use crate::mapping::{KeyBinding, KeyMap, MappingError};
use crate::shell::ShellSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

const CONFIG_DIR: &str = "padshell";
const CONFIG_FILE: &str = "config.toml";
/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "PADSHELL_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No configuration directory available on this platform")]
    NoConfigDir,

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid key map: {0}")]
    KeyMap(#[from] MappingError),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Which input the shell reads
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    Text,
    Device,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub mode: RunMode,
    pub prompt: String,
    /// evdev node read in device mode
    pub device_path: PathBuf,
    pub flush_interval_ms: u64,
    pub event_channel_capacity: usize,
    /// How long a button typed as a command stays pressed
    pub button_push_ms: u64,
    pub left_stick: StickCalibration,
    pub right_stick: StickCalibration,
    /// Replaces the built-in key table when not empty
    pub key_map: Vec<KeyBinding>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Text,
            prompt: "cmd >> ".to_string(),
            device_path: PathBuf::from("/dev/input/event1"),
            flush_interval_ms: 15,
            event_channel_capacity: 1000,
            button_push_ms: 100,
            left_stick: StickCalibration::default(),
            right_stick: StickCalibration::default(),
            key_map: KeyMap::default_config().bindings(),
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }
        let mut path = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        Ok(path)
    }

    pub async fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path()?).await
    }

    /// Reads `path`, writing the defaults there first if it does not exist.
    pub async fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if !tokio::fs::try_exists(path).await.map_err(io_err)? {
            warn!(
                "Config file {} does not exist, writing defaults",
                path.display()
            );
            let config = Self::default();
            config.save_to(path).await?;
            return Ok(config);
        }

        let content = tokio::fs::read_to_string(path).await.map_err(io_err)?;
        let config = Self::parse(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        tokio::fs::write(path, content).await.map_err(io_err)?;
        info!("Wrote config to {}", path.display());
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.flush_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "flush_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "event_channel_capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn key_map(&self) -> Result<KeyMap, ConfigError> {
        if self.key_map.is_empty() {
            return Ok(KeyMap::default_config());
        }
        Ok(KeyMap::from_bindings(&self.key_map)?)
    }

    pub fn shell_settings(&self) -> Result<ShellSettings, ConfigError> {
        Ok(ShellSettings {
            prompt: self.prompt.clone(),
            button_push: Duration::from_millis(self.button_push_ms),
            flush_interval: Duration::from_millis(self.flush_interval_ms),
            event_channel_capacity: self.event_channel_capacity,
            key_map: self.key_map()?,
        })
    }
}
