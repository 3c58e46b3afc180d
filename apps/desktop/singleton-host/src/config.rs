//! Host configuration, read from a TOML file.
//!
//! ```toml
//! settings_dir = "/home/me/.config/singleton-host"
//! log_dir = "/home/me/.local/share/singleton-host/logs"
//!
//! [server]
//! name = "telegram_local_server"
//! reclaim_stale_endpoint = true
//! write_timeout_ms = 1000
//! ```
//!
//! Every key is optional.

use server_core::config::ServerConfig;
use server_core::error::config::ConfigError;

use common::ErrorLocation;

use std::panic::Location;
use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

pub const CONFIG_FILE_NAME: &str = "host.toml";

const APP_DIR_NAME: &str = "singleton-host";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Where `proxy.settings` lives.
    #[serde(default = "default_settings_dir")]
    pub settings_dir: PathBuf,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            settings_dir: default_settings_dir(),
            log_dir: default_log_dir(),
        }
    }
}

fn default_settings_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
        .join("logs")
}

impl HostConfig {
    /// Default location of the config file.
    pub fn default_path() -> PathBuf {
        default_settings_dir().join(CONFIG_FILE_NAME)
    }

    /// Load config from `path`.
    ///
    /// A missing file yields the defaults. A file that exists but cannot be
    /// read, parsed, or validated is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("Config file not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            location: ErrorLocation::from(Location::caller()),
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: HostConfig = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            location: ErrorLocation::from(Location::caller()),
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;

        info!("Config loaded from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;

        for (field, dir) in [("settings_dir", &self.settings_dir), ("log_dir", &self.log_dir)] {
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    field,
                    reason: "directory cannot be empty".to_string(),
                });
            }
        }

        Ok(())
    }
}
