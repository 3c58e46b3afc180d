//! Server configuration.

use crate::LOCAL_SERVER_NAME;
use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::panic::Location;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_WRITE_TIMEOUT_MS: u64 = 1000;
const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Channel name both primary and secondary instances rendezvous on.
    #[serde(default = "default_name")]
    pub name: String,

    /// Remove a leftover endpoint nobody listens on and bind again.
    #[serde(default = "default_reclaim_stale_endpoint")]
    pub reclaim_stale_endpoint: bool,

    /// Per-connection budget for one broadcast write + flush.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    /// Upper bound of one inbound delivery.
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            reclaim_stale_endpoint: default_reclaim_stale_endpoint(),
            write_timeout_ms: default_write_timeout_ms(),
            read_buffer_size: default_read_buffer_size(),
        }
    }
}

fn default_name() -> String {
    LOCAL_SERVER_NAME.to_string()
}
fn default_reclaim_stale_endpoint() -> bool {
    true
}
fn default_write_timeout_ms() -> u64 {
    DEFAULT_WRITE_TIMEOUT_MS
}
fn default_read_buffer_size() -> usize {
    DEFAULT_READ_BUFFER_SIZE
}

impl ServerConfig {
    /// Config for a specific channel name, everything else default.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                field: "name",
                reason: "channel name cannot be empty".to_string(),
            });
        }

        if self.write_timeout_ms == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                field: "write_timeout_ms",
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.read_buffer_size == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                field: "read_buffer_size",
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}
