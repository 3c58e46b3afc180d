use common::ErrorLocation;

use server_core::error::CoreError;
use server_core::error::config::ConfigError;
use server_core::error::server::LocalServerError;
use server_core::error::settings::SettingsError;

use thiserror::Error;

/// Errors that end the host process.
#[derive(Debug, Error)]
pub enum HostError {
    /// Error from this app (logger, directories, runtime)
    #[error("Host Error: {message} {location}")]
    Host {
        message: String,
        location: ErrorLocation,
    },

    /// Error from server-core (server, settings store, config)
    #[error("Core Error: {0}")]
    Core(#[from] CoreError),
}

impl From<LocalServerError> for HostError {
    fn from(error: LocalServerError) -> Self {
        HostError::Core(error.into())
    }
}

impl From<SettingsError> for HostError {
    fn from(error: SettingsError) -> Self {
        HostError::Core(error.into())
    }
}

impl From<ConfigError> for HostError {
    fn from(error: ConfigError) -> Self {
        HostError::Core(error.into())
    }
}
