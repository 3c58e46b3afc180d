use common::ErrorLocation;

use std::path::PathBuf;

use thiserror::Error as ThisError;

/// Failures reported by a [`ProxySettingsStore`](crate::settings::ProxySettingsStore).
#[derive(Debug, ThisError)]
pub enum SettingsError {
    #[error("Settings Apply Error: {message} {location}")]
    Apply {
        message: String,
        location: ErrorLocation,
    },

    #[error("Settings Read Error: {path}: {source} {location}")]
    Read {
        location: ErrorLocation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings Persist Error: {path}: {source} {location}")]
    Persist {
        location: ErrorLocation,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings Format Error: {message} {location}")]
    Format {
        message: String,
        location: ErrorLocation,
    },
}
