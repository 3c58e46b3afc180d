use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::io::Error as IoError;
use std::panic::Location;

use thiserror::Error as ThisError;

/// Why the local channel could not be bound.
///
/// `AlreadyRunning` is the expected outcome for a secondary launch; every other
/// reason is a genuine startup fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindReason {
    /// A live primary instance answers on the endpoint.
    AlreadyRunning,
    /// The endpoint artifact exists but nothing is listening on it.
    StaleEndpoint,
    /// The OS refused access to the endpoint.
    PermissionDenied,
    /// The channel name cannot be turned into an endpoint.
    InvalidName,
    /// Any other OS failure (exhausted endpoints, missing directory, ...).
    Io,
}

impl Display for BindReason {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        let text = match self {
            BindReason::AlreadyRunning => "already running",
            BindReason::StaleEndpoint => "stale endpoint",
            BindReason::PermissionDenied => "permission denied",
            BindReason::InvalidName => "invalid name",
            BindReason::Io => "io",
        };
        formatter.write_str(text)
    }
}

#[derive(Debug, ThisError)]
pub enum LocalServerError {
    #[error("Bind Error ({reason}): {message} {location}")]
    Bind {
        reason: BindReason,
        message: String,
        location: ErrorLocation,
    },

    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    #[error("Not Listening Error: {message} {location}")]
    NotListening {
        message: String,
        location: ErrorLocation,
    },

    #[error("Connect Error: {message} {location}")]
    Connect {
        message: String,
        location: ErrorLocation,
    },

    #[error("Send Error: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },

    #[error("Read Error: {message} {location}")]
    Read {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO Error: {message} {location}")]
    Io {
        message: String,
        location: ErrorLocation,
    },
}

impl LocalServerError {
    /// True when binding failed because another primary instance owns the channel.
    pub fn is_already_running(&self) -> bool {
        matches!(
            self,
            LocalServerError::Bind {
                reason: BindReason::AlreadyRunning,
                ..
            }
        )
    }

    /// The bind failure reason, if this is a bind error.
    pub fn bind_reason(&self) -> Option<BindReason> {
        match self {
            LocalServerError::Bind { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

impl From<IoError> for LocalServerError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        LocalServerError::Io {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ConfigError> for LocalServerError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        LocalServerError::Config {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
