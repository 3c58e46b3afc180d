use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ProxyConfigError {
    #[error("Empty Host Error: {message} {location}")]
    EmptyHost {
        message: String,
        location: ErrorLocation,
    },

    #[error("Invalid Port Error: {message} {location}")]
    InvalidPort {
        message: String,
        location: ErrorLocation,
    },

    #[error("Unknown Kind Error: tag {tag} {location}")]
    UnknownKind { tag: i32, location: ErrorLocation },
}
