use crate::ErrorLocation;

use thiserror::Error as ThisError;

/// Raised when a [`RedactedSecret`](crate::RedactedSecret) is used where its value would leak.
#[derive(Debug, ThisError)]
pub enum SecretError {
    #[error("Secret Serialize Error: {message} {location}")]
    Serialize {
        message: String,
        location: ErrorLocation,
    },
}
