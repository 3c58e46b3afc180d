//! Shared building blocks for the single-instance workspace.
//!
//! - [`ErrorLocation`]: file/line/column captured at the error site
//! - [`RedactedSecret`]: credential wrapper that never prints its value

pub mod error;
pub mod redacted_secret;

pub use error::error_location::ErrorLocation;
pub use error::secret::SecretError;
pub use redacted_secret::RedactedSecret;

#[cfg(test)]
mod tests;
