pub mod error_location;
pub mod secret;
