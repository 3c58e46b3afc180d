pub mod config;
pub mod proxy;
pub mod server;
pub mod settings;

pub use server::BindReason;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Server(#[from] server::LocalServerError),

    #[error(transparent)]
    Proxy(#[from] proxy::ProxyConfigError),

    #[error(transparent)]
    Settings(#[from] settings::SettingsError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}
