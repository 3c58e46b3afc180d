use singleton_host::config::HostConfig;
use singleton_host::error::HostError;
use singleton_host::logger::initialize as LoggerInitialize;
use singleton_host::settings::file;
use singleton_host::settings::state::SettingsState;

use server_core::server::start_local_server;

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use log::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), HostError> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(HostConfig::default_path);
    let config = HostConfig::load(&config_path)?;

    create_dir_all(&config.log_dir).map_err(|e| HostError::Host {
        message: format!("Failed to create log directory {}: {e}", config.log_dir.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;
    LoggerInitialize(&config.log_dir)?;

    info!("Singleton host starting");
    info!("Config: {}", config_path.display());

    let settings = SettingsState::new(
        config.settings_dir.clone(),
        file::load(&config.settings_dir)?,
    );

    let mut handle = match start_local_server(&config.server, Arc::new(settings)).await {
        Ok(handle) => handle,
        Err(e) if e.is_already_running() => {
            info!("Another instance owns '{}', exiting", config.server.name);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    info!("Primary instance listening on {}", handle.endpoint());

    tokio::signal::ctrl_c().await.map_err(|e| HostError::Host {
        message: format!("Failed to wait for Ctrl-C: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    info!("Shutting down");
    handle.stop();
    Ok(())
}
