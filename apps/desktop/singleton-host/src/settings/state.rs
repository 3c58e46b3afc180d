//! Proxy settings state using the actor pattern.
//!
//! Mutations are sent as [`SettingsCommand`]s to one task that applies them in
//! order and persists the result on the blocking pool. Reads go straight to
//! the shared `RwLock<ProxySettings>`.

use crate::settings::{ProxySettings, file};

use server_core::error::settings::SettingsError;
use server_core::proxy::ProxyConfig;
use server_core::settings::ProxySettingsStore;

use common::ErrorLocation;

use std::panic::Location;
use std::path::PathBuf;
use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::{Mutex, RwLock, mpsc, oneshot};
use tokio::task::spawn_blocking;

const COMMAND_QUEUE_CAPACITY: usize = 100;

#[derive(Debug)]
pub enum SettingsCommand {
    /// Append, select, enable, activate and persist a proxy.
    ApplyProxy {
        proxy: ProxyConfig,
        done: oneshot::Sender<()>,
    },
}

/// Proxy settings shared between the local server and the rest of the host.
///
/// `Clone` hands out another reference to the same state.
#[derive(Clone)]
pub struct SettingsState {
    command_tx: Arc<Mutex<Option<mpsc::Sender<SettingsCommand>>>>,
    settings: Arc<RwLock<ProxySettings>>,
    settings_dir: Arc<PathBuf>,
}

impl SettingsState {
    /// Wrap settings loaded from `settings_dir`. The actor starts on first use.
    pub fn new(settings_dir: PathBuf, settings: ProxySettings) -> Self {
        Self {
            command_tx: Arc::new(Mutex::new(None)),
            settings: Arc::new(RwLock::new(settings)),
            settings_dir: Arc::new(settings_dir),
        }
    }

    /// Current settings (read-only copy).
    pub async fn snapshot(&self) -> ProxySettings {
        self.settings.read().await.clone()
    }

    /// Queue a command for the actor.
    pub async fn update(&self, command: SettingsCommand) -> Result<(), SettingsError> {
        let mut tx_guard = self.command_tx.lock().await;
        let tx = tx_guard.get_or_insert_with(|| self.spawn_actor());

        tx.send(command).await.map_err(|e| SettingsError::Apply {
            message: format!("Settings actor died: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    fn spawn_actor(&self) -> mpsc::Sender<SettingsCommand> {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        tokio::spawn(settings_actor(
            rx,
            Arc::clone(&self.settings),
            Arc::clone(&self.settings_dir),
        ));
        info!("Settings actor spawned");
        tx
    }
}

impl ProxySettingsStore for SettingsState {
    /// Resolves once the proxy is applied in memory and a save was attempted.
    async fn apply_proxy(&self, proxy: ProxyConfig) -> Result<(), SettingsError> {
        let (done, applied) = oneshot::channel();
        self.update(SettingsCommand::ApplyProxy { proxy, done }).await?;

        applied.await.map_err(|_| SettingsError::Apply {
            message: "Settings actor dropped the command".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

async fn settings_actor(
    mut command_rx: mpsc::Receiver<SettingsCommand>,
    settings: Arc<RwLock<ProxySettings>>,
    settings_dir: Arc<PathBuf>,
) {
    info!("Settings actor started");

    while let Some(command) = command_rx.recv().await {
        match command {
            SettingsCommand::ApplyProxy { proxy, done } => {
                let updated = {
                    let mut settings_write = settings.write().await;
                    settings_write.apply(proxy);
                    settings_write.clone()
                };

                if let Some(active) = updated.active() {
                    info!(
                        "Activating proxy {active} for connections (calls: {})",
                        updated.use_proxy_for_calls
                    );
                }

                // Memory stays updated even when the disk write fails.
                let dir = Arc::clone(&settings_dir);
                match spawn_blocking(move || file::save(&dir, &updated)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!("Proxy applied in memory but saving failed: {e}"),
                    Err(e) => error!("Proxy applied in memory but the save task failed: {e}"),
                }

                let _ = done.send(());
            }
        }
    }

    warn!("Settings actor stopped");
}
