//! Local server startup and the accept / read tasks.
//!
//! The accept task and one reader task per connection only translate OS
//! events into [`ServerEvent`]s. Everything stateful happens in the control
//! task (see `control.rs`).

use crate::config::ServerConfig;
use crate::dispatcher::CommandDispatcher;
use crate::error::server::LocalServerError;
use crate::server::control::{ControlLoop, ServerEvent};
use crate::server::handle::LocalServerHandle;
use crate::server::registry::{ClientConnection, ConnectionId};
use crate::server::transport::{BoxedReader, Endpoint, Listener};
use crate::settings::ProxySettingsStore;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::io::AsyncReadExt;
use tokio::spawn as TokioSpawn;
use tokio::sync::mpsc;

const EVENT_QUEUE_CAPACITY: usize = 256;
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Starts the local coordination server on the channel named in `config`.
///
/// Binds the endpoint, then spawns the control task and the accept task.
/// Dropping or stopping the returned handle closes the listener.
///
/// # Errors
///
/// Returns [`LocalServerError::Config`] for an invalid config, before anything
/// is bound. Returns [`LocalServerError::Bind`] if the channel cannot be bound. Use
/// [`LocalServerError::is_already_running`] to tell "another primary owns the
/// channel" apart from real startup faults.
pub async fn start_local_server<S: ProxySettingsStore>(
    config: &ServerConfig,
    settings: Arc<S>,
) -> Result<LocalServerHandle, LocalServerError> {
    let endpoint = Endpoint::resolve(&config.name)?;
    config.validate()?;
    let listener = Listener::bind(&endpoint, config.reclaim_stale_endpoint).await?;
    let owner = listener.owner();

    info!("Local server listening on {endpoint}");

    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    let listening = Arc::new(AtomicBool::new(true));

    let control = ControlLoop::new(
        CommandDispatcher::new(settings),
        Arc::clone(&listening),
        config.write_timeout(),
    );
    TokioSpawn(control.run(events_rx));

    let accept_task = TokioSpawn(accept_loop(
        listener,
        events_tx.clone(),
        config.read_buffer_size,
    ));

    Ok(LocalServerHandle::new(
        endpoint,
        owner,
        events_tx,
        listening,
        accept_task,
    ))
}

async fn accept_loop(
    mut listener: Listener,
    events: mpsc::Sender<ServerEvent>,
    read_buffer_size: usize,
) {
    loop {
        match listener.accept().await {
            Ok((reader, writer)) => {
                let connection = ClientConnection::from_boxed(writer);
                let id = connection.id();
                debug!("Accepted client {id}");

                // Registration is queued before the reader can queue any data.
                if events
                    .send(ServerEvent::Accepted { connection })
                    .await
                    .is_err()
                {
                    warn!("Control task is gone, accept loop exiting");
                    return;
                }
                TokioSpawn(read_loop(id, reader, events.clone(), read_buffer_size));
            }
            Err(e) => {
                error!("Failed to accept client: {e}");
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
            }
        }
    }
}

/// One read is one logical message; the channel has no framing.
async fn read_loop(
    id: ConnectionId,
    mut reader: BoxedReader,
    events: mpsc::Sender<ServerEvent>,
    read_buffer_size: usize,
) {
    let mut buffer = vec![0u8; read_buffer_size];

    loop {
        match reader.read(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => {
                let event = ServerEvent::Data {
                    id,
                    bytes: buffer[..n].to_vec(),
                };
                if events.send(event).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                warn!("Read from client {id} failed: {e}");
                break;
            }
        }
    }

    let _ = events.send(ServerEvent::Disconnected { id }).await;
}
