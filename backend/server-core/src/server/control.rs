//! The server's control task.
//!
//! Accept, read and broadcast requests all arrive here as [`ServerEvent`]s and
//! are handled one at a time, in arrival order. That single consumer is what
//! keeps dispatch cycles from overlapping each other or a broadcast, and what
//! lets the registry live without a lock.

use crate::NEW_SERVICE_MESSAGE_METHOD;
use crate::dispatcher::{CommandDispatcher, DispatchOutcome};
use crate::envelope::{Notification, decode_request};
use crate::error::server::LocalServerError;
use crate::server::registry::{BroadcastReport, ClientConnection, ConnectionId, ConnectionRegistry};
use crate::settings::ProxySettingsStore;

use common::ErrorLocation;

use std::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, error, info, warn};
use serde_json::json;
use tokio::sync::{mpsc, oneshot};

pub(crate) enum ServerEvent {
    /// A peer connected; its reader task is about to start.
    Accepted { connection: ClientConnection },

    /// One "data available" delivery from a peer.
    Data { id: ConnectionId, bytes: Vec<u8> },

    /// A peer's read side hit EOF or failed.
    Disconnected { id: ConnectionId },

    Broadcast {
        notification: Notification,
        reply: oneshot::Sender<Result<BroadcastReport, LocalServerError>>,
    },

    CountConnections { reply: oneshot::Sender<usize> },
}

pub(crate) struct ControlLoop<S> {
    registry: ConnectionRegistry,
    dispatcher: CommandDispatcher<S>,
    listening: Arc<AtomicBool>,
    write_timeout: Duration,
}

impl<S: ProxySettingsStore> ControlLoop<S> {
    pub(crate) fn new(
        dispatcher: CommandDispatcher<S>,
        listening: Arc<AtomicBool>,
        write_timeout: Duration,
    ) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            dispatcher,
            listening,
            write_timeout,
        }
    }

    /// Drain events until every sender (handle, accept task, readers) is gone.
    pub(crate) async fn run(mut self, mut events: mpsc::Receiver<ServerEvent>) {
        debug!("Local server control task started");

        while let Some(event) = events.recv().await {
            self.handle(event).await;
        }

        info!(
            "Local server control task stopped with {} client(s) registered",
            self.registry.len()
        );
    }

    async fn handle(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Accepted { connection } => {
                let id = connection.id();
                if self.registry.add(connection) {
                    info!(
                        "Client {id} registered ({} connected)",
                        self.registry.len()
                    );
                }
            }
            ServerEvent::Data { id, bytes } => self.handle_data(id, &bytes).await,
            ServerEvent::Disconnected { id } => {
                if self.registry.mark_disconnected(id) {
                    info!("Client {id} disconnected");
                }
                self.registry.remove_disconnected();
            }
            ServerEvent::Broadcast {
                notification,
                reply,
            } => {
                let result = self.broadcast(&notification).await;
                if reply.send(result).is_err() {
                    debug!("Broadcast caller went away before the report was ready");
                }
            }
            ServerEvent::CountConnections { reply } => {
                let _ = reply.send(self.registry.len());
            }
        }
    }

    async fn handle_data(&mut self, id: ConnectionId, bytes: &[u8]) {
        // Liveness guard: nothing is dispatched once the server was stopped.
        if !self.listening.load(Ordering::SeqCst) {
            debug!("Server stopped, dropping {} bytes from {id}", bytes.len());
            return;
        }
        if !self.registry.contains(id) {
            warn!("Data from unregistered client {id} dropped");
            return;
        }

        let request = decode_request(bytes);
        debug!("Client {id} sent '{}'", request.method);

        match self.dispatcher.dispatch(&request).await {
            DispatchOutcome::Applied => info!("Client {id}: '{}' applied", request.method),
            DispatchOutcome::Ignored(reason) => {
                debug!("Client {id}: '{}' ignored ({reason:?})", request.method)
            }
            DispatchOutcome::StoreFailed => {
                error!("Client {id}: '{}' could not be applied", request.method)
            }
        }
    }

    async fn broadcast(
        &mut self,
        notification: &Notification,
    ) -> Result<BroadcastReport, LocalServerError> {
        if !self.listening.load(Ordering::SeqCst) {
            return Err(LocalServerError::NotListening {
                message: format!("Cannot broadcast '{}' after stop", notification.method),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let bytes = notification.encode().map_err(|e| LocalServerError::Io {
            message: format!("Failed to encode '{}': {e}", notification.method),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let report = self
            .registry
            .deliver_to_all(&bytes, self.write_timeout)
            .await;
        self.registry.remove_disconnected();

        debug!(
            "Broadcast '{}': {} delivered, {} failed, {} skipped",
            notification.method,
            report.delivered,
            report.failed.len(),
            report.skipped
        );
        Ok(report)
    }
}

/// `new_service_message` notification carrying `message`.
pub(crate) fn service_message(message: &str) -> Notification {
    Notification::new(NEW_SERVICE_MESSAGE_METHOD, json!({ "message": message }))
}
