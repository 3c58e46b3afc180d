//! Local server handle type.
//!
//! The handle is the only way to talk to a running server: broadcast
//! notifications, query it, and stop it.

use crate::envelope::Notification;
use crate::error::server::LocalServerError;
use crate::server::control::{ServerEvent, service_message};
use crate::server::registry::BroadcastReport;
use crate::server::transport::{Endpoint, EndpointOwner};

use common::ErrorLocation;

use std::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::info;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Listener state. A stopped server goes back to `Idle`; start a new one to listen again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Idle,
    Listening,
}

/// Handle to a running local server.
///
/// Returned by [`start_local_server`](crate::server::start_local_server).
///
/// # Lifecycle
///
/// [`stop`](Self::stop) (or dropping the handle) closes the listener and
/// removes the endpoint, unless another listener has since replaced it. Connections accepted before that stay open until
/// the peers hang up, but their data is no longer dispatched.
pub struct LocalServerHandle {
    endpoint: Endpoint,
    owner: EndpointOwner,
    events: mpsc::Sender<ServerEvent>,
    listening: Arc<AtomicBool>,
    accept_task: Option<JoinHandle<()>>,
}

impl LocalServerHandle {
    pub(crate) fn new(
        endpoint: Endpoint,
        owner: EndpointOwner,
        events: mpsc::Sender<ServerEvent>,
        listening: Arc<AtomicBool>,
        accept_task: JoinHandle<()>,
    ) -> Self {
        Self {
            endpoint,
            owner,
            events,
            listening,
            accept_task: Some(accept_task),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn state(&self) -> ServerState {
        if self.listening.load(Ordering::SeqCst) {
            ServerState::Listening
        } else {
            ServerState::Idle
        }
    }

    /// Send `notification` to every connected client.
    ///
    /// Delivery is best effort: a failing client is recorded in the report and
    /// pruned, the others still get the message.
    ///
    /// # Errors
    ///
    /// Returns [`LocalServerError::NotListening`] after [`stop`](Self::stop).
    pub async fn broadcast(
        &self,
        notification: Notification,
    ) -> Result<BroadcastReport, LocalServerError> {
        let (reply, report) = oneshot::channel();
        self.send(ServerEvent::Broadcast {
            notification,
            reply,
        })
        .await?;

        report.await.map_err(|_| control_gone())?
    }

    /// Broadcast a `new_service_message` notification.
    pub async fn notify_new_service_message(
        &self,
        message: &str,
    ) -> Result<BroadcastReport, LocalServerError> {
        self.broadcast(service_message(message)).await
    }

    /// Number of registered client connections.
    pub async fn connection_count(&self) -> Result<usize, LocalServerError> {
        let (reply, count) = oneshot::channel();
        self.send(ServerEvent::CountConnections { reply }).await?;
        count.await.map_err(|_| control_gone())
    }

    /// Stop listening. Idempotent.
    pub fn stop(&mut self) {
        let Some(accept_task) = self.accept_task.take() else {
            return;
        };

        self.listening.store(false, Ordering::SeqCst);
        accept_task.abort();
        self.endpoint.release(&self.owner);
        info!("Local server on {} stopped", self.endpoint);
    }

    async fn send(&self, event: ServerEvent) -> Result<(), LocalServerError> {
        self.events.send(event).await.map_err(|_| control_gone())
    }
}

impl Drop for LocalServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[track_caller]
fn control_gone() -> LocalServerError {
    LocalServerError::Io {
        message: "Local server control task is not running".to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
}
