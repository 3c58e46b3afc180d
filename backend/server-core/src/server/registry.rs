//! Registry of connected secondary instances.
//!
//! Owned by the server's control task; nothing else mutates it, so it needs no
//! locking. Iteration always walks a snapshot of ids, so entries pruned or
//! added while a broadcast is in flight never invalidate it.

use crate::error::server::LocalServerError;
use crate::server::transport::BoxedWriter;

use common::ErrorLocation;

use std::collections::HashMap;
use std::panic::Location;
use std::time::Duration;

use log::{debug, warn};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use uuid::Uuid;

pub type ConnectionId = Uuid;

/// Lifecycle of one connection. `Disconnected` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Write side of one accepted peer.
pub struct ClientConnection {
    id: ConnectionId,
    writer: BoxedWriter,
    state: ConnectionState,
}

impl ClientConnection {
    /// Wrap the write half of a freshly accepted channel.
    pub fn new(writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            id: Uuid::new_v4(),
            writer: Box::new(writer),
            state: ConnectionState::Connected,
        }
    }

    pub(crate) fn from_boxed(writer: BoxedWriter) -> Self {
        Self {
            id: Uuid::new_v4(),
            writer,
            state: ConnectionState::Connected,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Move to `Disconnected`. There is no way back.
    pub fn mark_disconnected(&mut self) {
        self.state = ConnectionState::Disconnected;
    }

    /// Write and flush one encoded message within `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`LocalServerError::Send`] if the connection is already
    /// disconnected, the write fails, or it does not finish in time.
    pub async fn deliver(&mut self, bytes: &[u8], limit: Duration) -> Result<(), LocalServerError> {
        if !self.is_connected() {
            return Err(LocalServerError::Send {
                message: format!("Connection {} is disconnected", self.id),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let write = async {
            self.writer.write_all(bytes).await?;
            self.writer.flush().await
        };

        match timeout(limit, write).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(LocalServerError::Send {
                message: format!("Write to {} failed: {e}", self.id),
                location: ErrorLocation::from(Location::caller()),
            }),
            Err(_) => Err(LocalServerError::Send {
                message: format!("Write to {} timed out after {limit:?}", self.id),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

/// Result of one fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections that received the message.
    pub delivered: usize,
    /// Connections whose write failed; they are now disconnected.
    pub failed: Vec<ConnectionId>,
    /// Connections that were already disconnected and were not written to.
    pub skipped: usize,
}

/// Active connections keyed by id.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, ClientConnection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a connection. Returns false if its id is already registered.
    pub fn add(&mut self, connection: ClientConnection) -> bool {
        let id = connection.id();
        if self.connections.contains_key(&id) {
            warn!("Connection {id} is already registered");
            return false;
        }
        self.connections.insert(id, connection);
        true
    }

    /// Mark one connection disconnected. Returns false if it is unknown.
    pub fn mark_disconnected(&mut self, id: ConnectionId) -> bool {
        match self.connections.get_mut(&id) {
            Some(connection) => {
                connection.mark_disconnected();
                true
            }
            None => false,
        }
    }

    /// Evict every disconnected entry and return how many were removed.
    pub fn remove_disconnected(&mut self) -> usize {
        let before = self.connections.len();
        self.connections
            .retain(|_, connection| connection.is_connected());
        let removed = before - self.connections.len();
        if removed > 0 {
            debug!(
                "Removed {removed} disconnected client(s), {} remaining",
                self.connections.len()
            );
        }
        removed
    }

    /// Ids registered right now.
    pub fn snapshot(&self) -> Vec<ConnectionId> {
        self.connections.keys().copied().collect()
    }

    /// Apply `visit` to every connection in a snapshot taken up front.
    pub fn for_each(&mut self, mut visit: impl FnMut(&mut ClientConnection)) {
        for id in self.snapshot() {
            if let Some(connection) = self.connections.get_mut(&id) {
                visit(connection);
            }
        }
    }

    pub fn get(&self, id: ConnectionId) -> Option<&ClientConnection> {
        self.connections.get(&id)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Write `bytes` to every connected entry of a snapshot.
    ///
    /// One failed write never stops delivery to the others; the failing
    /// connection is marked disconnected and left for [`remove_disconnected`](Self::remove_disconnected).
    pub async fn deliver_to_all(&mut self, bytes: &[u8], limit: Duration) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for id in self.snapshot() {
            let Some(connection) = self.connections.get_mut(&id) else {
                continue;
            };
            if !connection.is_connected() {
                report.skipped += 1;
                continue;
            }
            match connection.deliver(bytes, limit).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!("Broadcast to {id} failed: {e}");
                    connection.mark_disconnected();
                    report.failed.push(id);
                }
            }
        }

        report
    }
}
