//! Client side of the local channel, as used by a secondary instance.

use crate::SET_PROXY_METHOD;
use crate::envelope::{Message, Request};
use crate::error::server::LocalServerError;
use crate::server::{BoxedReader, BoxedWriter, Endpoint, connect};

use common::ErrorLocation;

use std::panic::Location;

use log::{debug, warn};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Connection from a secondary instance to the primary.
pub struct LocalClient {
    reader: BoxedReader,
    writer: BoxedWriter,
    buffer: Vec<u8>,
}

impl LocalClient {
    /// Connect to the primary listening on channel `name`.
    ///
    /// # Errors
    ///
    /// Returns [`LocalServerError::Connect`] if no primary is listening.
    pub async fn connect(name: &str) -> Result<Self, LocalServerError> {
        let endpoint = Endpoint::resolve(name)?;
        let (reader, writer) = connect(&endpoint).await?;
        Ok(Self {
            reader,
            writer,
            buffer: vec![0u8; READ_BUFFER_SIZE],
        })
    }

    /// Send one message as one write.
    pub async fn send(&mut self, message: &Message) -> Result<(), LocalServerError> {
        let bytes = message.encode().map_err(|e| LocalServerError::Send {
            message: format!("Failed to encode message: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        self.writer
            .write_all(&bytes)
            .await
            .map_err(|e| LocalServerError::Send {
                message: format!("Failed to write message: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        self.writer
            .flush()
            .await
            .map_err(|e| LocalServerError::Send {
                message: format!("Failed to flush message: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    /// Forward a `set_proxy` command. The primary never answers it.
    pub async fn set_proxy(
        &mut self,
        id: impl Into<String>,
        params: Value,
    ) -> Result<(), LocalServerError> {
        let request = Request::new(id, SET_PROXY_METHOD, params);
        self.send(&Message::Request(request)).await
    }

    /// Wait for the next message from the primary.
    ///
    /// Returns `Ok(None)` once the primary closes the connection. Deliveries
    /// that are not a recognizable envelope are skipped.
    pub async fn recv(&mut self) -> Result<Option<Message>, LocalServerError> {
        loop {
            let n = self
                .reader
                .read(&mut self.buffer)
                .await
                .map_err(|e| LocalServerError::Read {
                    message: format!("Failed to read from primary: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            if n == 0 {
                debug!("Primary closed the connection");
                return Ok(None);
            }

            match Message::decode(&self.buffer[..n]) {
                Some(message) => return Ok(Some(message)),
                None => warn!("Skipping unrecognized delivery of {n} bytes"),
            }
        }
    }
}
