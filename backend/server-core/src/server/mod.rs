//! Local coordination server.
//!
//! The primary instance binds a well-known local channel; secondary launches
//! connect to it and forward commands instead of starting a second instance.
//!
//! # Architecture
//!
//! - `listener`: binds the endpoint, accepts peers, runs one reader per peer
//! - `control`: single task owning the [`ConnectionRegistry`] and the
//!   dispatcher; handles events strictly in order
//! - `handle`: [`LocalServerHandle`] for broadcast, queries and stop
//! - `transport`: Unix domain socket / Windows named pipe
//!
//! # Protocol
//!
//! One JSON document per delivery, see [`crate::envelope`]. There is no
//! length prefix or delimiter and no response is written back.

mod control;
mod handle;
mod listener;
pub mod registry;
mod transport;

pub use handle::{LocalServerHandle, ServerState};
pub use listener::start_local_server;
pub use registry::{
    BroadcastReport, ClientConnection, ConnectionId, ConnectionRegistry, ConnectionState,
};
pub use transport::{BoxedReader, BoxedWriter, Endpoint};

pub(crate) use transport::connect;
