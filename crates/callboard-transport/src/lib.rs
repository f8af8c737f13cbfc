//! Transport boundary for Callboard.
//!
//! The room engine never touches sockets. It sees [`Connection`]s that move
//! whole frames in order, and a [`Transport`] that hands those out. The
//! only shipped implementation is WebSocket (`websocket` feature, on by
//! default).
//!
//! A connection can be read and written from different tasks at the same
//! time: the server keeps one task blocked in [`Connection::recv`] while
//! room snapshots are pushed through [`Connection::send`] from another.

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::net::SocketAddr;

/// Largest inbound frame accepted from a client. Every legitimate client
/// message is well under a kilobyte.
pub const MAX_FRAME_BYTES: usize = 16 * 1024;

/// Process-unique identifier for an accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wraps a raw id.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Hands out new connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by [`accept`](Self::accept).
    type Connection: Connection;
    /// Error type for accept failures.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next client and completes its upgrade.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// The address the listener is bound to.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// One established, ordered, reliable frame pipe to a client.
pub trait Connection: Send + Sync + 'static {
    /// Error type for send/recv failures.
    type Error: std::error::Error + Send + Sync;

    /// Writes one frame.
    async fn send(&self, frame: &[u8]) -> Result<(), Self::Error>;

    /// Reads the next frame. `Ok(None)` means the peer closed cleanly.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Starts a clean close.
    async fn close(&self) -> Result<(), Self::Error>;

    /// This connection's id.
    fn id(&self) -> ConnectionId;

    /// The remote address.
    fn peer_addr(&self) -> SocketAddr;
}
