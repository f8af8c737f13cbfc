//! The record kept for each live connection.

use std::net::SocketAddr;
use std::time::Instant;

use callboard_protocol::ParticipantId;

/// Limits for the session layer.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Connections beyond this are turned away after the handshake.
    pub max_connections: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_connections: 10_000,
        }
    }
}

/// One connected participant.
#[derive(Debug, Clone)]
pub struct Session {
    pub participant_id: ParticipantId,
    /// Remote address, for logs.
    pub peer: SocketAddr,
    pub connected_at: Instant,
}
