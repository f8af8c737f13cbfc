//! Error types for the session layer.

use callboard_protocol::ParticipantId;

/// Errors raised by [`SessionManager`](crate::SessionManager).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists for the participant. Usually a double disconnect.
    #[error("session not found for participant {0}")]
    NotFound(ParticipantId),

    /// The server is already holding `max_connections` sessions.
    #[error("server is full ({0} connections)")]
    CapacityReached(usize),
}
