//! Unified error type for Callboard.

use callboard_protocol::{ErrorCode, ProtocolError};
use callboard_room::RoomError;
use callboard_session::SessionError;
use callboard_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum CallboardError {
    /// Connection, send, or receive failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded, or broke the handshake.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// An action the room refused.
    #[error(transparent)]
    Room(#[from] RoomError),
}

impl CallboardError {
    /// The code reported to the client, if this error is the client's to
    /// see.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Room(e) => Some(e.code()),
            Self::Session(SessionError::CapacityReached(_)) => Some(ErrorCode::ServerFull),
            Self::Protocol(_) => Some(ErrorCode::BadRequest),
            Self::Session(_) | Self::Transport(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callboard_protocol::{ParticipantId, RoomId};

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::FrameTooLarge(1 << 20);
        let callboard_err: CallboardError = err.into();
        assert!(matches!(callboard_err, CallboardError::Transport(_)));
        assert!(callboard_err.to_string().contains("1048576"));
        assert_eq!(callboard_err.code(), None);
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let callboard_err: CallboardError = err.into();
        assert!(matches!(callboard_err, CallboardError::Protocol(_)));
        assert_eq!(callboard_err.code(), Some(ErrorCode::BadRequest));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::CapacityReached(10);
        let callboard_err: CallboardError = err.into();
        assert_eq!(callboard_err.code(), Some(ErrorCode::ServerFull));

        let err: CallboardError = SessionError::NotFound(ParticipantId(1)).into();
        assert_eq!(err.code(), None);
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::NotFound(RoomId(1));
        let callboard_err: CallboardError = err.into();
        assert!(matches!(callboard_err, CallboardError::Room(_)));
        assert_eq!(callboard_err.code(), Some(ErrorCode::RoomNotFound));
    }
}
