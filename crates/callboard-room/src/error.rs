//! Error types for the room layer.

use callboard_protocol::{ErrorCode, ParticipantId, Phase, RoomId};

/// Why a room operation was refused.
///
/// Every variant is reported to the acting client only. None of them
/// changes room state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("room {0} not found")]
    NotFound(RoomId),

    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The room has left the lobby and takes no new participants.
    #[error("room {0} is already in play")]
    AlreadyActive(RoomId),

    /// `startGame` needs exactly two participants.
    #[error("need two participants to start, have {0}")]
    NotReady(usize),

    #[error("game already started")]
    AlreadyStarted,

    /// The caller does not hold the turn.
    #[error("not your turn, waiting on {0}")]
    WrongTurn(ParticipantId),

    #[error("no game in progress (phase {0})")]
    NotActive(Phase),

    #[error("number {0} was already called")]
    AlreadyCalled(u8),

    #[error("number {0} is not on the board (1-25)")]
    InvalidNumber(u8),

    #[error("a rematch request is already pending")]
    AlreadyPending,

    #[error("game is not concluded (phase {0})")]
    NotConcluded(Phase),

    #[error("no rematch request to answer")]
    NoPendingRequest,

    /// Only the participant who did not ask may answer a rematch request.
    #[error("you cannot answer your own rematch request")]
    NotTheResponder,

    #[error("participant {0} is not in a room")]
    NotInRoom(ParticipantId),

    #[error("participant {0} is already in room {1}")]
    AlreadyInRoom(ParticipantId, RoomId),

    /// The room actor has shut down or its queue is closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}

impl RoomError {
    /// The code sent to the client.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::RoomNotFound,
            Self::RoomFull(_) => ErrorCode::RoomFull,
            Self::AlreadyActive(_) => ErrorCode::AlreadyActive,
            Self::NotReady(_) => ErrorCode::NotReady,
            Self::AlreadyStarted => ErrorCode::AlreadyStarted,
            Self::WrongTurn(_) => ErrorCode::WrongTurn,
            Self::NotActive(_) => ErrorCode::NotActive,
            Self::AlreadyCalled(_) => ErrorCode::AlreadyCalled,
            Self::InvalidNumber(_) => ErrorCode::InvalidNumber,
            Self::AlreadyPending => ErrorCode::AlreadyPending,
            Self::NotConcluded(_) => ErrorCode::NotConcluded,
            Self::NoPendingRequest => ErrorCode::NoPendingRequest,
            Self::NotTheResponder => ErrorCode::NotTheResponder,
            Self::NotInRoom(_) => ErrorCode::NotInRoom,
            Self::AlreadyInRoom(..) => ErrorCode::AlreadyInRoom,
            // A room that vanished between lookup and delivery looks the
            // same to the client as one that never existed.
            Self::Unavailable(_) => ErrorCode::RoomNotFound,
        }
    }
}
