//! Everything that travels on the wire.
//!
//! Clients send [`ClientMessage`]s and receive [`ServerMessage`]s, each
//! wrapped in an [`Envelope`]. Room state only ever reaches a client as a
//! complete [`RoomSnapshot`]: the client throws away whatever it had and
//! renders the new one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Number of cells on a board, and the highest callable number.
pub const BOARD_CELLS: usize = 25;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

static NEXT_PARTICIPANT_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one participant: a live connection, or a simulated player.
///
/// Serialized as a bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl ParticipantId {
    /// Hands out a process-unique id. Connections and simulated players
    /// draw from the same counter so they can never collide.
    pub fn allocate() -> Self {
        Self(NEXT_PARTICIPANT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// The six-digit code players share to get into the same room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u32);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Room vocabulary
// ---------------------------------------------------------------------------

/// Who is behind a participant slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Role {
    /// A real client connection.
    Human,
    /// The server-side scripted opponent.
    Simulated,
}

/// What kind of room to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub enum GameMode {
    /// Two humans; the second one joins with the room code.
    #[default]
    HumanPair,
    /// One human against the simulated opponent. Starts immediately.
    VsSimulated,
}

/// The room's lifecycle stage.
///
/// ```text
/// Lobby ──start──▶ Active ──win/draw/abandon──▶ Concluded
///                    ▲                            │  ▲
///                    │                    request │  │ decline
///                    │                            ▼  │
///                    └─────────accept────── RematchPending
/// ```
///
/// `RematchPending` is a sub-state of `Concluded`: the outcome of the last
/// game stays visible while the negotiation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Phase {
    /// Waiting for a second participant or for someone to start.
    Lobby,
    /// A game is running; exactly one participant holds the turn.
    Active,
    /// The last game is over.
    Concluded,
    /// The last game is over and one side asked to play again.
    RematchPending,
}

impl Phase {
    /// Only lobbies accept new participants.
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::Lobby)
    }

    /// `true` for `Concluded` and its `RematchPending` sub-state.
    pub fn is_concluded(self) -> bool {
        matches!(self, Self::Concluded | Self::RematchPending)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lobby => "Lobby",
            Self::Active => "Active",
            Self::Concluded => "Concluded",
            Self::RematchPending => "RematchPending",
        };
        f.write_str(name)
    }
}

/// How the last game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub enum OutcomeKind {
    /// No game has ended since the last reset.
    #[default]
    None,
    /// One participant completed a line first.
    Win,
    /// Both boards had a completed line when the win was confirmed.
    Draw,
    /// A participant left mid-game. Nobody wins.
    Abandoned,
}

/// The result of a game instance. Set once, cleared on reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Outcome {
    pub kind: OutcomeKind,
    /// Present only for [`OutcomeKind::Win`].
    pub winner: Option<ParticipantId>,
    /// The call that decided the game: the one that completed the winner's
    /// first line, or for a draw the one after which both boards had a line.
    pub deciding_number: Option<u8>,
}

impl Outcome {
    pub fn win(winner: ParticipantId, deciding_number: u8) -> Self {
        Self {
            kind: OutcomeKind::Win,
            winner: Some(winner),
            deciding_number: Some(deciding_number),
        }
    }

    pub fn draw(deciding_number: u8) -> Self {
        Self {
            kind: OutcomeKind::Draw,
            winner: None,
            deciding_number: Some(deciding_number),
        }
    }

    pub fn abandoned() -> Self {
        Self {
            kind: OutcomeKind::Abandoned,
            winner: None,
            deciding_number: None,
        }
    }

    /// `true` once any ending has been recorded.
    pub fn is_decided(&self) -> bool {
        self.kind != OutcomeKind::None
    }
}

/// An open "play again?" request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRematch {
    pub requester: ParticipantId,
    /// Snapshot sequence number at which the request was accepted.
    pub requested_at_seq: u64,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// One participant as clients see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantView {
    pub id: ParticipantId,
    pub display_name: String,
    pub role: Role,
    /// Current seat, 1 or 2. When seat 1 leaves, seat 2 moves up.
    pub join_order: u32,
    /// Games won in this room, across rematches.
    pub wins: u32,
}

/// A participant's board: cells in row-major order, which of them are
/// marked, and how many of its 12 lines are currently complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardView {
    pub owner: ParticipantId,
    pub cells: [u8; BOARD_CELLS],
    /// Bit `i` is set when `cells[i]` has been called.
    pub marked_mask: u32,
    pub lines: u8,
}

/// The full, authoritative state of a room.
///
/// Every member receives the same snapshot after every accepted change.
/// `seq` increases by one per change, so a client can drop anything older
/// than what it already shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub seq: u64,
    pub phase: Phase,
    pub participants: Vec<ParticipantView>,
    /// In call order.
    pub called_numbers: Vec<u8>,
    pub current_turn: Option<ParticipantId>,
    pub outcome: Outcome,
    pub pending_rematch: Option<PendingRematch>,
    /// Empty until the first game starts.
    pub boards: Vec<BoardView>,
}

impl RoomSnapshot {
    /// Looks up a participant's board.
    pub fn board_of(&self, owner: ParticipantId) -> Option<&BoardView> {
        self.boards.iter().find(|b| b.owner == owner)
    }

    /// Looks up a participant entry.
    pub fn participant(&self, id: ParticipantId) -> Option<&ParticipantView> {
        self.participants.iter().find(|p| p.id == id)
    }

    /// Whether `number` has been called in the current game.
    pub fn is_called(&self, number: u8) -> bool {
        self.called_numbers.contains(&number)
    }
}

// ---------------------------------------------------------------------------
// Errors on the wire
// ---------------------------------------------------------------------------

/// Rough grouping of [`ErrorCode`]s. None of them is fatal to a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The action does not fit the current phase or turn.
    ProtocolViolation,
    /// The room is missing or has no free slot.
    Capacity,
    /// A rematch handshake conflict. Retry once it resolves.
    Negotiation,
    /// Connection-level problems: bad frames, version, limits.
    Session,
}

/// Machine-readable reason sent back to the client whose action failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ErrorCode {
    RoomNotFound,
    RoomFull,
    AlreadyActive,
    NotReady,
    AlreadyStarted,
    WrongTurn,
    NotActive,
    AlreadyCalled,
    InvalidNumber,
    AlreadyPending,
    NotConcluded,
    NoPendingRequest,
    NotTheResponder,
    NotInRoom,
    AlreadyInRoom,
    Unavailable,
    VersionMismatch,
    BadRequest,
    ServerFull,
}

impl ErrorCode {
    pub fn category(self) -> ErrorCategory {
        match self {
            Self::AlreadyActive
            | Self::NotReady
            | Self::AlreadyStarted
            | Self::WrongTurn
            | Self::NotActive
            | Self::AlreadyCalled
            | Self::InvalidNumber
            | Self::NotInRoom
            | Self::AlreadyInRoom => ErrorCategory::ProtocolViolation,
            Self::RoomNotFound | Self::RoomFull | Self::Unavailable => ErrorCategory::Capacity,
            Self::AlreadyPending
            | Self::NotConcluded
            | Self::NoPendingRequest
            | Self::NotTheResponder => ErrorCategory::Negotiation,
            Self::VersionMismatch | Self::BadRequest | Self::ServerFull => ErrorCategory::Session,
        }
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Client → server. Internally tagged: `{ "type": "MarkNumber", "number": 7 }`.
///
/// Room actions never name a participant: the server attaches the id bound
/// to the connection the frame arrived on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Must be the first message on a connection.
    Hello { version: u32 },
    /// Keep-alive. Answered with `HeartbeatAck`, no room effect.
    Heartbeat { client_time: u64 },
    CreateGame {
        display_name: String,
        #[serde(default)]
        mode: GameMode,
    },
    JoinGame { room_id: RoomId, display_name: String },
    StartGame,
    MarkNumber { number: u8 },
    DeclareWin,
    RequestRematch,
    RespondRematch { accept: bool },
    LeaveGame,
    /// Cosmetic chat line, relayed verbatim to the room.
    SendMessage { text: String },
    /// Cosmetic emote code, relayed verbatim to the room.
    SendEmote { code: String },
    /// Polite goodbye; the server closes the connection.
    Disconnect { reason: String },
}

/// Server → client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Reply to `Hello`: the id this connection acts as.
    Welcome {
        participant_id: ParticipantId,
        server_time: u64,
    },
    HeartbeatAck { client_time: u64, server_time: u64 },
    /// Sent to the creator or joiner only, before the first snapshot.
    RoomJoined {
        room_id: RoomId,
        participant_id: ParticipantId,
    },
    /// Sent to a participant after their own leave was processed.
    RoomLeft { room_id: RoomId },
    /// Replace-not-merge room state.
    Snapshot(RoomSnapshot),
    Chat {
        from: ParticipantId,
        display_name: String,
        text: String,
    },
    Emote { from: ParticipantId, code: String },
    /// Number of participants connected to this server.
    Presence { online: usize },
    /// Only ever sent to the client whose action failed.
    Error { code: ErrorCode, message: String },
}

/// Frame wrapper for both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Per-direction counter kept by the sender.
    pub seq: u64,
    /// Milliseconds since the sender's connection started.
    pub timestamp: u64,
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn new(seq: u64, timestamp: u64, payload: T) -> Self {
        Self {
            seq,
            timestamp,
            payload,
        }
    }
}
