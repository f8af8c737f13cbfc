//! Wire protocol for Callboard.
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`RoomSnapshot`], ...)
//!   are the structures that cross the network.
//! - **Codec** ([`Codec`], [`JsonCodec`]) turns them into bytes.
//! - **Errors** ([`ProtocolError`]) cover what can go wrong doing that.
//!
//! ```text
//! Transport (frames) → Protocol (Envelope) → Session / Room
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    BOARD_CELLS, BoardView, ClientMessage, Envelope, ErrorCategory, ErrorCode, GameMode, Outcome,
    OutcomeKind, ParticipantId, ParticipantView, PendingRematch, Phase, Role, RoomId,
    RoomSnapshot, ServerMessage,
};

/// Clients must open with `Hello { version: PROTOCOL_VERSION }`.
pub const PROTOCOL_VERSION: u32 = 1;
