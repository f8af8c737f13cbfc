//! Rooms for Callboard: the board evaluator, the per-room state machine,
//! rematch negotiation, the room actor, the simulated opponent and the
//! registry that ties them together.
//!
//! # Key types
//!
//! - [`SessionRegistry`]: creates/destroys rooms, maps participants to rooms
//! - [`RoomHandle`]: send actions to a running room actor
//! - [`Room`]: the synchronous state machine each actor owns
//! - [`Board`] and [`count_lines`]: pure line evaluation
//! - [`RoomConfig`]: thinking delay, queue size, seeding

mod actor;
mod board;
mod config;
mod error;
mod participant;
mod registry;
mod rematch;
mod room;
mod simulated;

pub use actor::{
    ActionAck, MAX_CHAT_CHARS, MAX_EMOTE_CHARS, PlayerSender, RoomAction, RoomHandle,
    RoomOutbound,
};
pub use board::{Board, CalledSet, LINES, MAX_NUMBER, count_lines, first_line_at, is_valid_number};
pub use config::RoomConfig;
pub use error::RoomError;
pub use participant::{MAX_NAME_CHARS, Participant, sanitize_name};
pub use registry::SessionRegistry;
pub use rematch::RematchRequest;
pub use room::{Departure, MAX_PARTICIPANTS, Room, WinClaim};
pub use simulated::spawn_simulated;
