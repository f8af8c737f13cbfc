//! # Callboard
//!
//! Server-authoritative engine for a two-player "call a number, mark your
//! board" game on 5×5 boards.
//!
//! Clients connect over WebSocket, greet with `Hello`, then create or join
//! a room by its six-digit code. Every room runs as its own task; after
//! each accepted action every member receives the complete room snapshot.
//! A room can also be played against a simulated opponent.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use callboard::prelude::*;
//!
//! # async fn run() -> Result<(), CallboardError> {
//! let server = CallboardServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::CallboardError;
pub use server::{CallboardServer, CallboardServerBuilder};

pub mod prelude {
    pub use crate::{CallboardError, CallboardServer, CallboardServerBuilder, ServerConfig};
    pub use callboard_protocol::{
        ClientMessage, Envelope, ErrorCode, GameMode, OutcomeKind, ParticipantId, Phase, Role,
        RoomId, RoomSnapshot, ServerMessage, PROTOCOL_VERSION,
    };
    pub use callboard_room::RoomConfig;
    pub use callboard_session::SessionConfig;
}
