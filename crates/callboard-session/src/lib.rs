//! Connection sessions for Callboard.
//!
//! Every accepted connection gets a session, and with it the
//! [`ParticipantId`](callboard_protocol::ParticipantId) it acts as for its
//! whole lifetime. The [`SessionManager`] also publishes the number of
//! connected participants so each connection can show a live "online" count.
//!
//! ```text
//! Room Layer (above)     ← acts on behalf of a ParticipantId
//!     ↕
//! Session Layer (here)   ← who is connected, how many
//!     ↕
//! Protocol Layer (below) ← ParticipantId
//! ```

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{Session, SessionConfig};
