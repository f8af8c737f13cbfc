//! Server configuration.

use std::time::Duration;

use callboard_room::RoomConfig;
use callboard_session::SessionConfig;

/// Everything a [`CallboardServer`](crate::CallboardServer) needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// How long a new connection has to send `Hello`.
    pub handshake_timeout: Duration,

    /// A connection that sends nothing for this long is dropped and
    /// treated as a disconnect. Clients keep it open with `Heartbeat`.
    pub idle_timeout: Duration,

    pub room: RoomConfig,
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            handshake_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(30),
            room: RoomConfig::default(),
            session: SessionConfig::default(),
        }
    }
}
