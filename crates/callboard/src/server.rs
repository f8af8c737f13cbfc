//! `CallboardServer` builder and server loop.
//!
//! This is the entry point for running a Callboard server. It ties
//! together all the layers: transport → protocol → session → room.

use std::sync::Arc;
use std::time::Duration;

use callboard_protocol::{Codec, JsonCodec};
use callboard_room::{RoomConfig, SessionRegistry};
use callboard_session::{SessionConfig, SessionManager};
use callboard_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::{CallboardError, ServerConfig};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) rooms: Mutex<SessionRegistry>,
    pub(crate) codec: C,
    pub(crate) handshake_timeout: Duration,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a Callboard server.
///
/// # Example
///
/// ```rust,no_run
/// use callboard::prelude::*;
///
/// # async fn run() -> Result<(), CallboardError> {
/// let server = CallboardServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct CallboardServerBuilder {
    config: ServerConfig,
}

impl CallboardServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Starts from an existing configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.config.room = config;
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    /// Drops connections that stay silent this long.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Binds the listener. Uses `JsonCodec` over WebSocket.
    pub async fn build(self) -> Result<CallboardServer<JsonCodec>, CallboardError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionManager::new(self.config.session)),
            rooms: Mutex::new(SessionRegistry::new(self.config.room)),
            codec: JsonCodec,
            handshake_timeout: self.config.handshake_timeout,
            idle_timeout: self.config.idle_timeout,
        });

        Ok(CallboardServer { transport, state })
    }
}

impl Default for CallboardServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Callboard server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct CallboardServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl CallboardServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> CallboardServerBuilder {
        CallboardServerBuilder::new()
    }
}

impl<C: Codec> CallboardServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop, spawning a handler task per connection.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), CallboardError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "callboard server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
