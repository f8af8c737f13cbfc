//! Tracks live sessions and publishes the online count.
//!
//! `SessionManager` is a plain map; the server owns it behind a mutex.
//! Presence goes out through a `watch` channel, so a slow reader only ever
//! sees the latest count instead of a backlog.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;

use callboard_protocol::ParticipantId;
use tokio::sync::watch;

use crate::{Session, SessionConfig, SessionError};

/// Registry of connected participants.
pub struct SessionManager {
    sessions: HashMap<ParticipantId, Session>,
    config: SessionConfig,
    presence: watch::Sender<usize>,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        let (presence, _) = watch::channel(0);
        Self {
            sessions: HashMap::new(),
            config,
            presence,
        }
    }

    /// Opens a session for a freshly handshaken connection and assigns its
    /// participant id.
    ///
    /// # Errors
    /// [`SessionError::CapacityReached`] when `max_connections` sessions
    /// are already open.
    pub fn create(&mut self, peer: SocketAddr) -> Result<ParticipantId, SessionError> {
        if self.sessions.len() >= self.config.max_connections {
            return Err(SessionError::CapacityReached(self.config.max_connections));
        }

        let participant_id = ParticipantId::allocate();
        self.sessions.insert(
            participant_id,
            Session {
                participant_id,
                peer,
                connected_at: Instant::now(),
            },
        );
        self.publish();

        tracing::info!(%participant_id, %peer, online = self.sessions.len(), "session opened");
        Ok(participant_id)
    }

    /// Closes a session and returns its record.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if it was already closed.
    pub fn disconnect(&mut self, participant_id: ParticipantId) -> Result<Session, SessionError> {
        let session = self
            .sessions
            .remove(&participant_id)
            .ok_or(SessionError::NotFound(participant_id))?;
        self.publish();

        tracing::info!(
            %participant_id,
            connected_for = ?session.connected_at.elapsed(),
            online = self.sessions.len(),
            "session closed"
        );
        Ok(session)
    }

    pub fn get(&self, participant_id: ParticipantId) -> Option<&Session> {
        self.sessions.get(&participant_id)
    }

    pub fn online_count(&self) -> usize {
        self.sessions.len()
    }

    /// Subscribes to online-count changes. The receiver starts out holding
    /// the current count.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.presence.subscribe()
    }

    fn publish(&self) {
        // `send_replace` stores the value even while nobody is subscribed.
        self.presence.send_replace(self.sessions.len());
    }
}
