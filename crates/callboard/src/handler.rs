//! Per-connection handler: handshake, outbound writer, and message
//! routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive `Hello` → validate version
//!   2. Open a session → send `Welcome` with the assigned participant id
//!   3. Spawn the writer, which owns everything going to the client
//!   4. Loop: receive envelopes → dispatch to the registry or the room

use std::sync::Arc;
use std::time::Instant;

use callboard_protocol::{
    ClientMessage, Codec, Envelope, ErrorCode, ParticipantId, ProtocolError, ServerMessage,
    PROTOCOL_VERSION,
};
use callboard_room::{PlayerSender, RoomAction, RoomError, RoomOutbound};
use callboard_transport::{Connection, TransportError, WebSocketConnection};
use tokio::sync::{mpsc, watch};

use crate::server::ServerState;
use crate::CallboardError;

/// Takes the participant out of their room and closes their session when
/// the handler exits, however it exits.
///
/// `Drop` is synchronous, so the cleanup runs as a fire-and-forget task.
struct SessionGuard<C: Codec> {
    participant_id: ParticipantId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for SessionGuard<C> {
    fn drop(&mut self) {
        let participant_id = self.participant_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let left = state.rooms.lock().await.leave_room(participant_id).await;
            if let Ok((room_id, departure)) = left {
                tracing::info!(
                    %room_id,
                    %participant_id,
                    abandoned = departure.abandoned,
                    "participant dropped from room"
                );
            }
            let _ = state.sessions.lock().await.disconnect(participant_id);
        });
    }
}

/// Whether the read loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

/// What the read side needs to answer a client.
struct Client<'a, C: Codec> {
    participant_id: ParticipantId,
    state: &'a ServerState<C>,
    /// Replies that go only to this client, in order.
    direct: mpsc::UnboundedSender<ServerMessage>,
    /// Handed to every room this client enters.
    room_tx: PlayerSender,
    start: Instant,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), CallboardError> {
    let conn_id = conn.id();
    let start = Instant::now();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    // --- Step 1: Handshake ---
    if let Err(e) = perform_handshake(&conn, &state, &start).await {
        let _ = conn.close().await;
        return Err(e);
    }

    // --- Step 2: Session ---
    let created = state.sessions.lock().await.create(conn.peer_addr());
    let participant_id = match created {
        Ok(id) => id,
        Err(e) => {
            let err = CallboardError::from(e);
            send_now(&conn, &state.codec, &start, error_message(ErrorCode::ServerFull, &err)).await?;
            let _ = conn.close().await;
            return Err(err);
        }
    };
    let _guard = SessionGuard {
        participant_id,
        state: Arc::clone(&state),
    };
    tracing::info!(%conn_id, %participant_id, "participant connected");

    // --- Step 3: Writer ---
    let (direct_tx, direct_rx) = mpsc::unbounded_channel();
    let (room_tx, room_rx) = mpsc::unbounded_channel();
    let presence = state.sessions.lock().await.subscribe();

    let _ = direct_tx.send(ServerMessage::Welcome {
        participant_id,
        server_time: millis_since(&start),
    });
    let _ = direct_tx.send(ServerMessage::Presence {
        online: *presence.borrow(),
    });
    let writer = tokio::spawn(write_loop(
        conn.clone(),
        Arc::clone(&state),
        start,
        direct_rx,
        room_rx,
        presence,
    ));

    // --- Step 4: Read loop ---
    let client = Client {
        participant_id,
        state: &state,
        direct: direct_tx,
        room_tx,
        start,
    };
    let result = read_loop(&conn, &client).await;

    // Closing the direct channel lets the writer flush and stop.
    drop(client);
    let _ = writer.await;
    let _ = conn.close().await;

    // _guard drops here → room leave and session disconnect fire.
    result
}

/// Receives `Hello`, checks the version. Replies with an error frame on
/// anything else.
async fn perform_handshake<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    start: &Instant,
) -> Result<(), CallboardError> {
    let data = match tokio::time::timeout(state.handshake_timeout, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage("connection closed before Hello".into()).into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let version = match state.codec.decode::<Envelope<ClientMessage>>(&data) {
        Ok(Envelope {
            payload: ClientMessage::Hello { version },
            ..
        }) => version,
        Ok(_) | Err(_) => {
            let err = CallboardError::from(ProtocolError::InvalidMessage(
                "first message must be Hello".into(),
            ));
            send_now(conn, &state.codec, start, error_message(ErrorCode::BadRequest, &err)).await?;
            return Err(err);
        }
    };

    if version != PROTOCOL_VERSION {
        let err = CallboardError::from(ProtocolError::InvalidMessage(format!(
            "version mismatch: expected {PROTOCOL_VERSION}, got {version}"
        )));
        send_now(conn, &state.codec, start, error_message(ErrorCode::VersionMismatch, &err)).await?;
        return Err(err);
    }
    Ok(())
}

async fn read_loop<C: Codec>(
    conn: &WebSocketConnection,
    client: &Client<'_, C>,
) -> Result<(), CallboardError> {
    let participant_id = client.participant_id;

    loop {
        let data = match tokio::time::timeout(client.state.idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%participant_id, "connection closed cleanly");
                return Ok(());
            }
            Ok(Err(TransportError::FrameTooLarge(len))) => {
                client.send(ServerMessage::Error {
                    code: ErrorCode::BadRequest,
                    message: format!("frame of {len} bytes is too large"),
                });
                continue;
            }
            Ok(Err(e)) => {
                tracing::debug!(%participant_id, error = %e, "recv error");
                return Err(e.into());
            }
            Err(_) => {
                tracing::info!(%participant_id, "connection idle, closing");
                return Ok(());
            }
        };

        let envelope: Envelope<ClientMessage> = match client.state.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%participant_id, error = %e, "failed to decode envelope");
                client.send(ServerMessage::Error {
                    code: ErrorCode::BadRequest,
                    message: e.to_string(),
                });
                continue;
            }
        };

        if client.dispatch(envelope.payload).await == Flow::Close {
            return Ok(());
        }
    }
}

impl<C: Codec> Client<'_, C> {
    async fn dispatch(&self, msg: ClientMessage) -> Flow {
        let participant_id = self.participant_id;
        match msg {
            ClientMessage::Hello { .. } => {
                self.send(ServerMessage::Error {
                    code: ErrorCode::BadRequest,
                    message: "already greeted".into(),
                });
            }
            ClientMessage::Heartbeat { client_time } => {
                self.send(ServerMessage::HeartbeatAck {
                    client_time,
                    server_time: millis_since(&self.start),
                });
            }
            // Confirmations for create, join and leave come from the room
            // itself, ordered with its snapshots; only failures are sent here.
            ClientMessage::CreateGame { display_name, mode } => {
                let created = self
                    .state
                    .rooms
                    .lock()
                    .await
                    .create_room(participant_id, &display_name, mode, self.room_tx.clone())
                    .await;
                if let Err(e) = created {
                    self.reject(e);
                }
            }
            ClientMessage::JoinGame {
                room_id,
                display_name,
            } => {
                let joined = self
                    .state
                    .rooms
                    .lock()
                    .await
                    .join_room(room_id, participant_id, &display_name, self.room_tx.clone())
                    .await;
                if let Err(e) = joined {
                    self.reject(e);
                }
            }
            ClientMessage::LeaveGame => {
                let left = self.state.rooms.lock().await.leave_room(participant_id).await;
                if let Err(e) = left {
                    self.reject(e);
                }
            }
            ClientMessage::StartGame => self.act(RoomAction::StartGame).await,
            ClientMessage::MarkNumber { number } => self.act(RoomAction::MarkNumber(number)).await,
            ClientMessage::DeclareWin => self.act(RoomAction::DeclareWin).await,
            ClientMessage::RequestRematch => self.act(RoomAction::RequestRematch).await,
            ClientMessage::RespondRematch { accept } => {
                self.act(RoomAction::RespondRematch { accept }).await
            }
            ClientMessage::SendMessage { text } => self.act(RoomAction::Chat(text)).await,
            ClientMessage::SendEmote { code } => self.act(RoomAction::Emote(code)).await,
            ClientMessage::Disconnect { reason } => {
                tracing::info!(%participant_id, %reason, "client disconnected");
                return Flow::Close;
            }
        }
        Flow::Continue
    }

    /// Forwards an in-room action. The registry lock is released before
    /// the room is contacted.
    async fn act(&self, action: RoomAction) {
        let handle = self.state.rooms.lock().await.handle_for(self.participant_id);
        let result = match handle {
            Ok(handle) => handle.act(self.participant_id, action).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            self.reject(e);
        }
    }

    fn reject(&self, err: RoomError) {
        tracing::debug!(participant_id = %self.participant_id, error = %err, "action rejected");
        self.send(ServerMessage::Error {
            code: err.code(),
            message: err.to_string(),
        });
    }

    /// Queues a message for the writer. Dropped if the writer is gone.
    fn send(&self, msg: ServerMessage) {
        let _ = self.direct.send(msg);
    }
}

/// Owns the outbound half of the connection: direct replies, room
/// broadcasts and presence changes, each wrapped in an envelope.
async fn write_loop<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
    start: Instant,
    mut direct: mpsc::UnboundedReceiver<ServerMessage>,
    mut room: mpsc::UnboundedReceiver<RoomOutbound>,
    mut presence: watch::Receiver<usize>,
) {
    let mut seq: u64 = 1;

    loop {
        let msg = tokio::select! {
            biased;
            msg = direct.recv() => match msg {
                Some(msg) => msg,
                None => break,
            },
            Some(out) = room.recv() => room_message(out),
            Ok(()) = presence.changed() => {
                let online = *presence.borrow_and_update();
                ServerMessage::Presence { online }
            }
        };

        let envelope = Envelope::new(next_seq(&mut seq), millis_since(&start), msg);
        let bytes = match state.codec.encode(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(conn_id = %conn.id(), error = %e, "failed to encode outbound message");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "send failed, writer stopping");
            break;
        }
    }
}

fn room_message(out: RoomOutbound) -> ServerMessage {
    match out {
        RoomOutbound::Joined {
            room_id,
            participant_id,
        } => ServerMessage::RoomJoined {
            room_id,
            participant_id,
        },
        RoomOutbound::Left { room_id } => ServerMessage::RoomLeft { room_id },
        RoomOutbound::Snapshot(snapshot) => ServerMessage::Snapshot(snapshot),
        RoomOutbound::Chat {
            from,
            display_name,
            text,
        } => ServerMessage::Chat {
            from,
            display_name,
            text,
        },
        RoomOutbound::Emote { from, code } => ServerMessage::Emote { from, code },
    }
}

fn error_message(code: ErrorCode, err: &CallboardError) -> ServerMessage {
    ServerMessage::Error {
        code,
        message: err.to_string(),
    }
}

/// Sends one envelope straight to the socket, before the writer exists.
async fn send_now(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    start: &Instant,
    msg: ServerMessage,
) -> Result<(), CallboardError> {
    let envelope = Envelope::new(0, millis_since(start), msg);
    let bytes = codec.encode(&envelope)?;
    conn.send(&bytes).await?;
    Ok(())
}

fn millis_since(start: &Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}
