//! Room actor: an isolated Tokio task that owns one [`Room`].
//!
//! The outside world reaches a room only through its [`RoomHandle`], which
//! pushes commands onto a bounded mpsc queue. The actor applies them one at
//! a time, so two actions against the same room never interleave, and after
//! every accepted change it pushes the new snapshot to each member's
//! outbound channel.

use std::collections::HashMap;

use callboard_protocol::{ParticipantId, RoomId, RoomSnapshot};
use tokio::sync::{mpsc, oneshot};

use crate::room::{Departure, WinClaim};
use crate::{Participant, RematchRequest, Room, RoomConfig, RoomError};

/// Longest chat line relayed, in characters.
pub const MAX_CHAT_CHARS: usize = 280;

/// Longest emote code relayed, in characters.
pub const MAX_EMOTE_CHARS: usize = 16;

/// Something a member asks the room to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomAction {
    StartGame,
    MarkNumber(u8),
    DeclareWin,
    RequestRematch,
    RespondRematch { accept: bool },
    /// Relayed to every member; no state change.
    Chat(String),
    /// Relayed to every member; no state change.
    Emote(String),
}

/// How the room took an action that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionAck {
    /// State changed and a snapshot went out.
    Applied,
    /// A win claim that did not hold. Nothing changed and nothing was sent.
    WinRejected,
    /// A chat line or emote was passed on.
    Relayed,
}

/// A message from the room actor to one member's connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomOutbound {
    /// To the new member only, ahead of the snapshot that shows them seated.
    Joined {
        room_id: RoomId,
        participant_id: ParticipantId,
    },
    /// To the departing member only. Nothing from this room follows it.
    Left { room_id: RoomId },
    Snapshot(RoomSnapshot),
    Chat {
        from: ParticipantId,
        display_name: String,
        text: String,
    },
    Emote {
        from: ParticipantId,
        code: String,
    },
}

/// Channel sender for delivering outbound messages to a member.
pub type PlayerSender = mpsc::UnboundedSender<RoomOutbound>;

pub(crate) enum RoomCommand {
    Join {
        participant: Participant,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Leave {
        participant_id: ParticipantId,
        reply: oneshot::Sender<Result<Departure, RoomError>>,
    },
    Act {
        sender: ParticipantId,
        action: RoomAction,
        reply: oneshot::Sender<Result<ActionAck, RoomError>>,
    },
    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
    Shutdown,
}

/// Handle to a running room actor.
///
/// Cheap to clone. The registry keeps one per room; the simulated
/// participant keeps its own so it can act like any other member.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Applies an action on behalf of `sender` and waits for the verdict.
    pub async fn act(
        &self,
        sender: ParticipantId,
        action: RoomAction,
    ) -> Result<ActionAck, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Act {
            sender,
            action,
            reply,
        })
        .await?;
        rx.await.map_err(|_| RoomError::Unavailable(self.room_id))?
    }

    /// The current state, without changing anything.
    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| RoomError::Unavailable(self.room_id))
    }

    /// Stops the actor. Members' outbound channels close once it exits.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown).await
    }

    pub(crate) async fn join(
        &self,
        participant: Participant,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Join {
            participant,
            sender,
            reply,
        })
        .await?;
        rx.await.map_err(|_| RoomError::Unavailable(self.room_id))?
    }

    pub(crate) async fn leave(&self, participant_id: ParticipantId) -> Result<Departure, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Leave {
            participant_id,
            reply,
        })
        .await?;
        rx.await.map_err(|_| RoomError::Unavailable(self.room_id))?
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }
}

struct RoomActor {
    room: Room,
    senders: HashMap<ParticipantId, PlayerSender>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        let room_id = self.room.id();
        tracing::info!(%room_id, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    participant,
                    sender,
                    reply,
                } => {
                    let _ = reply.send(self.handle_join(participant, sender));
                }
                RoomCommand::Leave {
                    participant_id,
                    reply,
                } => {
                    let _ = reply.send(self.handle_leave(participant_id));
                }
                RoomCommand::Act {
                    sender,
                    action,
                    reply,
                } => {
                    let result = self.handle_action(sender, action);
                    if let Err(err) = &result {
                        tracing::debug!(%room_id, participant_id = %sender, %err, "action refused");
                    }
                    let _ = reply.send(result);
                }
                RoomCommand::Snapshot { reply } => {
                    let _ = reply.send(self.room.snapshot());
                }
                RoomCommand::Shutdown => {
                    tracing::info!(%room_id, "room shutting down");
                    break;
                }
            }
        }

        tracing::info!(%room_id, "room actor stopped");
    }

    fn handle_join(
        &mut self,
        participant: Participant,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        let participant_id = participant.id;
        let role = participant.role;
        self.room.add_participant(participant)?;
        let _ = sender.send(RoomOutbound::Joined {
            room_id: self.room.id(),
            participant_id,
        });
        self.senders.insert(participant_id, sender);
        tracing::info!(
            room_id = %self.room.id(),
            %participant_id,
            ?role,
            participants = self.room.participants().len(),
            "participant joined"
        );
        self.broadcast_snapshot();
        Ok(())
    }

    fn handle_leave(&mut self, participant_id: ParticipantId) -> Result<Departure, RoomError> {
        let departure = self.room.remove_participant(participant_id)?;
        if let Some(sender) = self.senders.remove(&participant_id) {
            let _ = sender.send(RoomOutbound::Left {
                room_id: self.room.id(),
            });
        }
        tracing::info!(
            room_id = %self.room.id(),
            %participant_id,
            abandoned = departure.abandoned,
            humans_remaining = departure.humans_remaining,
            "participant left"
        );
        self.broadcast_snapshot();
        Ok(departure)
    }

    fn handle_action(
        &mut self,
        sender: ParticipantId,
        action: RoomAction,
    ) -> Result<ActionAck, RoomError> {
        let room_id = self.room.id();
        match action {
            RoomAction::StartGame => {
                self.room.start_game(sender)?;
                tracing::info!(%room_id, participant_id = %sender, "game started");
            }
            RoomAction::MarkNumber(number) => {
                self.room.mark_number(sender, number)?;
                tracing::debug!(%room_id, participant_id = %sender, number, "number called");
            }
            RoomAction::DeclareWin => match self.room.declare_win(sender)? {
                WinClaim::Accepted(outcome) => {
                    tracing::info!(
                        %room_id,
                        participant_id = %sender,
                        kind = ?outcome.kind,
                        deciding_number = ?outcome.deciding_number,
                        "game concluded"
                    );
                }
                WinClaim::Rejected => {
                    tracing::debug!(%room_id, participant_id = %sender, "win claim rejected");
                    return Ok(ActionAck::WinRejected);
                }
            },
            RoomAction::RequestRematch => {
                if self.room.request_rematch(sender)? == RematchRequest::Reopened {
                    tracing::info!(%room_id, participant_id = %sender, "room reopened as lobby");
                } else {
                    tracing::info!(%room_id, participant_id = %sender, "rematch requested");
                }
            }
            RoomAction::RespondRematch { accept } => {
                self.room.respond_rematch(sender, accept)?;
                tracing::info!(%room_id, participant_id = %sender, accept, "rematch answered");
            }
            RoomAction::Chat(text) => {
                let display_name = self.member_name(sender)?;
                self.broadcast(RoomOutbound::Chat {
                    from: sender,
                    display_name,
                    text: text.chars().take(MAX_CHAT_CHARS).collect(),
                });
                return Ok(ActionAck::Relayed);
            }
            RoomAction::Emote(code) => {
                self.member_name(sender)?;
                self.broadcast(RoomOutbound::Emote {
                    from: sender,
                    code: code.chars().take(MAX_EMOTE_CHARS).collect(),
                });
                return Ok(ActionAck::Relayed);
            }
        }
        self.broadcast_snapshot();
        Ok(ActionAck::Applied)
    }

    fn member_name(&self, id: ParticipantId) -> Result<String, RoomError> {
        self.room
            .participants()
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.display_name.clone())
            .ok_or(RoomError::NotInRoom(id))
    }

    fn broadcast_snapshot(&self) {
        self.broadcast(RoomOutbound::Snapshot(self.room.snapshot()));
    }

    /// Sends to every member. A closed channel means the member's
    /// connection is going away; its leave will arrive separately.
    fn broadcast(&self, msg: RoomOutbound) {
        for sender in self.senders.values() {
            let _ = sender.send(msg.clone());
        }
    }
}

/// Spawns a room actor task and returns a handle to it.
pub(crate) fn spawn_room(room_id: RoomId, config: &RoomConfig) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.command_buffer);
    let actor = RoomActor {
        room: Room::new(room_id, config.seed),
        senders: HashMap::new(),
        receiver: rx,
    };
    tokio::spawn(actor.run());
    RoomHandle {
        room_id,
        sender: tx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callboard_protocol::Phase;
    use tokio::sync::mpsc::UnboundedReceiver;

    const P1: ParticipantId = ParticipantId(1);
    const P2: ParticipantId = ParticipantId(2);

    async fn seated() -> (RoomHandle, UnboundedReceiver<RoomOutbound>, UnboundedReceiver<RoomOutbound>) {
        let handle = spawn_room(RoomId(42), &RoomConfig::default());
        let (tx1, rx1) = mpsc::unbounded_channel();
        let (tx2, rx2) = mpsc::unbounded_channel();
        handle.join(Participant::human(P1, "Ada"), tx1).await.unwrap();
        handle.join(Participant::human(P2, "Bob"), tx2).await.unwrap();
        (handle, rx1, rx2)
    }

    fn latest_snapshot(rx: &mut UnboundedReceiver<RoomOutbound>) -> Option<RoomSnapshot> {
        let mut latest = None;
        while let Ok(msg) = rx.try_recv() {
            if let RoomOutbound::Snapshot(s) = msg {
                latest = Some(s);
            }
        }
        latest
    }

    #[tokio::test]
    async fn test_every_member_gets_the_same_snapshot() {
        let (handle, mut rx1, mut rx2) = seated().await;
        handle.act(P1, RoomAction::StartGame).await.unwrap();
        handle.act(P1, RoomAction::MarkNumber(13)).await.unwrap();

        let a = latest_snapshot(&mut rx1).unwrap();
        let b = latest_snapshot(&mut rx2).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.phase, Phase::Active);
        assert_eq!(a.called_numbers, vec![13]);
        assert_eq!(a.current_turn, Some(P2));
    }

    #[tokio::test]
    async fn test_refused_action_broadcasts_nothing() {
        let (handle, mut rx1, mut rx2) = seated().await;
        latest_snapshot(&mut rx1);
        latest_snapshot(&mut rx2);

        let err = handle.act(P2, RoomAction::MarkNumber(1)).await.unwrap_err();
        assert_eq!(err, RoomError::NotActive(Phase::Lobby));
        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_rejected_claim_is_quiet() {
        let (handle, mut rx1, _rx2) = seated().await;
        handle.act(P1, RoomAction::StartGame).await.unwrap();
        latest_snapshot(&mut rx1);

        let ack = handle.act(P1, RoomAction::DeclareWin).await.unwrap();
        assert_eq!(ack, ActionAck::WinRejected);
        assert!(rx1.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_chat_is_relayed_and_capped() {
        let (handle, mut rx1, mut rx2) = seated().await;
        latest_snapshot(&mut rx1);
        latest_snapshot(&mut rx2);

        let long = "a".repeat(500);
        let ack = handle.act(P1, RoomAction::Chat(long)).await.unwrap();
        assert_eq!(ack, ActionAck::Relayed);

        match rx2.try_recv().unwrap() {
            RoomOutbound::Chat { from, display_name, text } => {
                assert_eq!(from, P1);
                assert_eq!(display_name, "Ada");
                assert_eq!(text.len(), MAX_CHAT_CHARS);
            }
            other => panic!("expected chat, got {other:?}"),
        }
        assert!(matches!(rx1.try_recv().unwrap(), RoomOutbound::Chat { .. }));

        handle.act(P2, RoomAction::Emote("wave".into())).await.unwrap();
        assert_eq!(
            rx1.try_recv().unwrap(),
            RoomOutbound::Emote { from: P2, code: "wave".into() }
        );
    }

    #[tokio::test]
    async fn test_leave_mid_game_notifies_the_other_member() {
        let (handle, _rx1, mut rx2) = seated().await;
        handle.act(P1, RoomAction::StartGame).await.unwrap();

        let departure = handle.leave(P1).await.unwrap();
        assert!(departure.abandoned);

        let snap = latest_snapshot(&mut rx2).unwrap();
        assert_eq!(snap.phase, Phase::Concluded);
        assert_eq!(snap.participants.len(), 1);
        assert_eq!(snap.current_turn, None);
    }

    #[tokio::test]
    async fn test_join_notice_precedes_first_snapshot() {
        let handle = spawn_room(RoomId(7), &RoomConfig::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        handle.join(Participant::human(P1, "Ada"), tx).await.unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            RoomOutbound::Joined { room_id: RoomId(7), participant_id: P1 }
        );
        assert!(matches!(rx.try_recv().unwrap(), RoomOutbound::Snapshot(_)));

        handle.leave(P1).await.unwrap();
        assert_eq!(rx.try_recv().unwrap(), RoomOutbound::Left { room_id: RoomId(7) });
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_snapshot_query_does_not_bump_seq() {
        let (handle, _rx1, _rx2) = seated().await;
        let a = handle.snapshot().await.unwrap();
        let b = handle.snapshot().await.unwrap();
        assert_eq!(a.seq, b.seq);
    }

    #[tokio::test]
    async fn test_shutdown_closes_member_channels() {
        let (handle, mut rx1, _rx2) = seated().await;
        handle.shutdown().await.unwrap();

        while rx1.recv().await.is_some() {}
        assert_eq!(
            handle.snapshot().await.unwrap_err(),
            RoomError::Unavailable(RoomId(42))
        );
    }
}
