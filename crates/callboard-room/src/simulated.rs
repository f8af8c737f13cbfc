//! The simulated participant.
//!
//! It sits in a room exactly like a connected client: it receives the
//! room's snapshots on an outbound channel and answers through
//! [`RoomHandle::act`], so every call it makes goes through the same
//! validation as a human's. On its turn it waits out a thinking delay,
//! then calls a random uncalled number. It claims a win as soon as its
//! board shows a line and accepts every rematch.

use std::time::Duration;

use callboard_protocol::{BOARD_CELLS, ParticipantId, Phase, RoomSnapshot};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use tokio::sync::mpsc;

use crate::config::seeded_rng;
use crate::{PlayerSender, RoomAction, RoomHandle, RoomOutbound};

/// What the simulated participant wants to do with a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Move {
    DeclareWin,
    AcceptRematch,
    CallNumber,
}

/// Starts a simulated participant for `id` in the room behind `handle`.
///
/// Returns the sender to register as its outbound channel. The task ends
/// when the room drops that sender. With a `seed` its picks repeat from
/// run to run.
pub fn spawn_simulated(
    handle: RoomHandle,
    id: ParticipantId,
    think_delay: Duration,
    seed: Option<u64>,
) -> PlayerSender {
    let (tx, rx) = mpsc::unbounded_channel();
    let player = SimulatedPlayer {
        id,
        handle,
        think_delay,
        inbox: rx,
        stashed: None,
        rng: seeded_rng(seed),
    };
    tokio::spawn(player.run());
    tx
}

struct SimulatedPlayer {
    id: ParticipantId,
    handle: RoomHandle,
    think_delay: Duration,
    inbox: mpsc::UnboundedReceiver<RoomOutbound>,
    /// A snapshot that arrived while thinking and has not been acted on.
    stashed: Option<RoomSnapshot>,
    rng: StdRng,
}

impl SimulatedPlayer {
    async fn run(mut self) {
        let room_id = self.handle.room_id();
        tracing::debug!(%room_id, participant_id = %self.id, "simulated participant started");

        while let Some(snapshot) = self.next_snapshot().await {
            let Some(next) = decide(self.id, &snapshot) else {
                continue;
            };
            let action = match next {
                Move::DeclareWin => RoomAction::DeclareWin,
                Move::AcceptRematch => RoomAction::RespondRematch { accept: true },
                Move::CallNumber => {
                    tokio::time::sleep(self.think_delay).await;
                    if let Some(newer) = self.drain() {
                        self.stashed = Some(newer);
                        continue;
                    }
                    match pick_uncalled(&snapshot, &mut self.rng) {
                        Some(number) => RoomAction::MarkNumber(number),
                        None => continue,
                    }
                }
            };
            if let Err(err) = self.handle.act(self.id, action).await {
                tracing::debug!(%room_id, participant_id = %self.id, %err, "simulated action refused");
            }
        }

        tracing::debug!(%room_id, participant_id = %self.id, "simulated participant stopped");
    }

    /// Waits for a snapshot, then skips ahead to the newest one queued.
    async fn next_snapshot(&mut self) -> Option<RoomSnapshot> {
        let mut latest = match self.stashed.take() {
            Some(s) => s,
            None => loop {
                if let RoomOutbound::Snapshot(s) = self.inbox.recv().await? {
                    break s;
                }
            },
        };
        if let Some(newer) = self.drain() {
            latest = newer;
        }
        Some(latest)
    }

    /// The newest snapshot already queued, if any.
    fn drain(&mut self) -> Option<RoomSnapshot> {
        let mut newest = None;
        while let Ok(msg) = self.inbox.try_recv() {
            if let RoomOutbound::Snapshot(s) = msg {
                newest = Some(s);
            }
        }
        newest
    }
}

fn decide(me: ParticipantId, snapshot: &RoomSnapshot) -> Option<Move> {
    match snapshot.phase {
        Phase::Active => {
            let has_line = snapshot.board_of(me).is_some_and(|b| b.lines > 0);
            if has_line {
                Some(Move::DeclareWin)
            } else if snapshot.current_turn == Some(me) {
                Some(Move::CallNumber)
            } else {
                None
            }
        }
        Phase::RematchPending => snapshot
            .pending_rematch
            .filter(|p| p.requester != me)
            .map(|_| Move::AcceptRematch),
        Phase::Lobby | Phase::Concluded => None,
    }
}

/// A uniformly random number nobody has called yet.
fn pick_uncalled(snapshot: &RoomSnapshot, rng: &mut impl Rng) -> Option<u8> {
    let open: Vec<u8> = (1..=BOARD_CELLS as u8)
        .filter(|n| !snapshot.is_called(*n))
        .collect();
    open.choose(rng).copied()
}
