//! Session registry: creates, tracks, and tears down rooms, and knows
//! which room each participant is in.

use std::collections::HashMap;

use callboard_protocol::{GameMode, ParticipantId, RoomId};
use rand::Rng;

use crate::actor::spawn_room;
use crate::room::Departure;
use crate::simulated::spawn_simulated;
use crate::{Participant, PlayerSender, RoomAction, RoomConfig, RoomError, RoomHandle};

/// Room codes are six digits with no leading zero.
const ROOM_CODES: std::ops::Range<u32> = 100_000..1_000_000;

/// Every live room, plus the participant → room index.
///
/// The server keeps this behind a mutex. Lifecycle calls (create, join,
/// leave) run under that lock so they serialize against each other and
/// against lookups; in-game actions only borrow a [`RoomHandle`] and talk
/// to the room after the lock is released.
pub struct SessionRegistry {
    rooms: HashMap<RoomId, RoomHandle>,

    /// A human is in at most one room at a time. Simulated participants
    /// are not indexed; they live and die with their room.
    participant_rooms: HashMap<ParticipantId, RoomId>,

    config: RoomConfig,
}

impl SessionRegistry {
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            participant_rooms: HashMap::new(),
            config,
        }
    }

    /// Opens a room with `creator` in seat 1.
    ///
    /// For [`GameMode::VsSimulated`] a simulated opponent takes seat 2 and
    /// the game starts right away.
    pub async fn create_room(
        &mut self,
        creator: ParticipantId,
        display_name: &str,
        mode: GameMode,
        sender: PlayerSender,
    ) -> Result<RoomId, RoomError> {
        self.ensure_free(creator)?;

        let room_id = self.fresh_room_id();
        let handle = spawn_room(room_id, &self.config);
        self.rooms.insert(room_id, handle.clone());
        tracing::info!(%room_id, %creator, ?mode, "room created");

        if let Err(err) = self.seat_creator(&handle, creator, display_name, mode, sender).await {
            self.destroy_room(room_id).await;
            return Err(err);
        }
        self.participant_rooms.insert(creator, room_id);
        Ok(room_id)
    }

    async fn seat_creator(
        &self,
        handle: &RoomHandle,
        creator: ParticipantId,
        display_name: &str,
        mode: GameMode,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        handle.join(Participant::human(creator, display_name), sender).await?;

        if mode == GameMode::VsSimulated {
            let sim_id = ParticipantId::allocate();
            let sim_sender = spawn_simulated(
                handle.clone(),
                sim_id,
                self.config.simulated_think_delay,
                self.config.seed,
            );
            handle
                .join(Participant::simulated(sim_id, &self.config.simulated_name), sim_sender)
                .await?;
            handle.act(creator, RoomAction::StartGame).await?;
        }
        Ok(())
    }

    /// Seats `joiner` in an existing room.
    pub async fn join_room(
        &mut self,
        room_id: RoomId,
        joiner: ParticipantId,
        display_name: &str,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        self.ensure_free(joiner)?;
        let handle = self.rooms.get(&room_id).ok_or(RoomError::NotFound(room_id))?;
        handle.join(Participant::human(joiner, display_name), sender).await?;
        self.participant_rooms.insert(joiner, room_id);
        Ok(())
    }

    /// Takes a participant out of their room. The room is torn down once
    /// no human is left in it.
    pub async fn leave_room(
        &mut self,
        participant_id: ParticipantId,
    ) -> Result<(RoomId, Departure), RoomError> {
        let room_id = self
            .participant_rooms
            .remove(&participant_id)
            .ok_or(RoomError::NotInRoom(participant_id))?;
        let handle = self.rooms.get(&room_id).ok_or(RoomError::NotFound(room_id))?;

        let departure = match handle.leave(participant_id).await {
            Ok(departure) => departure,
            Err(err) => {
                tracing::warn!(%room_id, %participant_id, %err, "leave failed, dropping room");
                self.destroy_room(room_id).await;
                return Err(err);
            }
        };

        if departure.humans_remaining == 0 {
            self.destroy_room(room_id).await;
        }
        Ok((room_id, departure))
    }

    /// Shuts a room down and forgets everyone in it.
    pub async fn destroy_room(&mut self, room_id: RoomId) {
        let Some(handle) = self.rooms.remove(&room_id) else {
            return;
        };
        let _ = handle.shutdown().await;
        self.participant_rooms.retain(|_, rid| *rid != room_id);
        tracing::info!(%room_id, "room destroyed");
    }

    pub fn lookup(&self, room_id: RoomId) -> Result<RoomHandle, RoomError> {
        self.rooms.get(&room_id).cloned().ok_or(RoomError::NotFound(room_id))
    }

    /// The handle for the room `participant_id` is in.
    pub fn handle_for(&self, participant_id: ParticipantId) -> Result<RoomHandle, RoomError> {
        let room_id = self.room_of(participant_id).ok_or(RoomError::NotInRoom(participant_id))?;
        self.lookup(room_id)
    }

    pub fn room_of(&self, participant_id: ParticipantId) -> Option<RoomId> {
        self.participant_rooms.get(&participant_id).copied()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn ensure_free(&self, participant_id: ParticipantId) -> Result<(), RoomError> {
        match self.room_of(participant_id) {
            Some(current) => Err(RoomError::AlreadyInRoom(participant_id, current)),
            None => Ok(()),
        }
    }

    /// A random code not in use; collisions are simply redrawn.
    fn fresh_room_id(&self) -> RoomId {
        let mut rng = rand::rng();
        loop {
            let candidate = RoomId(rng.random_range(ROOM_CODES));
            if !self.rooms.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}
