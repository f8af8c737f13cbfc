//! The room state machine: lobby gating, turn arbitration and win
//! confirmation.
//!
//! [`Room`] is plain data with synchronous methods. It never awaits and
//! never sends anything; the actor in [`crate::actor`] owns one, applies
//! commands to it one at a time and broadcasts [`Room::snapshot`] after
//! every change. Every method either mutates and bumps `seq`, or returns
//! an error without touching state.

use callboard_protocol::{
    BoardView, Outcome, ParticipantId, ParticipantView, PendingRematch, Phase, RoomId,
    RoomSnapshot,
};
use rand::rngs::StdRng;

use crate::board::{Board, CalledSet, first_line_at, is_valid_number};
use crate::config::seeded_rng;
use crate::{Participant, RoomError};

/// Seats per room.
pub const MAX_PARTICIPANTS: usize = 2;

/// What a departure did to the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Departure {
    /// The game was in progress and has been concluded with no winner.
    pub abandoned: bool,
    /// Humans still seated. At zero the room should be torn down.
    pub humans_remaining: usize,
}

/// Result of a `declareWin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinClaim {
    /// The claim held and the game is over.
    Accepted(Outcome),
    /// The claimant has no complete line, or no game is running. Nothing
    /// changed.
    Rejected,
}

pub struct Room {
    pub(crate) id: RoomId,
    pub(crate) participants: Vec<Participant>,
    pub(crate) boards: Vec<Board>,
    pub(crate) called: Vec<u8>,
    pub(crate) called_set: CalledSet,
    pub(crate) current_turn: Option<ParticipantId>,
    pub(crate) phase: Phase,
    pub(crate) outcome: Outcome,
    pub(crate) pending_rematch: Option<PendingRematch>,
    pub(crate) seq: u64,
    rng: StdRng,
}

impl Room {
    /// An empty lobby. Pass a seed to make board deals reproducible.
    pub fn new(id: RoomId, seed: Option<u64>) -> Self {
        let rng = seeded_rng(seed);
        Self {
            id,
            participants: Vec::with_capacity(MAX_PARTICIPANTS),
            boards: Vec::new(),
            called: Vec::new(),
            called_set: CalledSet::default(),
            current_turn: None,
            phase: Phase::Lobby,
            outcome: Outcome::default(),
            pending_rematch: None,
            seq: 0,
            rng,
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn current_turn(&self) -> Option<ParticipantId> {
        self.current_turn
    }

    pub fn called_numbers(&self) -> &[u8] {
        &self.called
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.participants.iter().any(|p| p.id == id)
    }

    pub fn humans(&self) -> usize {
        self.participants.iter().filter(|p| p.is_human()).count()
    }

    pub fn board_of(&self, owner: ParticipantId) -> Option<&Board> {
        self.boards.iter().find(|b| b.owner() == owner)
    }

    /// Seats a participant in the next free slot.
    pub fn add_participant(&mut self, mut participant: Participant) -> Result<(), RoomError> {
        if self.contains(participant.id) {
            return Err(RoomError::AlreadyInRoom(participant.id, self.id));
        }
        if self.participants.len() >= MAX_PARTICIPANTS {
            return Err(RoomError::RoomFull(self.id));
        }
        if !self.phase.is_joinable() {
            return Err(RoomError::AlreadyActive(self.id));
        }

        participant.join_order = self.participants.len() as u32 + 1;
        self.participants.push(participant);
        self.bump();
        Ok(())
    }

    /// Unseats a participant. Leaving mid-game concludes it as abandoned;
    /// leaving while a rematch is pending withdraws the request.
    pub fn remove_participant(&mut self, id: ParticipantId) -> Result<Departure, RoomError> {
        let index = self
            .participants
            .iter()
            .position(|p| p.id == id)
            .ok_or(RoomError::NotInRoom(id))?;
        self.participants.remove(index);
        self.boards.retain(|b| b.owner() != id);
        for (slot, p) in self.participants.iter_mut().enumerate() {
            p.join_order = slot as u32 + 1;
        }

        let abandoned = self.phase == Phase::Active;
        match self.phase {
            Phase::Active => {
                self.phase = Phase::Concluded;
                self.outcome = Outcome::abandoned();
                self.current_turn = None;
            }
            Phase::RematchPending => {
                self.phase = Phase::Concluded;
                self.pending_rematch = None;
            }
            Phase::Lobby | Phase::Concluded => {}
        }
        self.bump();

        Ok(Departure {
            abandoned,
            humans_remaining: self.humans(),
        })
    }

    /// Deals fresh boards and hands the first turn to participant 1.
    pub fn start_game(&mut self, requester: ParticipantId) -> Result<(), RoomError> {
        if !self.contains(requester) {
            return Err(RoomError::NotInRoom(requester));
        }
        if self.phase != Phase::Lobby {
            return Err(RoomError::AlreadyStarted);
        }
        if self.participants.len() != MAX_PARTICIPANTS {
            return Err(RoomError::NotReady(self.participants.len()));
        }

        self.deal();
        self.bump();
        Ok(())
    }

    /// Calls `number` for the turn holder and passes the turn.
    pub fn mark_number(&mut self, caller: ParticipantId, number: u8) -> Result<(), RoomError> {
        if !self.contains(caller) {
            return Err(RoomError::NotInRoom(caller));
        }
        if self.phase != Phase::Active {
            return Err(RoomError::NotActive(self.phase));
        }
        match self.current_turn {
            Some(holder) if holder == caller => {}
            Some(holder) => return Err(RoomError::WrongTurn(holder)),
            None => return Err(RoomError::NotActive(self.phase)),
        }
        if !is_valid_number(number) {
            return Err(RoomError::InvalidNumber(number));
        }
        if !self.called_set.insert(number) {
            return Err(RoomError::AlreadyCalled(number));
        }

        self.called.push(number);
        self.current_turn = self.other_than(caller);
        self.bump();
        Ok(())
    }

    /// Confirms a win claim against the current called set.
    ///
    /// When the claim holds, every board is evaluated against the same
    /// set. If more than one has a line the game is a draw, decided by the
    /// call after which all of them had one.
    pub fn declare_win(&mut self, claimant: ParticipantId) -> Result<WinClaim, RoomError> {
        if !self.contains(claimant) {
            return Err(RoomError::NotInRoom(claimant));
        }
        if self.phase != Phase::Active {
            return Ok(WinClaim::Rejected);
        }
        let Some(claimant_at) = self
            .board_of(claimant)
            .and_then(|b| first_line_at(b.cells(), &self.called))
        else {
            return Ok(WinClaim::Rejected);
        };

        let completed: Vec<(ParticipantId, usize)> = self
            .boards
            .iter()
            .filter_map(|b| first_line_at(b.cells(), &self.called).map(|at| (b.owner(), at)))
            .collect();

        let outcome = if completed.len() > 1 {
            let last = completed.iter().map(|(_, at)| *at).max().unwrap_or(claimant_at);
            Outcome::draw(self.called[last])
        } else {
            if let Some(p) = self.participants.iter_mut().find(|p| p.id == claimant) {
                p.wins += 1;
            }
            Outcome::win(claimant, self.called[claimant_at])
        };

        self.phase = Phase::Concluded;
        self.outcome = outcome;
        self.current_turn = None;
        self.bump();
        Ok(WinClaim::Accepted(outcome))
    }

    /// The full state as every member sees it.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.id,
            seq: self.seq,
            phase: self.phase,
            participants: self
                .participants
                .iter()
                .map(|p| ParticipantView {
                    id: p.id,
                    display_name: p.display_name.clone(),
                    role: p.role,
                    join_order: p.join_order,
                    wins: p.wins,
                })
                .collect(),
            called_numbers: self.called.clone(),
            current_turn: self.current_turn,
            outcome: self.outcome,
            pending_rematch: self.pending_rematch,
            boards: self
                .boards
                .iter()
                .map(|b| BoardView {
                    owner: b.owner(),
                    cells: *b.cells(),
                    marked_mask: b.marked_mask(&self.called_set),
                    lines: b.lines(&self.called_set),
                })
                .collect(),
        }
    }

    /// Fresh boards, no calls, no outcome, participant 1 to move.
    pub(crate) fn deal(&mut self) {
        self.boards = self
            .participants
            .iter()
            .map(|p| Board::shuffled(p.id, &mut self.rng))
            .collect();
        self.called.clear();
        self.called_set = CalledSet::default();
        self.outcome = Outcome::default();
        self.pending_rematch = None;
        self.current_turn = self.participants.first().map(|p| p.id);
        self.phase = Phase::Active;
    }

    /// Back to an empty lobby table, keeping whoever is seated.
    pub(crate) fn reopen(&mut self) {
        self.boards.clear();
        self.called.clear();
        self.called_set = CalledSet::default();
        self.outcome = Outcome::default();
        self.pending_rematch = None;
        self.current_turn = None;
        self.phase = Phase::Lobby;
    }

    pub(crate) fn bump(&mut self) {
        self.seq += 1;
    }

    fn other_than(&self, id: ParticipantId) -> Option<ParticipantId> {
        self.participants.iter().map(|p| p.id).find(|&p| p != id)
    }

    /// Replaces the dealt boards with fixed layouts, in seat order.
    #[cfg(test)]
    pub(crate) fn rig_boards(&mut self, layouts: [[u8; callboard_protocol::BOARD_CELLS]; 2]) {
        self.boards = self
            .participants
            .iter()
            .zip(layouts)
            .map(|(p, cells)| Board::from_cells(p.id, cells).expect("valid layout"))
            .collect();
    }
}
