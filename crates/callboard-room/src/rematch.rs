//! Rematch negotiation.
//!
//! A concluded room moves to `RematchPending` when one side asks to play
//! again. The other side either accepts, which deals a fresh game straight
//! into `Active`, or declines, which drops back to `Concluded` so the
//! requester may ask again.
//!
//! If the opponent has already left, there is nobody to answer: the
//! request instead reopens the room as a lobby so someone new can join.

use callboard_protocol::{ParticipantId, PendingRematch, Phase};

use crate::room::MAX_PARTICIPANTS;
use crate::{Room, RoomError};

/// What a rematch request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RematchRequest {
    /// Waiting on the other participant.
    Pending,
    /// Alone in the room; it is a lobby again.
    Reopened,
}

impl Room {
    pub fn request_rematch(
        &mut self,
        requester: ParticipantId,
    ) -> Result<RematchRequest, RoomError> {
        if !self.contains(requester) {
            return Err(RoomError::NotInRoom(requester));
        }
        match self.phase {
            Phase::RematchPending => return Err(RoomError::AlreadyPending),
            Phase::Concluded => {}
            phase => return Err(RoomError::NotConcluded(phase)),
        }

        if self.participants.len() < MAX_PARTICIPANTS {
            self.reopen();
            self.bump();
            return Ok(RematchRequest::Reopened);
        }

        self.bump();
        self.pending_rematch = Some(PendingRematch {
            requester,
            requested_at_seq: self.seq,
        });
        self.phase = Phase::RematchPending;
        Ok(RematchRequest::Pending)
    }

    pub fn respond_rematch(
        &mut self,
        responder: ParticipantId,
        accept: bool,
    ) -> Result<(), RoomError> {
        if !self.contains(responder) {
            return Err(RoomError::NotInRoom(responder));
        }
        let pending = match (self.phase, self.pending_rematch) {
            (Phase::RematchPending, Some(pending)) => pending,
            _ => return Err(RoomError::NoPendingRequest),
        };
        if pending.requester == responder {
            return Err(RoomError::NotTheResponder);
        }

        if accept {
            self.deal();
        } else {
            self.pending_rematch = None;
            self.phase = Phase::Concluded;
        }
        self.bump();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::tests::{P1, P2, concluded, started};
    use crate::Participant;
    use callboard_protocol::{Outcome, OutcomeKind};

    #[test]
    fn test_decline_then_request_again() {
        let mut room = concluded();

        assert_eq!(room.request_rematch(P1), Ok(RematchRequest::Pending));
        assert_eq!(room.phase(), Phase::RematchPending);
        assert_eq!(room.snapshot().pending_rematch.map(|p| p.requester), Some(P1));

        room.respond_rematch(P2, false).unwrap();
        assert_eq!(room.phase(), Phase::Concluded);
        assert!(room.snapshot().pending_rematch.is_none());
        assert_eq!(room.outcome(), Outcome::win(P1, 5));

        assert_eq!(room.request_rematch(P1), Ok(RematchRequest::Pending));
    }

    #[test]
    fn test_accept_deals_straight_into_play() {
        let mut room = concluded();
        room.request_rematch(P2).unwrap();
        room.respond_rematch(P1, true).unwrap();

        let snap = room.snapshot();
        assert_eq!(snap.phase, Phase::Active);
        assert_eq!(snap.outcome.kind, OutcomeKind::None);
        assert!(snap.called_numbers.is_empty());
        assert!(snap.pending_rematch.is_none());
        assert_eq!(snap.current_turn, Some(P1));
        assert_eq!(snap.boards.len(), 2);
        assert!(snap.boards.iter().all(|b| b.lines == 0));
        // Wins carry over.
        assert_eq!(snap.participant(P1).map(|p| p.wins), Some(1));
    }

    #[test]
    fn test_request_errors() {
        let mut room = started();
        assert_eq!(
            room.request_rematch(P1),
            Err(RoomError::NotConcluded(Phase::Active))
        );

        let mut room = concluded();
        room.request_rematch(P1).unwrap();
        assert_eq!(room.request_rematch(P2), Err(RoomError::AlreadyPending));
        assert_eq!(room.request_rematch(P1), Err(RoomError::AlreadyPending));
    }

    #[test]
    fn test_respond_errors() {
        let mut room = concluded();
        assert_eq!(room.respond_rematch(P2, true), Err(RoomError::NoPendingRequest));

        room.request_rematch(P1).unwrap();
        let seq = room.seq();
        assert_eq!(room.respond_rematch(P1, true), Err(RoomError::NotTheResponder));
        assert_eq!(room.seq(), seq);
        assert_eq!(room.phase(), Phase::RematchPending);
    }

    #[test]
    fn test_requester_leaving_withdraws_request() {
        let mut room = concluded();
        room.request_rematch(P1).unwrap();
        room.remove_participant(P1).unwrap();

        assert_eq!(room.phase(), Phase::Concluded);
        assert_eq!(room.respond_rematch(P2, true), Err(RoomError::NoPendingRequest));
    }

    #[test]
    fn test_alone_after_abandonment_reopens_lobby() {
        let mut room = started();
        room.remove_participant(P1).unwrap();
        assert_eq!(room.outcome().kind, OutcomeKind::Abandoned);

        assert_eq!(room.request_rematch(P2), Ok(RematchRequest::Reopened));
        assert_eq!(room.phase(), Phase::Lobby);
        assert_eq!(room.outcome().kind, OutcomeKind::None);
        assert!(room.snapshot().boards.is_empty());

        let newcomer = ParticipantId(3);
        room.add_participant(Participant::human(newcomer, "Cy")).unwrap();
        room.start_game(newcomer).unwrap();
        assert_eq!(room.current_turn(), Some(P2));
    }
}
