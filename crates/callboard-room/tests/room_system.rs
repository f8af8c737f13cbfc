//! Integration tests for the room system, driven through the registry.

use std::time::Duration;

use callboard_protocol::{GameMode, OutcomeKind, ParticipantId, Phase, Role, RoomId, RoomSnapshot};
use callboard_room::{
    ActionAck, PlayerSender, RoomAction, RoomConfig, RoomError, RoomHandle, RoomOutbound,
    SessionRegistry,
};
use tokio::sync::mpsc::{self, UnboundedReceiver};

fn pid(id: u64) -> ParticipantId {
    // Far above anything ParticipantId::allocate hands out in a test run.
    ParticipantId(1_000_000 + id)
}

fn channel() -> (PlayerSender, UnboundedReceiver<RoomOutbound>) {
    mpsc::unbounded_channel()
}

fn registry() -> SessionRegistry {
    SessionRegistry::new(RoomConfig {
        simulated_think_delay: Duration::from_millis(500),
        ..RoomConfig::default()
    })
}

/// Waits for the next snapshot, skipping chat and emotes.
async fn next_snapshot(rx: &mut UnboundedReceiver<RoomOutbound>) -> RoomSnapshot {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(60), rx.recv())
            .await
            .expect("timed out waiting for a snapshot")
            .expect("room closed the channel");
        if let RoomOutbound::Snapshot(s) = msg {
            return s;
        }
    }
}

/// The newest snapshot that has arrived, waiting for one if none has.
async fn latest_snapshot(rx: &mut UnboundedReceiver<RoomOutbound>) -> RoomSnapshot {
    let mut latest = next_snapshot(rx).await;
    while let Ok(msg) = rx.try_recv() {
        if let RoomOutbound::Snapshot(s) = msg {
            latest = s;
        }
    }
    latest
}

async fn human_pair(
    registry: &mut SessionRegistry,
) -> (RoomId, RoomHandle, UnboundedReceiver<RoomOutbound>, UnboundedReceiver<RoomOutbound>) {
    let (tx1, rx1) = channel();
    let (tx2, rx2) = channel();
    let room_id = registry
        .create_room(pid(1), "Ada", GameMode::HumanPair, tx1)
        .await
        .unwrap();
    registry.join_room(room_id, pid(2), "Bob", tx2).await.unwrap();
    let handle = registry.lookup(room_id).unwrap();
    (room_id, handle, rx1, rx2)
}

/// Calls the lowest uncalled number on each turn until some board shows a
/// line, then has that board's owner claim. Returns the final snapshot.
async fn play_to_conclusion(
    handle: &RoomHandle,
    rx: &mut UnboundedReceiver<RoomOutbound>,
) -> RoomSnapshot {
    loop {
        let snap = latest_snapshot(rx).await;
        if snap.phase == Phase::Concluded {
            return snap;
        }
        if let Some(board) = snap.boards.iter().find(|b| b.lines > 0) {
            let ack = handle.act(board.owner, RoomAction::DeclareWin).await.unwrap();
            assert_eq!(ack, ActionAck::Applied);
            continue;
        }
        let turn = snap.current_turn.expect("active game has a turn holder");
        let n = (1..=25).find(|n| !snap.is_called(*n)).expect("numbers left");
        handle.act(turn, RoomAction::MarkNumber(n)).await.unwrap();
    }
}

#[tokio::test]
async fn test_create_room_returns_unique_codes() {
    let mut registry = registry();
    let mut ids = Vec::new();
    for n in 0..20 {
        let (tx, _rx) = channel();
        let id = registry
            .create_room(pid(n), "host", GameMode::HumanPair, tx)
            .await
            .unwrap();
        assert!((100_000..1_000_000).contains(&id.0));
        assert_eq!(id.to_string().len(), 6);
        ids.push(id);
    }
    ids.sort_by_key(|id| id.0);
    ids.dedup();
    assert_eq!(ids.len(), 20);
    assert_eq!(registry.room_count(), 20);
}

#[tokio::test]
async fn test_creator_sees_lobby_snapshot() {
    let mut registry = registry();
    let (tx, mut rx) = channel();
    let room_id = registry
        .create_room(pid(1), "  Ada  ", GameMode::HumanPair, tx)
        .await
        .unwrap();

    let snap = next_snapshot(&mut rx).await;
    assert_eq!(snap.room_id, room_id);
    assert_eq!(snap.phase, Phase::Lobby);
    assert_eq!(snap.participants.len(), 1);
    assert_eq!(snap.participants[0].display_name, "Ada");
    assert_eq!(snap.participants[0].join_order, 1);
    assert!(snap.boards.is_empty());
}

#[tokio::test]
async fn test_join_errors() {
    let mut registry = registry();
    let (room_id, handle, _rx1, _rx2) = human_pair(&mut registry).await;

    let (tx, _rx) = channel();
    assert_eq!(
        registry.join_room(RoomId(1), pid(3), "Cy", tx.clone()).await,
        Err(RoomError::NotFound(RoomId(1)))
    );
    assert_eq!(
        registry.join_room(room_id, pid(3), "Cy", tx.clone()).await,
        Err(RoomError::RoomFull(room_id))
    );
    assert_eq!(
        registry.join_room(room_id, pid(2), "Bob", tx.clone()).await,
        Err(RoomError::AlreadyInRoom(pid(2), room_id))
    );
    assert_eq!(
        registry.create_room(pid(1), "Ada", GameMode::HumanPair, tx.clone()).await,
        Err(RoomError::AlreadyInRoom(pid(1), room_id))
    );

    handle.act(pid(1), RoomAction::StartGame).await.unwrap();
    registry.leave_room(pid(2)).await.unwrap();
    assert_eq!(
        registry.join_room(room_id, pid(3), "Cy", tx).await,
        Err(RoomError::AlreadyActive(room_id))
    );
}

#[tokio::test]
async fn test_start_needs_both_seats() {
    let mut registry = registry();
    let (tx1, _rx1) = channel();
    let room_id = registry
        .create_room(pid(1), "Ada", GameMode::HumanPair, tx1)
        .await
        .unwrap();
    let handle = registry.lookup(room_id).unwrap();
    assert_eq!(
        handle.act(pid(1), RoomAction::StartGame).await,
        Err(RoomError::NotReady(1))
    );

    let (tx2, mut rx2) = channel();
    registry.join_room(room_id, pid(2), "Bob", tx2).await.unwrap();
    handle.act(pid(2), RoomAction::StartGame).await.unwrap();

    let snap = latest_snapshot(&mut rx2).await;
    assert_eq!(snap.phase, Phase::Active);
    assert_eq!(snap.current_turn, Some(pid(1)));
    assert_eq!(snap.boards.len(), 2);
}

#[tokio::test]
async fn test_full_game_between_humans() {
    let mut registry = registry();
    let (_room_id, handle, mut rx1, mut rx2) = human_pair(&mut registry).await;
    handle.act(pid(1), RoomAction::StartGame).await.unwrap();

    let last = play_to_conclusion(&handle, &mut rx1).await;
    assert!(matches!(last.outcome.kind, OutcomeKind::Win | OutcomeKind::Draw));
    assert!(last.outcome.deciding_number.is_some());
    assert_eq!(last.current_turn, None);

    let seen_by_other = latest_snapshot(&mut rx2).await;
    assert_eq!(seen_by_other, last);

    let calls = &last.called_numbers;
    let mut distinct = calls.clone();
    distinct.sort_unstable();
    distinct.dedup();
    assert_eq!(distinct.len(), calls.len());
    assert!(calls.len() <= 25);
}

#[tokio::test]
async fn test_rematch_through_the_registry() {
    let mut registry = registry();
    let (_room_id, handle, mut rx1, _rx2) = human_pair(&mut registry).await;
    handle.act(pid(1), RoomAction::StartGame).await.unwrap();
    play_to_conclusion(&handle, &mut rx1).await;

    handle.act(pid(1), RoomAction::RequestRematch).await.unwrap();
    assert_eq!(
        handle.act(pid(1), RoomAction::RespondRematch { accept: true }).await,
        Err(RoomError::NotTheResponder)
    );
    handle.act(pid(2), RoomAction::RespondRematch { accept: false }).await.unwrap();
    assert_eq!(latest_snapshot(&mut rx1).await.phase, Phase::Concluded);

    handle.act(pid(1), RoomAction::RequestRematch).await.unwrap();
    handle.act(pid(2), RoomAction::RespondRematch { accept: true }).await.unwrap();
    let snap = latest_snapshot(&mut rx1).await;
    assert_eq!(snap.phase, Phase::Active);
    assert!(snap.called_numbers.is_empty());
    assert_eq!(snap.current_turn, Some(pid(1)));
}

#[tokio::test]
async fn test_disconnect_mid_game_abandons_then_last_leave_tears_down() {
    let mut registry = registry();
    let (room_id, handle, _rx1, mut rx2) = human_pair(&mut registry).await;
    handle.act(pid(1), RoomAction::StartGame).await.unwrap();
    handle.act(pid(1), RoomAction::MarkNumber(4)).await.unwrap();

    let (left, departure) = registry.leave_room(pid(1)).await.unwrap();
    assert_eq!(left, room_id);
    assert!(departure.abandoned);

    let snap = latest_snapshot(&mut rx2).await;
    assert_eq!(snap.phase, Phase::Concluded);
    assert_eq!(snap.outcome.kind, OutcomeKind::Abandoned);
    assert_eq!(snap.outcome.winner, None);
    assert!(registry.lookup(room_id).is_ok());

    registry.leave_room(pid(2)).await.unwrap();
    assert_eq!(registry.lookup(room_id).err(), Some(RoomError::NotFound(room_id)));
    assert_eq!(registry.room_count(), 0);
    assert_eq!(registry.room_of(pid(2)), None);
}

#[tokio::test]
async fn test_survivor_can_reopen_for_a_new_opponent() {
    let mut registry = registry();
    let (room_id, handle, _rx1, mut rx2) = human_pair(&mut registry).await;
    handle.act(pid(1), RoomAction::StartGame).await.unwrap();
    registry.leave_room(pid(1)).await.unwrap();

    handle.act(pid(2), RoomAction::RequestRematch).await.unwrap();
    assert_eq!(latest_snapshot(&mut rx2).await.phase, Phase::Lobby);

    let (tx3, _rx3) = channel();
    registry.join_room(room_id, pid(3), "Cy", tx3).await.unwrap();
    handle.act(pid(3), RoomAction::StartGame).await.unwrap();
    assert_eq!(latest_snapshot(&mut rx2).await.current_turn, Some(pid(2)));
}

#[tokio::test]
async fn test_leave_when_not_in_a_room() {
    let mut registry = registry();
    assert_eq!(
        registry.leave_room(pid(9)).await.err(),
        Some(RoomError::NotInRoom(pid(9)))
    );
    assert!(registry.handle_for(pid(9)).is_err());
}

// =========================================================================
// Simulated opponent
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_simulated_room_starts_immediately() {
    let mut registry = registry();
    let (tx, mut rx) = channel();
    registry
        .create_room(pid(1), "Ada", GameMode::VsSimulated, tx)
        .await
        .unwrap();

    let snap = latest_snapshot(&mut rx).await;
    assert_eq!(snap.phase, Phase::Active);
    assert_eq!(snap.participants.len(), 2);
    assert_eq!(snap.participants[1].role, Role::Simulated);
    assert_eq!(snap.participants[1].display_name, "Computer");
    assert_eq!(snap.current_turn, Some(pid(1)));
}

#[tokio::test(start_paused = true)]
async fn test_simulated_answers_after_thinking() {
    let mut registry = registry();
    let (tx, mut rx) = channel();
    registry
        .create_room(pid(1), "Ada", GameMode::VsSimulated, tx)
        .await
        .unwrap();
    let handle = registry.handle_for(pid(1)).unwrap();
    latest_snapshot(&mut rx).await;

    let before = tokio::time::Instant::now();
    handle.act(pid(1), RoomAction::MarkNumber(13)).await.unwrap();
    let mine = next_snapshot(&mut rx).await;
    let sim = mine.participants[1].id;
    assert_eq!(mine.current_turn, Some(sim));

    let reply = next_snapshot(&mut rx).await;
    assert!(before.elapsed() >= Duration::from_millis(500));
    assert_eq!(reply.called_numbers.len(), 2);
    assert_eq!(reply.called_numbers[0], 13);
    assert_ne!(reply.called_numbers[1], 13);
    assert_eq!(reply.current_turn, Some(pid(1)));
}

#[tokio::test(start_paused = true)]
async fn test_simulated_cannot_move_out_of_turn() {
    let mut registry = registry();
    let (tx, mut rx) = channel();
    registry
        .create_room(pid(1), "Ada", GameMode::VsSimulated, tx)
        .await
        .unwrap();
    latest_snapshot(&mut rx).await;

    // Nothing happens while the human holds the turn.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_game_against_simulated_then_rematch() {
    let mut registry = registry();
    let (tx, mut rx) = channel();
    registry
        .create_room(pid(1), "Ada", GameMode::VsSimulated, tx)
        .await
        .unwrap();
    let handle = registry.handle_for(pid(1)).unwrap();

    let last = loop {
        let snap = latest_snapshot(&mut rx).await;
        if snap.phase == Phase::Concluded {
            break snap;
        }
        if snap.board_of(pid(1)).is_some_and(|b| b.lines > 0) {
            let _ = handle.act(pid(1), RoomAction::DeclareWin).await;
        } else if snap.current_turn == Some(pid(1)) {
            let n = (1..=25).find(|n| !snap.is_called(*n)).unwrap();
            // The opponent may conclude the game first.
            let _ = handle.act(pid(1), RoomAction::MarkNumber(n)).await;
        }
    };
    assert!(last.outcome.is_decided());
    assert_ne!(last.outcome.kind, OutcomeKind::Abandoned);

    handle.act(pid(1), RoomAction::RequestRematch).await.unwrap();
    let rematch = loop {
        let snap = next_snapshot(&mut rx).await;
        if snap.phase == Phase::Active {
            break snap;
        }
    };
    assert!(rematch.called_numbers.is_empty());
    assert_eq!(rematch.outcome.kind, OutcomeKind::None);
    assert_eq!(rematch.current_turn, Some(pid(1)));
}

#[tokio::test(start_paused = true)]
async fn test_human_leaving_tears_down_simulated_room() {
    let mut registry = registry();
    let (tx, _rx) = channel();
    let room_id = registry
        .create_room(pid(1), "Ada", GameMode::VsSimulated, tx)
        .await
        .unwrap();

    let (_, departure) = registry.leave_room(pid(1)).await.unwrap();
    assert!(departure.abandoned);
    assert_eq!(departure.humans_remaining, 0);
    assert_eq!(registry.lookup(room_id).err(), Some(RoomError::NotFound(room_id)));
}
