#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! End-to-end session scenarios.
//!
//! Each test drives a real `SessionClient` over the channel-backed mock
//! transport from `tests/common`, pushing server messages as the scenario
//! unfolds. Countdown timing runs on tokio's paused clock.

mod common;

use std::time::Duration;

use tictactoe_client::countdown::MIN_TICK_PERIOD;
use tictactoe_client::protocol::{Cell, CellIndex, ClientMessage, ServerMessage, Sign};
use tictactoe_client::state::SessionFlavor;
use tictactoe_client::{
    CloseCode, HighlightColor, Phase, SessionClient, SessionConfig, SessionError, SessionEvent,
    UiState, UserInputError,
};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

use common::{board_with, cells, mock_pair, next_event, next_view, rooms, view_where, MockServer};

// ════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════

fn start(config: SessionConfig) -> (SessionClient, mpsc::Receiver<SessionEvent>, MockServer) {
    let (transport, server) = mock_pair();
    let (client, events) = SessionClient::start(transport, config);
    (client, events, server)
}

/// Walk a fresh session into room 1 holding `sign`.
async fn enter_room(
    client: &SessionClient,
    events: &mut mpsc::Receiver<SessionEvent>,
    server: &mut MockServer,
    sign: Sign,
) {
    assert_eq!(server.next_sent().await, ClientMessage::GetOpenRooms);
    server.push(&rooms(&[]));
    view_where(events, |v| v.phase == Phase::RoomIdle).await;

    assert_ok!(client.create_room());
    assert_eq!(server.next_sent().await, ClientMessage::CreateRoom);
    server.push(&ServerMessage::CreateRoom { room_id: 1, sign });
    let view = view_where(events, |v| v.phase == Phase::RoomWaiting).await;
    assert_eq!(view.room_id, Some(1));
    assert_eq!(view.sign, Some(sign));
}

/// Announce round `round` and wait for the countdown to finish.
async fn play_round(
    events: &mut mpsc::Receiver<SessionEvent>,
    server: &MockServer,
    round: u32,
) {
    server.push(&ServerMessage::StartCountdown { round });
    let view = view_where(events, |v| v.phase == Phase::Playing).await;
    assert!(view.can_move);
    assert_eq!(view.round_number, Some(round));
}

/// Collect every event currently queued without waiting.
fn queued(events: &mut mpsc::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

// ════════════════════════════════════════════════════════════════════
// Lobby
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn connect_emits_connected_then_awaiting_rooms() {
    let (mut client, mut events, mut server) = start(SessionConfig::new());

    assert_eq!(next_event(&mut events).await, SessionEvent::Connected);
    let view = next_view(&mut events).await;
    assert_eq!(view.phase, Phase::AwaitingRooms);
    assert_eq!(view.ui_state, UiState::NotInRoom);
    assert_eq!(server.next_sent().await, ClientMessage::GetOpenRooms);
    assert!(client.is_connected());

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn rooms_update_replaces_the_list() {
    let (mut client, mut events, server) = start(SessionConfig::new());

    server.push(&rooms(&[]));
    let view = view_where(&mut events, |v| v.phase == Phase::RoomIdle).await;
    assert!(view.open_rooms.is_empty());

    server.push(&rooms(&[5, 7]));
    let view = next_view(&mut events).await;
    let ids: Vec<_> = view.open_rooms.iter().map(|r| r.room_id).collect();
    assert_eq!(ids, vec![5, 7]);
    assert_eq!(view.phase, Phase::RoomIdle);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn join_error_clears_selection_and_shows_reason() {
    let (mut client, mut events, mut server) = start(SessionConfig::new());
    assert_eq!(server.next_sent().await, ClientMessage::GetOpenRooms);
    server.push(&rooms(&[7]));
    view_where(&mut events, |v| v.phase == Phase::RoomIdle).await;

    assert_ok!(client.join_room(7));
    let view = next_view(&mut events).await;
    assert_eq!(view.room_input, Some(7));
    assert_eq!(
        server.next_sent().await,
        ClientMessage::JoinRoom { room_id: 7 }
    );

    server.push(&ServerMessage::JoinRoomError {
        message: "Room 7 is full.".into(),
    });
    let view = next_view(&mut events).await;
    assert_eq!(view.info_message.as_deref(), Some("Room 7 is full."));
    assert_eq!(view.room_input, None);
    assert_eq!(view.phase, Phase::RoomIdle);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn typed_room_id_is_validated_before_sending() {
    let config = SessionConfig::new().with_request_rooms_on_connect(false);
    let (mut client, mut events, mut server) = start(config);
    next_view(&mut events).await;

    for input in ["", "-1", "abc"] {
        assert_ok!(client.join_room_input(input));
        assert_eq!(
            next_event(&mut events).await,
            SessionEvent::InputRejected(UserInputError::InvalidRoomId {
                input: input.to_owned()
            })
        );
        let view = next_view(&mut events).await;
        assert_eq!(view.info_message.as_deref(), Some("Wrong room id!"));
    }

    assert_ok!(client.join_room_input("0"));
    assert_eq!(
        server.next_sent().await,
        ClientMessage::JoinRoom { room_id: 0 }
    );
    assert!(server.drain_sent().is_empty());

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Rooms and rounds
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn countdown_unlocks_moves_after_three_ticks() {
    let (mut client, mut events, mut server) = start(SessionConfig::new());
    enter_room(&client, &mut events, &mut server, Sign::X).await;

    server.push(&ServerMessage::StartCountdown { round: 1 });
    let view = next_view(&mut events).await;
    let started = Instant::now();
    assert_eq!(view.phase, Phase::CountingDown);
    assert_eq!(view.countdown, Some(3));
    assert!(!view.can_move);
    assert_eq!(view.ui_state, UiState::InRoom);

    assert_eq!(next_view(&mut events).await.countdown, Some(2));
    assert_eq!(next_view(&mut events).await.countdown, Some(1));
    let view = next_view(&mut events).await;
    assert_eq!(view.phase, Phase::Playing);
    assert_eq!(view.countdown, None);
    assert!(view.can_move);
    assert_eq!(started.elapsed(), Duration::from_secs(3));

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn zero_tick_period_still_reaches_playing() {
    let mut config = SessionConfig::new();
    config.tick_period = Duration::ZERO;
    let (mut client, mut events, mut server) = start(config);
    enter_room(&client, &mut events, &mut server, Sign::X).await;

    let started = Instant::now();
    play_round(&mut events, &server, 1).await;
    assert_eq!(client.phase().await, Phase::Playing);
    assert!(started.elapsed() >= MIN_TICK_PERIOD * 3);
    assert!(started.elapsed() < Duration::from_secs(1));

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn rounds_continue_past_the_displayed_limit() {
    let (mut client, mut events, mut server) = start(SessionConfig::new());
    enter_room(&client, &mut events, &mut server, Sign::X).await;
    play_round(&mut events, &server, 6).await;

    server.push(&ServerMessage::Draw);
    let view = view_where(&mut events, |v| v.phase == Phase::RoundResolved).await;
    assert_eq!(view.max_rounds, Some(6));

    play_round(&mut events, &server, 7).await;
    let view = client.view().await;
    assert_eq!(view.round_number, Some(7));
    assert!(view.board.is_blank());

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn move_is_sent_once_and_board_waits_for_server() {
    let (mut client, mut events, mut server) = start(SessionConfig::new());
    enter_room(&client, &mut events, &mut server, Sign::X).await;
    play_round(&mut events, &server, 1).await;
    server.push(&ServerMessage::UpdateBoard {
        board: board_with(&[(0, Cell::X)]),
    });
    let before = next_view(&mut events).await.board;

    assert_ok!(client.attempt_move(1));
    assert_eq!(
        server.next_sent().await,
        ClientMessage::Move {
            room_id: 1,
            sign: Sign::X,
            cell: CellIndex::new(1).unwrap(),
        }
    );
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(server.drain_sent().is_empty());
    assert_eq!(client.view().await.board, before);

    server.push(&ServerMessage::UpdateBoard {
        board: board_with(&[(0, Cell::X), (1, Cell::X)]),
    });
    let view = next_view(&mut events).await;
    assert_eq!(view.board.get(CellIndex::new(1).unwrap()), Cell::X);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn move_before_round_is_rejected_locally() {
    let (mut client, mut events, mut server) = start(SessionConfig::new());
    enter_room(&client, &mut events, &mut server, Sign::X).await;

    assert_ok!(client.attempt_move(4));
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::InputRejected(UserInputError::NotPlaying)
    );
    let view = next_view(&mut events).await;
    assert_eq!(
        view.info_message.as_deref(),
        Some("The round has not started yet.")
    );
    assert_ok!(client.attempt_move(9));
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::InputRejected(UserInputError::CellOutOfRange { cell: 9 })
    );
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(server.drain_sent().is_empty());

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn occupied_cell_is_rejected_locally() {
    let (mut client, mut events, mut server) = start(SessionConfig::new());
    enter_room(&client, &mut events, &mut server, Sign::X).await;
    play_round(&mut events, &server, 1).await;

    server.push(&ServerMessage::UpdateBoard {
        board: board_with(&[(4, Cell::O)]),
    });
    next_view(&mut events).await;

    assert_ok!(client.attempt_move(4));
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::InputRejected(UserInputError::CellOccupied {
            cell: CellIndex::new(4).unwrap()
        })
    );
    let view = next_view(&mut events).await;
    assert_eq!(
        view.info_message.as_deref(),
        Some("You can't move in this cell.")
    );
    assert!(server.drain_sent().is_empty());

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn alternating_turns_lock_moves_after_own_mark() {
    let config = SessionConfig::new().with_alternate_turns(true);
    let (mut client, mut events, mut server) = start(config);
    enter_room(&client, &mut events, &mut server, Sign::X).await;
    play_round(&mut events, &server, 1).await;

    server.push(&ServerMessage::UpdateBoard {
        board: board_with(&[(0, Cell::X)]),
    });
    assert!(!next_view(&mut events).await.can_move);

    assert_ok!(client.attempt_move(2));
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::InputRejected(UserInputError::NotYourTurn)
    );
    let view = next_view(&mut events).await;
    assert_eq!(view.info_message.as_deref(), Some("Wait for your turn."));

    server.push(&ServerMessage::UpdateBoard {
        board: board_with(&[(0, Cell::X), (4, Cell::O)]),
    });
    assert!(next_view(&mut events).await.can_move);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn lost_round_highlights_in_red() {
    let (mut client, mut events, mut server) = start(SessionConfig::new());
    enter_room(&client, &mut events, &mut server, Sign::X).await;
    play_round(&mut events, &server, 1).await;

    server.push(&ServerMessage::WinRound {
        sign: Sign::O,
        cells: cells(&[0, 4, 8]),
    });
    let view = next_view(&mut events).await;
    assert_eq!(view.phase, Phase::RoundResolved);
    assert_eq!(view.info_message.as_deref(), Some("You lose("));
    assert!(!view.can_move);
    let highlight = view.highlight.unwrap();
    assert_eq!(highlight.cells, cells(&[0, 4, 8]));
    assert_eq!(highlight.color, HighlightColor::Red);

    // The room stays open for the next round.
    play_round(&mut events, &server, 2).await;
    let view = client.view().await;
    assert!(view.highlight.is_none());
    assert!(view.board.is_blank());

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn single_game_ends_after_the_win() {
    let config = SessionConfig::new().with_flavor(SessionFlavor::SingleGame);
    let (mut client, mut events, mut server) = start(config);
    enter_room(&client, &mut events, &mut server, Sign::O).await;
    play_round(&mut events, &server, 1).await;

    server.push(&ServerMessage::Win {
        sign: Sign::O,
        cells: cells(&[2, 4, 6]),
    });
    let view = next_view(&mut events).await;
    assert_eq!(view.info_message.as_deref(), Some("You won!"));
    assert_eq!(view.highlight.unwrap().color, HighlightColor::Green);

    // A further round announcement is ignored and produces no view.
    server.push(&ServerMessage::StartCountdown { round: 2 });
    server.push(&ServerMessage::Denied {
        message: "The game is over.".into(),
    });
    let view = next_view(&mut events).await;
    assert_eq!(view.phase, Phase::RoundResolved);
    assert_eq!(view.round_number, Some(1));
    assert_eq!(view.info_message.as_deref(), Some("The game is over."));

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn opponent_leaving_returns_to_waiting() {
    let (mut client, mut events, mut server) = start(SessionConfig::new());
    enter_room(&client, &mut events, &mut server, Sign::X).await;
    play_round(&mut events, &server, 1).await;

    server.push(&ServerMessage::PlayerDisconnected);
    let view = next_view(&mut events).await;
    assert_eq!(view.phase, Phase::RoomWaiting);
    assert!(!view.can_move);
    assert!(view.board.is_blank());
    assert_eq!(view.room_id, Some(1));

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn creating_a_room_twice_is_rejected() {
    let (mut client, mut events, mut server) = start(SessionConfig::new());
    enter_room(&client, &mut events, &mut server, Sign::X).await;

    assert_ok!(client.create_room());
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::InputRejected(UserInputError::AlreadyInRoom)
    );

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Countdown generations
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn leaving_mid_countdown_never_unlocks_moves() {
    let (mut client, mut events, mut server) = start(SessionConfig::new());
    enter_room(&client, &mut events, &mut server, Sign::X).await;

    server.push(&ServerMessage::StartCountdown { round: 1 });
    view_where(&mut events, |v| v.countdown == Some(2)).await;

    assert_ok!(client.leave_room());
    assert_eq!(server.next_sent().await, ClientMessage::LeaveRoom);
    server.push(&ServerMessage::LeaveRoom);
    let view = view_where(&mut events, |v| v.phase == Phase::RoomIdle).await;
    assert_eq!(view.room_id, None);
    assert_eq!(view.countdown, None);

    tokio::time::sleep(Duration::from_secs(10)).await;
    for event in queued(&mut events) {
        if let SessionEvent::ViewChanged(view) = event {
            assert!(!view.can_move, "stale tick unlocked moves: {view:?}");
        }
    }
    let view = client.view().await;
    assert_eq!(view.phase, Phase::RoomIdle);
    assert!(!view.can_move);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn repeated_announcement_restarts_the_countdown() {
    let (mut client, mut events, mut server) = start(SessionConfig::new());
    enter_room(&client, &mut events, &mut server, Sign::X).await;

    server.push(&ServerMessage::StartCountdown { round: 1 });
    next_view(&mut events).await;
    tokio::time::sleep(Duration::from_millis(1500)).await;

    server.push(&ServerMessage::StartCountdown { round: 1 });
    let restarted = Instant::now();
    let view = view_where(&mut events, |v| v.countdown == Some(3)).await;
    assert_eq!(view.phase, Phase::CountingDown);

    let view = view_where(&mut events, |v| v.phase == Phase::Playing).await;
    assert!(view.can_move);
    assert!(restarted.elapsed() >= Duration::from_secs(3));

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Robustness and teardown
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn bad_frames_do_not_end_the_session() {
    let (mut client, mut events, server) = start(SessionConfig::new());

    server.push_raw("not json");
    server.push_raw(r#"{"type":"teleport","to":"mars"}"#);
    server.push_raw(r#"{"type":"create_room","room_id":"three"}"#);
    server.push_raw(r#"{"type":"update_board"}"#);
    server.push(&rooms(&[3]));

    let view = view_where(&mut events, |v| v.phase == Phase::RoomIdle).await;
    assert_eq!(view.open_rooms.len(), 1);
    assert!(client.is_connected());

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn close_code_4000_means_game_already_started() {
    let (client, mut events, server) = start(SessionConfig::new());
    next_view(&mut events).await;

    server.close(Some(4000));
    let view = next_view(&mut events).await;
    assert_eq!(view.phase, Phase::Disconnected);
    assert_eq!(
        view.info_message.as_deref(),
        Some("Game is already started.")
    );
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::Disconnected {
            reason: None,
            close_code: Some(CloseCode::GameInProgress),
        }
    );
    assert!(events.recv().await.is_none());
    assert!(!client.is_connected());
    assert!(matches!(
        assert_err!(client.create_room()),
        SessionError::NotConnected
    ));
}

#[tokio::test(start_paused = true)]
async fn close_mid_round_resets_everything() {
    let (client, mut events, mut server) = start(SessionConfig::new());
    enter_room(&client, &mut events, &mut server, Sign::X).await;
    server.push(&ServerMessage::StartCountdown { round: 1 });
    next_view(&mut events).await;

    server.close(None);
    let view = view_where(&mut events, |v| v.phase == Phase::Disconnected).await;
    assert_eq!(view.room_id, None);
    assert_eq!(view.countdown, None);
    assert!(!view.can_move);
    assert!(view.open_rooms.is_empty());
    assert_eq!(view.ui_state, UiState::NotInRoom);
    assert_eq!(
        view.info_message.as_deref(),
        Some(CloseCode::LOST_MESSAGE)
    );
    assert!(matches!(
        next_event(&mut events).await,
        SessionEvent::Disconnected {
            close_code: None,
            ..
        }
    ));

    // No tick survives the close.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(events.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn receive_error_disconnects_with_reason() {
    let (_client, mut events, server) = start(SessionConfig::new());
    next_view(&mut events).await;

    server.fail("connection reset");
    let event = loop {
        match next_event(&mut events).await {
            SessionEvent::ViewChanged(_) => continue,
            other => break other,
        }
    };
    let SessionEvent::Disconnected { reason, close_code } = event else {
        panic!("expected Disconnected, got {event:?}");
    };
    assert!(reason.unwrap().contains("connection reset"));
    assert_eq!(close_code, None);
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_the_transport() {
    let (mut client, mut events, server) = start(SessionConfig::new());
    next_view(&mut events).await;

    client.shutdown().await;
    assert!(server.was_closed());
    assert!(!client.is_connected());

    let event = loop {
        match next_event(&mut events).await {
            SessionEvent::ViewChanged(_) => continue,
            other => break other,
        }
    };
    assert_eq!(
        event,
        SessionEvent::Disconnected {
            reason: Some("client shut down".into()),
            close_code: None,
        }
    );
}
