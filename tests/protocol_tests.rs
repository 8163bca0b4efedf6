#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Wire format tests for the tic-tac-toe protocol.
//!
//! Fixtures are the JSON the room server actually produces and expects, so a
//! change to any serde attribute that breaks compatibility fails here.

use serde_json::{json, Value};
use tictactoe_client::codec::{decode, decode_slice, encode};
use tictactoe_client::protocol::{Board, Cell, CellIndex, ClientMessage, ServerMessage, Sign};
use tictactoe_client::DecodeError;

// ════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════

fn encoded(msg: &ClientMessage) -> Value {
    serde_json::from_str(&encode(msg).expect("encode")).expect("valid JSON")
}

fn decoded(value: Value) -> ServerMessage {
    decode(&value.to_string()).expect("decode")
}

fn cells(ids: &[u8]) -> Vec<CellIndex> {
    ids.iter().map(|&i| CellIndex::new(i).unwrap()).collect()
}

// ════════════════════════════════════════════════════════════════════
// ClientMessage fixtures
// ════════════════════════════════════════════════════════════════════

#[test]
fn get_open_rooms_wire_format() {
    assert_eq!(
        encoded(&ClientMessage::GetOpenRooms),
        json!({"type": "get_open_rooms"})
    );
}

#[test]
fn create_and_leave_room_wire_format() {
    assert_eq!(
        encoded(&ClientMessage::CreateRoom),
        json!({"type": "create_room"})
    );
    assert_eq!(
        encoded(&ClientMessage::LeaveRoom),
        json!({"type": "leave_room"})
    );
}

#[test]
fn join_room_wire_format() {
    assert_eq!(
        encoded(&ClientMessage::JoinRoom { room_id: 42 }),
        json!({"type": "join_room", "room_id": 42})
    );
}

#[test]
fn move_wire_format() {
    let msg = ClientMessage::Move {
        room_id: 3,
        sign: Sign::O,
        cell: CellIndex::new(8).unwrap(),
    };
    assert_eq!(
        encoded(&msg),
        json!({"type": "move", "room_id": 3, "sign": "o", "cell": 8})
    );
}

// ════════════════════════════════════════════════════════════════════
// ServerMessage fixtures
// ════════════════════════════════════════════════════════════════════

#[test]
fn update_open_rooms_fixture() {
    let msg = decoded(json!({"type": "update_open_rooms", "open_rooms": [1, 4, 9]}));
    assert_eq!(
        msg,
        ServerMessage::UpdateOpenRooms {
            open_rooms: vec![1, 4, 9]
        }
    );

    let msg = decoded(json!({"type": "update_open_rooms", "open_rooms": []}));
    assert_eq!(msg, ServerMessage::UpdateOpenRooms { open_rooms: vec![] });
}

#[test]
fn create_and_join_room_fixtures() {
    assert_eq!(
        decoded(json!({"type": "create_room", "room_id": 0, "sign": "x"})),
        ServerMessage::CreateRoom {
            room_id: 0,
            sign: Sign::X
        }
    );
    assert_eq!(
        decoded(json!({"type": "join_room", "room_id": 0, "sign": "o"})),
        ServerMessage::JoinRoom {
            room_id: 0,
            sign: Sign::O
        }
    );
}

#[test]
fn upper_case_signs_are_accepted() {
    assert_eq!(
        decoded(json!({"type": "join_room", "room_id": 2, "sign": "O"})),
        ServerMessage::JoinRoom {
            room_id: 2,
            sign: Sign::O
        }
    );
}

#[test]
fn join_room_error_fixtures() {
    for text in ["Room 12 does not exist.", "Room 12 is full."] {
        assert_eq!(
            decoded(json!({"type": "join_room_error", "message": text})),
            ServerMessage::JoinRoomError {
                message: text.into()
            }
        );
    }
}

#[test]
fn start_countdown_fixture() {
    assert_eq!(
        decoded(json!({"type": "start_countdown", "round": 4})),
        ServerMessage::StartCountdown { round: 4 }
    );
}

#[test]
fn update_board_fixture() {
    let msg = decoded(json!({
        "type": "update_board",
        "board": [["x", "*", "*"], ["*", "o", "*"], ["*", "*", "x"]]
    }));
    let expected = Board::from_rows([
        [Cell::X, Cell::Empty, Cell::Empty],
        [Cell::Empty, Cell::O, Cell::Empty],
        [Cell::Empty, Cell::Empty, Cell::X],
    ]);
    assert_eq!(msg, ServerMessage::UpdateBoard { board: expected });
}

#[test]
fn board_with_wrong_shape_is_malformed() {
    let text = json!({"type": "update_board", "board": [["x", "*"], ["*"]]}).to_string();
    assert!(matches!(decode(&text), Err(DecodeError::Malformed(_))));

    let text = json!({"type": "update_board", "board": [["x", "*", "q"], ["*", "*", "*"], ["*", "*", "*"]]})
        .to_string();
    assert!(matches!(decode(&text), Err(DecodeError::Malformed(_))));
}

#[test]
fn win_round_fixture() {
    assert_eq!(
        decoded(json!({"type": "win_round", "sign": "o", "cells": [0, 4, 8]})),
        ServerMessage::WinRound {
            sign: Sign::O,
            cells: cells(&[0, 4, 8])
        }
    );
}

#[test]
fn win_fixture_in_both_spellings() {
    let expected = ServerMessage::Win {
        sign: Sign::X,
        cells: cells(&[2, 4, 6]),
    };
    assert_eq!(
        decoded(json!({"type": "win", "sign": "x", "cells": [2, 4, 6]})),
        expected
    );
    assert_eq!(
        decoded(json!({"type": "win", "winner": "x", "cells": [2, 4, 6]})),
        expected
    );
}

#[test]
fn winning_cell_out_of_range_is_malformed() {
    let text = json!({"type": "win_round", "sign": "x", "cells": [0, 4, 9]}).to_string();
    assert!(matches!(decode(&text), Err(DecodeError::Malformed(_))));
}

#[test]
fn tag_only_fixtures() {
    assert_eq!(decoded(json!({"type": "draw"})), ServerMessage::Draw);
    assert_eq!(decoded(json!({"type": "leave_room"})), ServerMessage::LeaveRoom);
    assert_eq!(
        decoded(json!({"type": "player_disconnected"})),
        ServerMessage::PlayerDisconnected
    );
}

#[test]
fn denied_fixture_ignores_extra_fields() {
    let msg = decoded(json!({
        "type": "denied",
        "player": "o",
        "message": "Not your turn"
    }));
    assert_eq!(
        msg,
        ServerMessage::Denied {
            message: "Not your turn".into()
        }
    );
}

// ════════════════════════════════════════════════════════════════════
// Decode failures
// ════════════════════════════════════════════════════════════════════

#[test]
fn unknown_tag_names_the_tag() {
    let err = decode(r#"{"type":"chat","text":"hi"}"#).unwrap_err();
    assert_eq!(err, DecodeError::UnknownTag("chat".into()));
}

#[test]
fn garbage_is_malformed() {
    for text in ["", "null", "[]", "{}", r#"{"type":7}"#, "{\"type\":"] {
        assert!(
            matches!(decode(text), Err(DecodeError::Malformed(_))),
            "{text:?} should be malformed"
        );
    }
}

#[test]
fn slice_and_str_paths_agree() {
    let text = r#"{"type":"start_countdown","round":2}"#;
    assert_eq!(decode(text).unwrap(), decode_slice(text.as_bytes()).unwrap());
    assert!(decode_slice(&[0xFF, 0xFE]).is_err());
}

#[test]
fn every_listed_tag_decodes_from_a_minimal_fixture() {
    let fixtures = [
        json!({"type": "update_open_rooms", "open_rooms": []}),
        json!({"type": "create_room", "room_id": 1, "sign": "x"}),
        json!({"type": "join_room", "room_id": 1, "sign": "o"}),
        json!({"type": "join_room_error", "message": "m"}),
        json!({"type": "start_countdown", "round": 1}),
        json!({"type": "update_board", "board": [["*","*","*"],["*","*","*"],["*","*","*"]]}),
        json!({"type": "win_round", "sign": "x", "cells": []}),
        json!({"type": "win", "sign": "x", "cells": []}),
        json!({"type": "draw"}),
        json!({"type": "leave_room"}),
        json!({"type": "player_disconnected"}),
        json!({"type": "denied", "message": "m"}),
    ];
    assert_eq!(fixtures.len(), ServerMessage::TAGS.len());
    for (fixture, tag) in fixtures.into_iter().zip(ServerMessage::TAGS) {
        assert_eq!(decoded(fixture).tag(), *tag);
    }
}
