//! Wire-compatible protocol types for the tic-tac-toe room server.
//!
//! Every message is a JSON object with a `type` discriminator and flat
//! fields, e.g. `{"type":"create_room","room_id":3,"sign":"x"}`. Key wire
//! conventions:
//!
//! - Signs are lowercase `"x"` / `"o"`; upper case is accepted on input.
//! - Empty cells are `"*"`.
//! - Boards are three rows of three cells, row-major.
//! - Cell indices `0..=8` map to `(row = i / 3, col = i % 3)`.
//!
//! Both unions derive `Serialize` and `Deserialize`, so the same contract can
//! be used from the server side and in tests.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::UserInputError;

// ── Type aliases ────────────────────────────────────────────────────

/// Identifier of a room, allocated by the server.
pub type RoomId = u64;

// ── Enums ───────────────────────────────────────────────────────────

/// A player's mark for the duration of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sign {
    /// Assigned to the room creator.
    #[serde(rename = "x", alias = "X")]
    X,
    /// Assigned to the player who joins.
    #[serde(rename = "o", alias = "O")]
    O,
}

impl Sign {
    /// Returns the other sign.
    pub fn opponent(self) -> Self {
        match self {
            Sign::X => Sign::O,
            Sign::O => Sign::X,
        }
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sign::X => f.write_str("x"),
            Sign::O => f.write_str("o"),
        }
    }
}

/// Contents of one board square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    #[serde(rename = "*")]
    Empty,
    #[serde(rename = "x", alias = "X")]
    X,
    #[serde(rename = "o", alias = "O")]
    O,
}

impl Cell {
    /// The sign occupying this cell, if any.
    pub fn sign(self) -> Option<Sign> {
        match self {
            Cell::Empty => None,
            Cell::X => Some(Sign::X),
            Cell::O => Some(Sign::O),
        }
    }

    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }
}

impl From<Sign> for Cell {
    fn from(sign: Sign) -> Self {
        match sign {
            Sign::X => Cell::X,
            Sign::O => Cell::O,
        }
    }
}

// ── Board ───────────────────────────────────────────────────────────

/// Index of a board square, guaranteed to be in `0..=8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct CellIndex(u8);

impl CellIndex {
    /// Number of squares on the board.
    pub const COUNT: u8 = 9;

    /// Validate a raw index.
    ///
    /// # Errors
    ///
    /// Returns [`UserInputError::CellOutOfRange`] for indices above 8.
    pub fn new(index: u8) -> Result<Self, UserInputError> {
        if index < Self::COUNT {
            Ok(Self(index))
        } else {
            Err(UserInputError::CellOutOfRange { cell: index })
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn row(self) -> usize {
        usize::from(self.0 / 3)
    }

    pub fn col(self) -> usize {
        usize::from(self.0 % 3)
    }

    /// All nine indices in row-major order.
    pub fn all() -> impl Iterator<Item = CellIndex> {
        (0..Self::COUNT).map(CellIndex)
    }
}

impl TryFrom<u8> for CellIndex {
    type Error = UserInputError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::new(index)
    }
}

impl From<CellIndex> for u8 {
    fn from(index: CellIndex) -> Self {
        index.0
    }
}

impl fmt::Display for CellIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 3x3 board snapshot as pushed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board([[Cell; 3]; 3]);

impl Board {
    /// A board with every square empty.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a board from three rows.
    pub fn from_rows(rows: [[Cell; 3]; 3]) -> Self {
        Self(rows)
    }

    pub fn rows(&self) -> &[[Cell; 3]; 3] {
        &self.0
    }

    /// The cell at `index`.
    pub fn get(&self, index: CellIndex) -> Cell {
        self.0
            .get(index.row())
            .and_then(|row| row.get(index.col()))
            .copied()
            .unwrap_or_default()
    }

    /// Set the cell at `index`. Only used to build fixtures and server-side
    /// snapshots; the client never marks its own board.
    pub fn set(&mut self, index: CellIndex, cell: Cell) {
        if let Some(slot) = self
            .0
            .get_mut(index.row())
            .and_then(|row| row.get_mut(index.col()))
        {
            *slot = cell;
        }
    }

    pub fn is_empty_at(&self, index: CellIndex) -> bool {
        self.get(index).is_empty()
    }

    /// Cells in row-major order, paired with their index.
    pub fn cells(&self) -> impl Iterator<Item = (CellIndex, Cell)> + '_ {
        CellIndex::all().map(move |index| (index, self.get(index)))
    }

    /// Number of squares marked with `sign`.
    pub fn count(&self, sign: Sign) -> usize {
        self.cells()
            .filter(|(_, cell)| cell.sign() == Some(sign))
            .count()
    }

    pub fn is_blank(&self) -> bool {
        self.cells().all(|(_, cell)| cell.is_empty())
    }
}

// ── Messages ────────────────────────────────────────────────────────

/// Message types sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask for the current list of joinable rooms.
    GetOpenRooms,
    /// Create a new room; the server answers with `create_room`.
    CreateRoom,
    /// Join an existing room; the server answers with `join_room` or
    /// `join_room_error`.
    JoinRoom { room_id: RoomId },
    /// Leave the current room.
    LeaveRoom,
    /// Place the local sign on a cell.
    Move {
        room_id: RoomId,
        sign: Sign,
        cell: CellIndex,
    },
}

/// Message types sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full replacement of the joinable-room list.
    UpdateOpenRooms { open_rooms: Vec<RoomId> },
    /// The room this client asked for was created.
    CreateRoom { room_id: RoomId, sign: Sign },
    /// This client was admitted to an existing room.
    JoinRoom { room_id: RoomId, sign: Sign },
    /// A join request was refused (room missing, room full, ...).
    JoinRoomError { message: String },
    /// A round is about to begin; a local countdown gates the first move.
    StartCountdown { round: u32 },
    /// Authoritative board after a move.
    UpdateBoard { board: Board },
    /// A round was won; the room stays open for the next round.
    WinRound { sign: Sign, cells: Vec<CellIndex> },
    /// The game was won; the match is over.
    Win {
        #[serde(alias = "winner")]
        sign: Sign,
        cells: Vec<CellIndex>,
    },
    /// The round ended without a winner.
    Draw,
    /// This client left its room.
    LeaveRoom,
    /// The other player dropped out of the room.
    PlayerDisconnected,
    /// The server refused a move.
    Denied { message: String },
}

impl ServerMessage {
    /// Every tag the decoder recognises.
    pub const TAGS: &'static [&'static str] = &[
        "update_open_rooms",
        "create_room",
        "join_room",
        "join_room_error",
        "start_countdown",
        "update_board",
        "win_round",
        "win",
        "draw",
        "leave_room",
        "player_disconnected",
        "denied",
    ];

    /// The wire `type` of this message.
    pub fn tag(&self) -> &'static str {
        match self {
            ServerMessage::UpdateOpenRooms { .. } => "update_open_rooms",
            ServerMessage::CreateRoom { .. } => "create_room",
            ServerMessage::JoinRoom { .. } => "join_room",
            ServerMessage::JoinRoomError { .. } => "join_room_error",
            ServerMessage::StartCountdown { .. } => "start_countdown",
            ServerMessage::UpdateBoard { .. } => "update_board",
            ServerMessage::WinRound { .. } => "win_round",
            ServerMessage::Win { .. } => "win",
            ServerMessage::Draw => "draw",
            ServerMessage::LeaveRoom => "leave_room",
            ServerMessage::PlayerDisconnected => "player_disconnected",
            ServerMessage::Denied { .. } => "denied",
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cell_index_maps_to_row_and_column() {
        let index = CellIndex::new(7).unwrap();
        assert_eq!((index.row(), index.col()), (2, 1));
        assert!(CellIndex::new(9).is_err());
    }

    #[test]
    fn board_uses_star_for_empty_cells() {
        let mut board = Board::empty();
        board.set(CellIndex::new(0).unwrap(), Cell::X);
        let value = serde_json::to_value(board).unwrap();
        assert_eq!(
            value,
            json!([["x", "*", "*"], ["*", "*", "*"], ["*", "*", "*"]])
        );
    }

    #[test]
    fn board_counts_marks_per_sign() {
        let board: Board =
            serde_json::from_value(json!([["x", "o", "*"], ["*", "X", "*"], ["*", "*", "o"]]))
                .unwrap();
        assert_eq!(board.count(Sign::X), 2);
        assert_eq!(board.count(Sign::O), 2);
        assert!(!board.is_blank());
    }

    #[test]
    fn every_server_tag_is_listed() {
        let samples = [
            ServerMessage::UpdateOpenRooms { open_rooms: vec![] },
            ServerMessage::CreateRoom {
                room_id: 1,
                sign: Sign::X,
            },
            ServerMessage::JoinRoom {
                room_id: 1,
                sign: Sign::O,
            },
            ServerMessage::JoinRoomError {
                message: String::new(),
            },
            ServerMessage::StartCountdown { round: 1 },
            ServerMessage::UpdateBoard {
                board: Board::empty(),
            },
            ServerMessage::WinRound {
                sign: Sign::X,
                cells: vec![],
            },
            ServerMessage::Win {
                sign: Sign::X,
                cells: vec![],
            },
            ServerMessage::Draw,
            ServerMessage::LeaveRoom,
            ServerMessage::PlayerDisconnected,
            ServerMessage::Denied {
                message: String::new(),
            },
        ];
        assert_eq!(samples.len(), ServerMessage::TAGS.len());
        for msg in samples {
            let value = serde_json::to_value(&msg).unwrap();
            assert_eq!(value["type"], msg.tag());
            assert!(ServerMessage::TAGS.contains(&msg.tag()));
        }
    }

    #[test]
    fn legacy_win_payload_accepts_winner_key() {
        let msg: ServerMessage =
            serde_json::from_value(json!({"type": "win", "winner": "o", "cells": [2, 4, 6]}))
                .unwrap();
        assert_eq!(
            msg,
            ServerMessage::Win {
                sign: Sign::O,
                cells: [2, 4, 6].map(|i| CellIndex::new(i).unwrap()).to_vec(),
            }
        );
    }

    #[test]
    fn move_message_has_flat_fields() {
        let msg = ClientMessage::Move {
            room_id: 3,
            sign: Sign::X,
            cell: CellIndex::new(1).unwrap(),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "move", "room_id": 3, "sign": "x", "cell": 1})
        );
    }
}
