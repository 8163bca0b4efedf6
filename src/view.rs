//! Render-ready projection of the session.
//!
//! A [`ViewModel`] is an immutable snapshot derived from the session state
//! and room directory after every transition. Renderers consume it and never
//! reach back into the session.

use serde::Serialize;

use crate::directory::{RoomDirectory, RoomSummary};
use crate::protocol::{Board, CellIndex, RoomId, Sign};
use crate::state::{Outcome, Phase, SessionState};

/// Coarse screen selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UiState {
    NotInRoom,
    InRoom,
}

/// Colour of highlighted winning cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightColor {
    /// The local player won.
    Green,
    /// The opponent won.
    Red,
}

/// Cells to highlight on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Highlight {
    pub cells: Vec<CellIndex>,
    pub color: HighlightColor,
}

/// Snapshot handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewModel {
    pub ui_state: UiState,
    pub phase: Phase,
    pub room_id: Option<RoomId>,
    pub sign: Option<Sign>,
    pub board: Board,
    pub can_move: bool,
    pub countdown: Option<u8>,
    pub round_number: Option<u32>,
    pub max_rounds: Option<u32>,
    pub info_message: Option<String>,
    pub highlight: Option<Highlight>,
    pub open_rooms: Vec<RoomSummary>,
    /// Room id the player asked to join and has not heard back about.
    pub room_input: Option<RoomId>,
}

impl ViewModel {
    /// Derive the view of `state` and `directory`.
    pub fn project(state: &SessionState, directory: &RoomDirectory) -> Self {
        let ui_state = if state.phase().in_room() {
            UiState::InRoom
        } else {
            UiState::NotInRoom
        };
        let highlight = state.resolution().and_then(|resolution| match &resolution.outcome {
            Outcome::Won { sign, cells } => Some(Highlight {
                cells: cells.clone(),
                color: if state.sign() == Some(*sign) {
                    HighlightColor::Green
                } else {
                    HighlightColor::Red
                },
            }),
            Outcome::Draw => None,
        });
        Self {
            ui_state,
            phase: state.phase(),
            room_id: state.room_id(),
            sign: state.sign(),
            board: *state.board(),
            can_move: state.can_move(),
            countdown: state.countdown(),
            round_number: state.round_number(),
            max_rounds: state.max_rounds(),
            info_message: state.info_message().map(str::to_owned),
            highlight,
            open_rooms: directory.rooms().to_vec(),
            room_input: directory.pending(),
        }
    }
}

impl Default for ViewModel {
    fn default() -> Self {
        Self::project(&SessionState::default(), &RoomDirectory::default())
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
    use crate::state::TimerDirective;

    fn playing(sign: Sign) -> SessionState {
        let mut state = SessionState::default();
        state.connection_opened().unwrap();
        state.room_entered("create_room", 3, sign).unwrap();
        let TimerDirective::Start { generation, .. } = state.round_starting(1).unwrap() else {
            panic!("expected a timer start");
        };
        for _ in 0..3 {
            state.tick(generation);
        }
        state
    }

    fn cells(ids: &[u8]) -> Vec<CellIndex> {
        ids.iter().map(|&i| CellIndex::new(i).unwrap()).collect()
    }

    #[test]
    fn opponent_win_is_highlighted_red() {
        let mut state = playing(Sign::X);
        state
            .round_won("win_round", Sign::O, cells(&[0, 4, 8]), false)
            .unwrap();
        let view = ViewModel::project(&state, &RoomDirectory::new());
        assert_eq!(view.info_message.as_deref(), Some("You lose("));
        assert_eq!(
            view.highlight,
            Some(Highlight {
                cells: cells(&[0, 4, 8]),
                color: HighlightColor::Red
            })
        );
        assert_eq!(view.ui_state, UiState::InRoom);
    }

    #[test]
    fn own_win_is_highlighted_green() {
        let mut state = playing(Sign::O);
        state
            .round_won("win_round", Sign::O, cells(&[2, 5, 8]), false)
            .unwrap();
        let view = ViewModel::project(&state, &RoomDirectory::new());
        assert_eq!(view.info_message.as_deref(), Some("You won!"));
        assert_eq!(view.highlight.unwrap().color, HighlightColor::Green);
    }

    #[test]
    fn draw_has_no_highlight() {
        let mut state = playing(Sign::O);
        state.round_drawn().unwrap();
        let view = ViewModel::project(&state, &RoomDirectory::new());
        assert!(view.highlight.is_none());
    }

    #[test]
    fn lobby_view_lists_rooms_and_pending_input() {
        let mut directory = RoomDirectory::new();
        directory.apply_update([RoomSummary::from(5), RoomSummary::from(7)]);
        directory.select(7);
        let view = ViewModel::project(&SessionState::default(), &directory);
        assert_eq!(view.ui_state, UiState::NotInRoom);
        assert_eq!(view.open_rooms.len(), 2);
        assert_eq!(view.room_input, Some(7));
        assert_eq!(view.max_rounds, Some(6));
    }

    #[test]
    fn view_serializes_for_web_renderers() {
        let view = ViewModel::project(&playing(Sign::X), &RoomDirectory::new());
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["ui_state"], "in_room");
        assert_eq!(json["phase"], "playing");
        assert_eq!(json["can_move"], true);
        assert_eq!(json["board"][0][0], "*");
    }
}
