//! Local intent checks run before anything is sent to the server.
//!
//! The gate never mutates the session. A successful move check yields the
//! outbound message only; the board changes when the server echoes it back in
//! `update_board`.

use crate::error::UserInputError;
use crate::protocol::{CellIndex, ClientMessage};
use crate::state::{Phase, SessionState};

/// Build the `move` request for `cell` if the session currently allows it.
///
/// # Errors
///
/// - [`UserInputError::CellOutOfRange`] if `cell > 8`
/// - [`UserInputError::NotPlaying`] outside [`Phase::Playing`]
/// - [`UserInputError::NotYourTurn`] while moves are locked
/// - [`UserInputError::NotInRoom`] if room or sign is unknown
/// - [`UserInputError::CellOccupied`] if the cell already carries a mark
pub fn attempt_move(state: &SessionState, cell: u8) -> Result<ClientMessage, UserInputError> {
    let cell = CellIndex::new(cell)?;
    if state.phase() != Phase::Playing {
        return Err(UserInputError::NotPlaying);
    }
    if !state.can_move() {
        return Err(UserInputError::NotYourTurn);
    }
    let (Some(room_id), Some(sign)) = (state.room_id(), state.sign()) else {
        return Err(UserInputError::NotInRoom);
    };
    if !state.board().is_empty_at(cell) {
        return Err(UserInputError::CellOccupied { cell });
    }
    Ok(ClientMessage::Move {
        room_id,
        sign,
        cell,
    })
}

/// Creating or joining a room is only possible from the lobby.
///
/// # Errors
///
/// Returns [`UserInputError::AlreadyInRoom`] otherwise.
pub fn check_can_enter_room(state: &SessionState) -> Result<(), UserInputError> {
    if state.phase().in_room() {
        Err(UserInputError::AlreadyInRoom)
    } else {
        Ok(())
    }
}

/// Leaving is only possible from inside a room.
///
/// # Errors
///
/// Returns [`UserInputError::NotInRoom`] otherwise.
pub fn check_can_leave(state: &SessionState) -> Result<(), UserInputError> {
    if state.phase().in_room() {
        Ok(())
    } else {
        Err(UserInputError::NotInRoom)
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
    use crate::protocol::{Board, Cell, Sign};
    use crate::state::{TimerDirective, DEFAULT_COUNTDOWN_START};

    fn playing_with(board: Board) -> SessionState {
        let mut state = SessionState::default();
        state.connection_opened().unwrap();
        state.room_entered("create_room", 3, Sign::X).unwrap();
        let TimerDirective::Start { generation, .. } = state.round_starting(1).unwrap() else {
            panic!("expected a timer start");
        };
        for _ in 0..DEFAULT_COUNTDOWN_START {
            state.tick(generation);
        }
        state.board_updated(board).unwrap();
        state
    }

    fn first_cell_taken() -> Board {
        let mut board = Board::empty();
        board.set(CellIndex::new(0).unwrap(), Cell::X);
        board
    }

    #[test]
    fn free_cell_yields_move_without_touching_the_board() {
        let state = playing_with(first_cell_taken());
        let before = state.clone();
        let msg = attempt_move(&state, 1).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Move {
                room_id: 3,
                sign: Sign::X,
                cell: CellIndex::new(1).unwrap()
            }
        );
        assert_eq!(state, before);
    }

    #[test]
    fn occupied_cell_never_yields_move() {
        let state = playing_with(first_cell_taken());
        assert_eq!(
            attempt_move(&state, 0),
            Err(UserInputError::CellOccupied {
                cell: CellIndex::new(0).unwrap()
            })
        );
    }

    #[test]
    fn out_of_range_cell_is_rejected() {
        let state = playing_with(Board::empty());
        assert_eq!(
            attempt_move(&state, 9),
            Err(UserInputError::CellOutOfRange { cell: 9 })
        );
    }

    #[test]
    fn moves_are_locked_during_countdown() {
        let mut state = SessionState::default();
        state.connection_opened().unwrap();
        state.room_entered("join_room", 3, Sign::O).unwrap();
        assert_eq!(attempt_move(&state, 4), Err(UserInputError::NotPlaying));
        state.round_starting(1).unwrap();
        assert_eq!(attempt_move(&state, 4), Err(UserInputError::NotPlaying));
    }

    #[test]
    fn room_checks_follow_the_phase() {
        let mut state = SessionState::default();
        state.connection_opened().unwrap();
        assert!(check_can_enter_room(&state).is_ok());
        assert_eq!(check_can_leave(&state), Err(UserInputError::NotInRoom));
        state.room_entered("create_room", 1, Sign::X).unwrap();
        assert_eq!(
            check_can_enter_room(&state),
            Err(UserInputError::AlreadyInRoom)
        );
        assert!(check_can_leave(&state).is_ok());
    }
}
