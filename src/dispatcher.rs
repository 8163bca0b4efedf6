//! Routes decoded server messages to session transitions.

use tracing::{debug, warn};

use crate::directory::{RoomDirectory, RoomSummary};
use crate::error::ProtocolViolation;
use crate::protocol::ServerMessage;
use crate::state::{SessionState, TimerDirective};

/// What a dispatched message did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// The transition applied; the timer owner must follow the directive.
    Applied(TimerDirective),
    /// The message was illegal in the current phase and changed nothing.
    Ignored(ProtocolViolation),
}

impl Dispatched {
    /// The timer directive to follow; [`TimerDirective::Keep`] when ignored.
    pub fn timer(self) -> TimerDirective {
        match self {
            Dispatched::Applied(directive) => directive,
            Dispatched::Ignored(_) => TimerDirective::Keep,
        }
    }

    pub fn is_applied(self) -> bool {
        matches!(self, Dispatched::Applied(_))
    }
}

/// Apply `message` to the session.
///
/// Illegal (phase, tag) pairs are logged and reported as
/// [`Dispatched::Ignored`]; a stale or duplicate push never corrupts state.
pub fn dispatch(
    state: &mut SessionState,
    directory: &mut RoomDirectory,
    message: ServerMessage,
) -> Dispatched {
    let tag = message.tag();
    let result = match message {
        ServerMessage::UpdateOpenRooms { open_rooms } => {
            directory.apply_update(open_rooms.into_iter().map(RoomSummary::from));
            state.rooms_updated()
        }
        ServerMessage::CreateRoom { room_id, sign } | ServerMessage::JoinRoom { room_id, sign } => {
            let result = state.room_entered(tag, room_id, sign);
            if result.is_ok() {
                directory.clear_pending();
            }
            result
        }
        ServerMessage::JoinRoomError { message } => {
            let result = state.join_rejected(&message);
            if result.is_ok() {
                directory.clear_pending();
            }
            result
        }
        ServerMessage::StartCountdown { round } => state.round_starting(round),
        ServerMessage::UpdateBoard { board } => state.board_updated(board),
        ServerMessage::WinRound { sign, cells } => state.round_won(tag, sign, cells, false),
        ServerMessage::Win { sign, cells } => state.round_won(tag, sign, cells, true),
        ServerMessage::Draw => state.round_drawn(),
        ServerMessage::LeaveRoom => state.room_left(),
        ServerMessage::PlayerDisconnected => state.opponent_disconnected(),
        ServerMessage::Denied { message } => state.move_denied(&message),
    };

    match result {
        Ok(directive) => {
            debug!(tag, phase = %state.phase(), "applied server message");
            Dispatched::Applied(directive)
        }
        Err(violation) => {
            warn!("ignoring server message: {violation}");
            Dispatched::Ignored(violation)
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
    use crate::protocol::{Board, Sign};
    use crate::state::Phase;

    fn connected() -> (SessionState, RoomDirectory) {
        let mut state = SessionState::default();
        state.connection_opened().unwrap();
        (state, RoomDirectory::new())
    }

    #[test]
    fn rooms_update_replaces_directory_in_any_phase() {
        let (mut state, mut directory) = connected();
        dispatch(
            &mut state,
            &mut directory,
            ServerMessage::UpdateOpenRooms { open_rooms: vec![] },
        );
        dispatch(
            &mut state,
            &mut directory,
            ServerMessage::UpdateOpenRooms {
                open_rooms: vec![5, 7],
            },
        );
        let ids: Vec<_> = directory.rooms().iter().map(|r| r.room_id).collect();
        assert_eq!(ids, vec![5, 7]);
        assert_eq!(state.phase(), Phase::RoomIdle);
    }

    #[test]
    fn entering_a_room_clears_the_pending_selection() {
        let (mut state, mut directory) = connected();
        directory.select(3);
        let outcome = dispatch(
            &mut state,
            &mut directory,
            ServerMessage::JoinRoom {
                room_id: 3,
                sign: Sign::O,
            },
        );
        assert!(outcome.is_applied());
        assert_eq!(directory.pending(), None);
        assert_eq!(state.phase(), Phase::RoomWaiting);
    }

    #[test]
    fn join_error_clears_the_pending_selection() {
        let (mut state, mut directory) = connected();
        directory.select(99);
        dispatch(
            &mut state,
            &mut directory,
            ServerMessage::JoinRoomError {
                message: "Room 99 does not exist.".into(),
            },
        );
        assert_eq!(directory.pending(), None);
        assert_eq!(state.info_message(), Some("Room 99 does not exist."));
    }

    #[test]
    fn start_countdown_requests_a_timer() {
        let (mut state, mut directory) = connected();
        dispatch(
            &mut state,
            &mut directory,
            ServerMessage::CreateRoom {
                room_id: 3,
                sign: Sign::X,
            },
        );
        let outcome = dispatch(
            &mut state,
            &mut directory,
            ServerMessage::StartCountdown { round: 1 },
        );
        assert!(matches!(
            outcome.timer(),
            TimerDirective::Start { initial: 3, .. }
        ));
    }

    #[test]
    fn illegal_pairs_are_ignored_without_side_effects() {
        let (mut state, mut directory) = connected();
        let before = state.clone();
        for message in [
            ServerMessage::UpdateBoard {
                board: Board::empty(),
            },
            ServerMessage::Draw,
            ServerMessage::LeaveRoom,
            ServerMessage::PlayerDisconnected,
            ServerMessage::StartCountdown { round: 1 },
            ServerMessage::Denied {
                message: "no".into(),
            },
        ] {
            let tag = message.tag();
            let outcome = dispatch(&mut state, &mut directory, message);
            assert_eq!(
                outcome,
                Dispatched::Ignored(ProtocolViolation {
                    tag,
                    phase: Phase::AwaitingRooms
                })
            );
            assert_eq!(outcome.timer(), TimerDirective::Keep);
        }
        assert_eq!(state, before);
    }
}
