//! The session state machine.
//!
//! [`SessionState`] is plain data. It is only changed through the named
//! transition methods below, each of which either applies completely and
//! returns a [`TimerDirective`] for the countdown owner, or refuses with a
//! [`ProtocolViolation`] and leaves every field untouched.
//!
//! # Generations
//!
//! Every phase change bumps [`SessionState::generation`]. A countdown tick
//! carries the generation that was current when its timer started, and
//! [`SessionState::tick`] ignores ticks whose stamp no longer matches. That is
//! what keeps a tick queued behind a `leave_room` or a new `start_countdown`
//! from ever granting a move.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::close_codes::CloseCode;
use crate::error::{ProtocolViolation, UserInputError};
use crate::protocol::{Board, CellIndex, RoomId, Sign};

/// Default value the countdown starts from.
pub const DEFAULT_COUNTDOWN_START: u8 = 3;

/// Default number of rounds in a match.
pub const DEFAULT_MAX_ROUNDS: u32 = 6;

// ── Phase ───────────────────────────────────────────────────────────

/// Discrete stage of the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No open channel.
    #[default]
    Disconnected,
    /// Channel open, no room list received yet.
    AwaitingRooms,
    /// In the lobby with a known room list.
    RoomIdle,
    /// In a room, waiting for an opponent or for the next round.
    RoomWaiting,
    /// A round was announced; moves unlock when the countdown reaches zero.
    CountingDown,
    /// A round is being played.
    Playing,
    /// The last round ended in a win or a draw.
    RoundResolved,
}

impl Phase {
    /// `true` for every phase in which the client occupies a room.
    pub fn in_room(self) -> bool {
        matches!(
            self,
            Phase::RoomWaiting | Phase::CountingDown | Phase::Playing | Phase::RoundResolved
        )
    }

    /// `true` for the phases in which a room may be created or joined.
    pub fn in_lobby(self) -> bool {
        matches!(self, Phase::AwaitingRooms | Phase::RoomIdle)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Disconnected => "disconnected",
            Phase::AwaitingRooms => "awaiting-rooms",
            Phase::RoomIdle => "room-idle",
            Phase::RoomWaiting => "room-waiting",
            Phase::CountingDown => "counting-down",
            Phase::Playing => "playing",
            Phase::RoundResolved => "round-resolved",
        };
        f.write_str(name)
    }
}

// ── Options ─────────────────────────────────────────────────────────

/// How a resolved round relates to the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SessionFlavor {
    /// A room plays rounds until a `win` or a leave; `win_round` and `draw`
    /// leave the room open for the next `start_countdown`. `max_rounds` is
    /// the count shown next to the round number.
    Rounds { max_rounds: u32 },
    /// A room plays one game; any resolution ends the match.
    SingleGame,
}

impl Default for SessionFlavor {
    fn default() -> Self {
        SessionFlavor::Rounds {
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

/// Behavioural knobs of a [`SessionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub flavor: SessionFlavor,
    /// Value the countdown starts from. Clamped to at least 1.
    pub countdown_start: u8,
    /// Derive `can_move` from board updates, assuming strictly alternating
    /// turns. When `false` the server alone decides when moves are allowed.
    pub alternate_turns: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            flavor: SessionFlavor::default(),
            countdown_start: DEFAULT_COUNTDOWN_START,
            alternate_turns: false,
        }
    }
}

// ── Resolution ──────────────────────────────────────────────────────

/// How a round ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Outcome {
    Won { sign: Sign, cells: Vec<CellIndex> },
    Draw,
}

/// The result of the last round, kept for rendering until the next round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub outcome: Outcome,
    /// No further round will start in this room.
    pub match_over: bool,
}

// ── Transition results ──────────────────────────────────────────────

/// What the countdown owner must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerDirective {
    /// Leave any timer as it is.
    Keep,
    /// Replace any live timer with one counting `initial` ticks stamped with
    /// `generation`.
    Start { initial: u8, generation: u64 },
    /// Stop any live timer.
    Cancel,
}

/// Result of feeding a countdown tick into the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick belonged to a superseded countdown and changed nothing.
    Stale,
    /// The countdown went down to the carried value.
    Counting(u8),
    /// The countdown reached zero and play began.
    Expired,
}

/// Outcome of a transition method.
pub type Transition = Result<TimerDirective, ProtocolViolation>;

// ── SessionState ────────────────────────────────────────────────────

/// The single source of truth for one connection's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    options: SessionOptions,
    phase: Phase,
    generation: u64,
    room_id: Option<RoomId>,
    sign: Option<Sign>,
    board: Board,
    can_move: bool,
    countdown: Option<u8>,
    round_number: Option<u32>,
    resolution: Option<Resolution>,
    info_message: Option<String>,
    rooms_known: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

impl SessionState {
    /// A fresh, disconnected session.
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options: SessionOptions {
                countdown_start: options.countdown_start.max(1),
                ..options
            },
            phase: Phase::Disconnected,
            generation: 0,
            room_id: None,
            sign: None,
            board: Board::empty(),
            can_move: false,
            countdown: None,
            round_number: None,
            resolution: None,
            info_message: None,
            rooms_known: false,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current generation; see the module docs.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn room_id(&self) -> Option<RoomId> {
        self.room_id
    }

    pub fn sign(&self) -> Option<Sign> {
        self.sign
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn can_move(&self) -> bool {
        self.can_move
    }

    /// Remaining countdown value while in [`Phase::CountingDown`].
    pub fn countdown(&self) -> Option<u8> {
        self.countdown
    }

    pub fn round_number(&self) -> Option<u32> {
        self.round_number
    }

    pub fn resolution(&self) -> Option<&Resolution> {
        self.resolution.as_ref()
    }

    pub fn info_message(&self) -> Option<&str> {
        self.info_message.as_deref()
    }

    /// Round limit of the configured flavor, if it has one.
    pub fn max_rounds(&self) -> Option<u32> {
        match self.options.flavor {
            SessionFlavor::Rounds { max_rounds } => Some(max_rounds),
            SessionFlavor::SingleGame => None,
        }
    }

    // ── Connection lifecycle ────────────────────────────────────────

    /// The channel opened.
    pub fn connection_opened(&mut self) -> Transition {
        if self.phase != Phase::Disconnected {
            return Err(self.violation("connection_opened"));
        }
        self.set_phase(Phase::AwaitingRooms);
        self.info_message = None;
        Ok(TimerDirective::Keep)
    }

    /// The channel closed. Valid in every phase.
    pub fn connection_closed(&mut self, code: Option<CloseCode>) -> TimerDirective {
        let options = self.options;
        let generation = self.generation;
        *self = Self::new(options);
        self.generation = generation;
        self.bump_generation();
        self.info_message = Some(
            code.map_or(CloseCode::LOST_MESSAGE, |code| code.info_message())
                .to_owned(),
        );
        TimerDirective::Cancel
    }

    // ── Lobby ───────────────────────────────────────────────────────

    /// A room list arrived. Valid in every phase.
    ///
    /// The list itself lives in the room directory; the only effect here is
    /// that the first list moves the lobby from `AwaitingRooms` to `RoomIdle`.
    pub fn rooms_updated(&mut self) -> Transition {
        self.rooms_known = true;
        if self.phase == Phase::AwaitingRooms {
            self.set_phase(Phase::RoomIdle);
        }
        Ok(TimerDirective::Keep)
    }

    /// The server placed this client in a room (`create_room` or `join_room`).
    pub fn room_entered(&mut self, tag: &'static str, room_id: RoomId, sign: Sign) -> Transition {
        if !self.phase.in_lobby() {
            return Err(self.violation(tag));
        }
        self.room_id = Some(room_id);
        self.sign = Some(sign);
        self.board = Board::empty();
        self.can_move = false;
        self.round_number = None;
        self.resolution = None;
        self.info_message = Some("Waiting for another player.".to_owned());
        self.set_phase(Phase::RoomWaiting);
        debug!(room_id, %sign, "entered room");
        Ok(TimerDirective::Keep)
    }

    /// The server refused a join request.
    pub fn join_rejected(&mut self, reason: &str) -> Transition {
        if !self.phase.in_lobby() {
            return Err(self.violation("join_room_error"));
        }
        self.info_message = Some(reason.to_owned());
        Ok(TimerDirective::Keep)
    }

    // ── Rounds ──────────────────────────────────────────────────────

    /// A round was announced.
    ///
    /// Arriving while a countdown is already running restarts it under a new
    /// generation, so ticks of the old countdown go stale.
    pub fn round_starting(&mut self, round: u32) -> Transition {
        let allowed = match self.phase {
            Phase::RoomWaiting | Phase::CountingDown => true,
            Phase::RoundResolved => !self.resolution.as_ref().is_some_and(|r| r.match_over),
            _ => false,
        };
        if !allowed {
            return Err(self.violation("start_countdown"));
        }
        let initial = self.options.countdown_start;
        self.board = Board::empty();
        self.can_move = false;
        self.round_number = Some(round);
        self.resolution = None;
        self.countdown = Some(initial);
        self.info_message = Some("Get ready!".to_owned());
        if self.phase == Phase::CountingDown {
            self.bump_generation();
        } else {
            self.set_phase(Phase::CountingDown);
        }
        Ok(TimerDirective::Start {
            initial,
            generation: self.generation,
        })
    }

    /// Feed one countdown tick stamped with `generation`.
    pub fn tick(&mut self, generation: u64) -> TickOutcome {
        if self.phase != Phase::CountingDown || generation != self.generation {
            return TickOutcome::Stale;
        }
        let Some(remaining) = self.countdown else {
            return TickOutcome::Stale;
        };
        let remaining = remaining.saturating_sub(1);
        if remaining > 0 {
            self.countdown = Some(remaining);
            return TickOutcome::Counting(remaining);
        }
        self.countdown = None;
        self.can_move = true;
        self.info_message = Some("Make your move.".to_owned());
        self.set_phase(Phase::Playing);
        TickOutcome::Expired
    }

    /// The server pushed a new board.
    pub fn board_updated(&mut self, board: Board) -> Transition {
        if self.phase != Phase::Playing {
            return Err(self.violation("update_board"));
        }
        if self.options.alternate_turns {
            if let Some(sign) = self.sign {
                if board.count(sign) > self.board.count(sign) {
                    self.can_move = false;
                } else if board.count(sign.opponent()) > self.board.count(sign.opponent()) {
                    self.can_move = true;
                }
            }
        }
        self.board = board;
        Ok(TimerDirective::Keep)
    }

    /// A round (`win_round`) or the whole game (`win`) was won.
    pub fn round_won(
        &mut self,
        tag: &'static str,
        sign: Sign,
        cells: Vec<CellIndex>,
        ends_match: bool,
    ) -> Transition {
        if self.phase != Phase::Playing {
            return Err(self.violation(tag));
        }
        let text = if self.sign == Some(sign) {
            "You won!"
        } else {
            "You lose("
        };
        self.resolve(Outcome::Won { sign, cells }, ends_match, text);
        Ok(TimerDirective::Keep)
    }

    /// The round ended in a draw.
    pub fn round_drawn(&mut self) -> Transition {
        if self.phase != Phase::Playing {
            return Err(self.violation("draw"));
        }
        self.resolve(Outcome::Draw, false, "Draw!");
        Ok(TimerDirective::Keep)
    }

    /// The other player left.
    pub fn opponent_disconnected(&mut self) -> Transition {
        if !matches!(
            self.phase,
            Phase::CountingDown | Phase::Playing | Phase::RoundResolved
        ) {
            return Err(self.violation("player_disconnected"));
        }
        self.board = Board::empty();
        self.can_move = false;
        self.countdown = None;
        self.round_number = None;
        self.resolution = None;
        self.info_message =
            Some("Your opponent disconnected. Waiting for another player.".to_owned());
        self.set_phase(Phase::RoomWaiting);
        Ok(TimerDirective::Cancel)
    }

    /// This client left its room.
    pub fn room_left(&mut self) -> Transition {
        if !self.phase.in_room() {
            return Err(self.violation("leave_room"));
        }
        self.room_id = None;
        self.sign = None;
        self.board = Board::empty();
        self.can_move = false;
        self.countdown = None;
        self.round_number = None;
        self.resolution = None;
        self.info_message = None;
        let lobby = if self.rooms_known {
            Phase::RoomIdle
        } else {
            Phase::AwaitingRooms
        };
        self.set_phase(lobby);
        Ok(TimerDirective::Cancel)
    }

    /// The server refused a move.
    pub fn move_denied(&mut self, message: &str) -> Transition {
        if !self.phase.in_room() {
            return Err(self.violation("denied"));
        }
        self.info_message = Some(message.to_owned());
        Ok(TimerDirective::Keep)
    }

    /// Surface a rejected local intent. Valid in every phase.
    pub fn input_rejected(&mut self, error: &UserInputError) {
        self.info_message = Some(error.to_string());
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn resolve(&mut self, outcome: Outcome, ends_match: bool, text: &str) {
        // `max_rounds` only labels the round counter; the server decides when
        // a multi-round match stops announcing rounds.
        let match_over = ends_match || self.options.flavor == SessionFlavor::SingleGame;
        self.can_move = false;
        self.resolution = Some(Resolution {
            outcome,
            match_over,
        });
        self.info_message = Some(text.to_owned());
        self.set_phase(Phase::RoundResolved);
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            debug!(from = %self.phase, to = %phase, "phase change");
            self.phase = phase;
            self.bump_generation();
        }
    }

    fn bump_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    fn violation(&self, tag: &'static str) -> ProtocolViolation {
        ProtocolViolation {
            tag,
            phase: self.phase,
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
    use crate::protocol::Cell;

    fn idx(i: u8) -> CellIndex {
        CellIndex::new(i).unwrap()
    }

    fn in_room(sign: Sign) -> SessionState {
        let mut state = SessionState::default();
        state.connection_opened().unwrap();
        state.room_entered("create_room", 3, sign).unwrap();
        state
    }

    fn playing(sign: Sign) -> SessionState {
        let mut state = in_room(sign);
        let TimerDirective::Start { generation, .. } = state.round_starting(1).unwrap() else {
            panic!("expected a timer start");
        };
        for _ in 0..DEFAULT_COUNTDOWN_START {
            state.tick(generation);
        }
        assert_eq!(state.phase(), Phase::Playing);
        state
    }

    #[test]
    fn create_then_countdown_then_play() {
        let mut state = in_room(Sign::X);
        assert_eq!(state.phase(), Phase::RoomWaiting);
        assert_eq!(state.room_id(), Some(3));
        assert_eq!(state.sign(), Some(Sign::X));

        let directive = state.round_starting(1).unwrap();
        let TimerDirective::Start {
            initial,
            generation,
        } = directive
        else {
            panic!("expected a timer start, got {directive:?}");
        };
        assert_eq!(initial, 3);
        assert_eq!(state.phase(), Phase::CountingDown);
        assert!(state.board().is_blank());
        assert!(!state.can_move());

        assert_eq!(state.tick(generation), TickOutcome::Counting(2));
        assert_eq!(state.tick(generation), TickOutcome::Counting(1));
        assert_eq!(state.tick(generation), TickOutcome::Expired);
        assert_eq!(state.phase(), Phase::Playing);
        assert!(state.can_move());
        assert_eq!(state.countdown(), None);
    }

    #[test]
    fn tick_after_leave_is_stale() {
        let mut state = in_room(Sign::X);
        let TimerDirective::Start { generation, .. } = state.round_starting(1).unwrap() else {
            panic!("expected a timer start");
        };
        assert_eq!(state.room_left().unwrap(), TimerDirective::Cancel);
        for _ in 0..5 {
            assert_eq!(state.tick(generation), TickOutcome::Stale);
        }
        assert!(!state.can_move());
        assert_eq!(state.phase(), Phase::AwaitingRooms);
    }

    #[test]
    fn restarted_countdown_ignores_old_ticks() {
        let mut state = in_room(Sign::O);
        let TimerDirective::Start { generation: old, .. } = state.round_starting(1).unwrap() else {
            panic!("expected a timer start");
        };
        state.tick(old);
        let TimerDirective::Start { generation: new, .. } = state.round_starting(1).unwrap() else {
            panic!("expected a timer start");
        };
        assert_ne!(old, new);
        assert_eq!(state.countdown(), Some(3));
        assert_eq!(state.tick(old), TickOutcome::Stale);
        assert_eq!(state.tick(old), TickOutcome::Stale);
        assert_eq!(state.countdown(), Some(3));
        assert!(!state.can_move());
    }

    #[test]
    fn tick_after_expiry_is_stale() {
        let mut state = in_room(Sign::X);
        let TimerDirective::Start { generation, .. } = state.round_starting(1).unwrap() else {
            panic!("expected a timer start");
        };
        for _ in 0..3 {
            state.tick(generation);
        }
        assert_eq!(state.tick(generation), TickOutcome::Stale);
    }

    #[test]
    fn create_room_while_in_room_is_rejected() {
        let mut state = in_room(Sign::X);
        let before = state.clone();
        let err = state.room_entered("join_room", 8, Sign::O).unwrap_err();
        assert_eq!(err.phase, Phase::RoomWaiting);
        assert_eq!(err.tag, "join_room");
        assert_eq!(state, before);
    }

    #[test]
    fn board_update_only_while_playing() {
        let mut state = in_room(Sign::X);
        let before = state.clone();
        assert!(state.board_updated(Board::empty()).is_err());
        assert_eq!(state, before);

        let mut state = playing(Sign::X);
        let mut board = Board::empty();
        board.set(idx(0), Cell::X);
        state.board_updated(board).unwrap();
        assert_eq!(state.board().get(idx(0)), Cell::X);
        assert!(state.can_move(), "server-arbitrated turns leave can_move alone");
    }

    #[test]
    fn alternating_turns_follow_board_updates() {
        let mut state = SessionState::new(SessionOptions {
            alternate_turns: true,
            ..SessionOptions::default()
        });
        state.connection_opened().unwrap();
        state.room_entered("join_room", 3, Sign::O).unwrap();
        let TimerDirective::Start { generation, .. } = state.round_starting(1).unwrap() else {
            panic!("expected a timer start");
        };
        for _ in 0..3 {
            state.tick(generation);
        }

        let mut board = Board::empty();
        board.set(idx(4), Cell::O);
        state.board_updated(board).unwrap();
        assert!(!state.can_move());

        board.set(idx(0), Cell::X);
        state.board_updated(board).unwrap();
        assert!(state.can_move());
    }

    #[test]
    fn losing_a_round_keeps_winning_cells() {
        let mut state = playing(Sign::X);
        state
            .round_won("win_round", Sign::O, vec![idx(0), idx(4), idx(8)], false)
            .unwrap();
        assert_eq!(state.phase(), Phase::RoundResolved);
        assert!(!state.can_move());
        assert_eq!(state.info_message(), Some("You lose("));
        let resolution = state.resolution().unwrap();
        assert!(!resolution.match_over);
        assert_eq!(
            resolution.outcome,
            Outcome::Won {
                sign: Sign::O,
                cells: vec![idx(0), idx(4), idx(8)]
            }
        );
    }

    #[test]
    fn next_round_clears_resolution() {
        let mut state = playing(Sign::X);
        state.round_drawn().unwrap();
        assert_eq!(state.info_message(), Some("Draw!"));
        state.round_starting(2).unwrap();
        assert_eq!(state.phase(), Phase::CountingDown);
        assert_eq!(state.round_number(), Some(2));
        assert!(state.resolution().is_none());
    }

    #[test]
    fn final_win_ends_the_match() {
        let mut state = playing(Sign::X);
        state
            .round_won("win", Sign::X, vec![idx(2), idx(4), idx(6)], true)
            .unwrap();
        assert_eq!(state.info_message(), Some("You won!"));
        assert!(state.resolution().unwrap().match_over);
        assert!(state.round_starting(2).is_err());
    }

    #[test]
    fn rounds_past_the_displayed_limit_still_start() {
        let mut state = in_room(Sign::X);
        let TimerDirective::Start { generation, .. } =
            state.round_starting(DEFAULT_MAX_ROUNDS).unwrap()
        else {
            panic!("expected a timer start");
        };
        for _ in 0..3 {
            state.tick(generation);
        }
        state.round_drawn().unwrap();
        assert!(!state.resolution().unwrap().match_over);

        state.round_starting(DEFAULT_MAX_ROUNDS + 1).unwrap();
        assert_eq!(state.phase(), Phase::CountingDown);
        assert_eq!(state.round_number(), Some(DEFAULT_MAX_ROUNDS + 1));
        assert_eq!(state.max_rounds(), Some(DEFAULT_MAX_ROUNDS));
    }

    #[test]
    fn single_game_flavor_ends_after_one_resolution() {
        let mut state = SessionState::new(SessionOptions {
            flavor: SessionFlavor::SingleGame,
            ..SessionOptions::default()
        });
        state.connection_opened().unwrap();
        state.room_entered("create_room", 1, Sign::X).unwrap();
        let TimerDirective::Start { generation, .. } = state.round_starting(1).unwrap() else {
            panic!("expected a timer start");
        };
        for _ in 0..3 {
            state.tick(generation);
        }
        state.round_drawn().unwrap();
        assert!(state.resolution().unwrap().match_over);
        assert_eq!(state.max_rounds(), None);
    }

    #[test]
    fn opponent_disconnect_returns_to_waiting() {
        let mut state = in_room(Sign::X);
        let TimerDirective::Start { generation, .. } = state.round_starting(1).unwrap() else {
            panic!("expected a timer start");
        };
        assert_eq!(
            state.opponent_disconnected().unwrap(),
            TimerDirective::Cancel
        );
        assert_eq!(state.phase(), Phase::RoomWaiting);
        assert_eq!(state.tick(generation), TickOutcome::Stale);
        assert_eq!(state.room_id(), Some(3));
    }

    #[test]
    fn leave_returns_to_idle_once_rooms_are_known() {
        let mut state = SessionState::default();
        state.connection_opened().unwrap();
        state.rooms_updated().unwrap();
        assert_eq!(state.phase(), Phase::RoomIdle);
        state.room_entered("create_room", 4, Sign::X).unwrap();
        state.room_left().unwrap();
        assert_eq!(state.phase(), Phase::RoomIdle);
        assert_eq!(state.room_id(), None);
        assert_eq!(state.sign(), None);
    }

    #[test]
    fn rooms_update_does_not_touch_room_phases() {
        let mut state = playing(Sign::X);
        let generation = state.generation();
        state.rooms_updated().unwrap();
        assert_eq!(state.phase(), Phase::Playing);
        assert_eq!(state.generation(), generation);
    }

    #[test]
    fn connection_closed_resets_everything() {
        let mut state = playing(Sign::X);
        let generation = state.generation();
        let directive = state.connection_closed(Some(CloseCode::GameInProgress));
        assert_eq!(directive, TimerDirective::Cancel);
        assert_eq!(state.phase(), Phase::Disconnected);
        assert_eq!(state.room_id(), None);
        assert!(!state.can_move());
        assert!(state.generation() > generation);
        assert_eq!(state.info_message(), Some("Game is already started."));
    }

    #[test]
    fn countdown_start_is_clamped() {
        let state = SessionState::new(SessionOptions {
            countdown_start: 0,
            ..SessionOptions::default()
        });
        assert_eq!(state.options().countdown_start, 1);
    }

    #[test]
    fn join_rejected_keeps_lobby_phase() {
        let mut state = SessionState::default();
        state.connection_opened().unwrap();
        state.rooms_updated().unwrap();
        state.join_rejected("Room 5 does not exist.").unwrap();
        assert_eq!(state.phase(), Phase::RoomIdle);
        assert_eq!(state.info_message(), Some("Room 5 does not exist."));
    }

    #[test]
    fn denied_surfaces_server_message() {
        let mut state = playing(Sign::O);
        state.move_denied("Wait for your turn").unwrap();
        assert_eq!(state.info_message(), Some("Wait for your turn"));
        assert_eq!(state.phase(), Phase::Playing);
    }
}
