//! Channel close codes and what they mean to a player.
//!
//! The server closes the socket with the application code `4000` when a
//! client connects to a game that has already started. Every other code is
//! treated as a plain connection loss.

use std::fmt;

use serde::Serialize;

/// Close code carried by the frame that ended the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "u16")]
pub enum CloseCode {
    /// `1000`: orderly shutdown.
    Normal,
    /// `1001`: the endpoint is going away.
    GoingAway,
    /// `4000`: the game on this endpoint is already in progress.
    GameInProgress,
    /// Any other code.
    Other(u16),
}

impl CloseCode {
    /// Info message used when the channel closes without a recognised code.
    pub const LOST_MESSAGE: &'static str = "Connection to the server was lost.";

    /// Numeric value as sent on the wire.
    pub fn code(self) -> u16 {
        match self {
            CloseCode::Normal => 1000,
            CloseCode::GoingAway => 1001,
            CloseCode::GameInProgress => 4000,
            CloseCode::Other(code) => code,
        }
    }

    /// Returns a human-readable description of this close code.
    pub fn description(self) -> &'static str {
        match self {
            CloseCode::Normal => "The connection was closed normally.",
            CloseCode::GoingAway => "The server is going away.",
            CloseCode::GameInProgress => "The game on this server has already started.",
            CloseCode::Other(_) => "The connection was closed unexpectedly.",
        }
    }

    /// Text shown to the player once the session has been reset.
    pub fn info_message(self) -> &'static str {
        match self {
            CloseCode::GameInProgress => "Game is already started.",
            _ => Self::LOST_MESSAGE,
        }
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        match code {
            1000 => CloseCode::Normal,
            1001 => CloseCode::GoingAway,
            4000 => CloseCode::GameInProgress,
            other => CloseCode::Other(other),
        }
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.code()
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.description())
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

    #[test]
    fn known_codes_round_trip_through_u16() {
        for code in [1000u16, 1001, 4000, 4321] {
            assert_eq!(CloseCode::from(code).code(), code);
        }
        assert_eq!(CloseCode::from(4321), CloseCode::Other(4321));
    }

    #[test]
    fn game_in_progress_has_its_own_message() {
        assert_eq!(
            CloseCode::from(4000).info_message(),
            "Game is already started."
        );
        assert_eq!(CloseCode::Normal.info_message(), CloseCode::LOST_MESSAGE);
    }

    #[test]
    fn serializes_as_number() {
        assert_eq!(
            serde_json::to_string(&CloseCode::GameInProgress).unwrap(),
            "4000"
        );
    }
}
