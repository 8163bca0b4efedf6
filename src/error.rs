//! Error types for the tic-tac-toe session client.
//!
//! Four kinds of failure exist, and none of them is fatal to a session:
//!
//! - [`SessionError`]: transport and serialization failures at the edges.
//! - [`DecodeError`]: an inbound payload that is not a known message.
//! - [`ProtocolViolation`]: a well-formed message that is illegal in the
//!   current [`Phase`].
//! - [`UserInputError`]: a local intent rejected by the turn gate.

use serde::Serialize;
use thiserror::Error;

use crate::protocol::CellIndex;
use crate::state::Phase;

/// Errors that can occur when using the session client.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed unexpectedly.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize an outbound protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An inbound message could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The session loop has exited, so no command can be queued.
    #[error("not connected to server")]
    NotConnected,

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why an inbound payload was discarded before dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Invalid JSON, a missing `type` discriminator, or fields that do not
    /// match the schema of a known tag.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// The `type` discriminator names no known message kind.
    #[error("unknown message tag `{0}`")]
    UnknownTag(String),
}

/// A well-formed server message that is not legal in the current phase.
///
/// The dispatcher logs these and leaves the session untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("`{tag}` is not valid while {phase}")]
pub struct ProtocolViolation {
    /// Wire tag of the offending message.
    pub tag: &'static str,
    /// Phase the session was in when the message arrived.
    pub phase: Phase,
}

/// A local intent rejected before anything was sent to the server.
///
/// The `Display` text is what the session shows as its info message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UserInputError {
    /// The room-id input was empty or not a non-negative integer.
    #[error("Wrong room id!")]
    InvalidRoomId { input: String },

    /// The cell index is outside `0..=8`.
    #[error("Cell {cell} is not on the board.")]
    CellOutOfRange { cell: u8 },

    /// The target cell already carries a mark.
    #[error("You can't move in this cell.")]
    CellOccupied { cell: CellIndex },

    /// No round is being played.
    #[error("The round has not started yet.")]
    NotPlaying,

    /// A round is being played but it is not the local player's turn.
    #[error("Wait for your turn.")]
    NotYourTurn,

    /// The intent requires room membership.
    #[error("You are not in a room.")]
    NotInRoom,

    /// The intent requires the player to be in the lobby.
    #[error("You are already in a room.")]
    AlreadyInRoom,
}

/// A specialized [`Result`] type for session client operations.
pub type Result<T> = std::result::Result<T, SessionError>;

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
    fn user_input_messages_match_the_lobby_wording() {
        let err = UserInputError::InvalidRoomId {
            input: "-1".into(),
        };
        assert_eq!(err.to_string(), "Wrong room id!");
        assert_eq!(UserInputError::NotYourTurn.to_string(), "Wait for your turn.");
    }

    #[test]
    fn protocol_violation_names_tag_and_phase() {
        let violation = ProtocolViolation {
            tag: "update_board",
            phase: Phase::RoomWaiting,
        };
        assert_eq!(
            violation.to_string(),
            "`update_board` is not valid while room-waiting"
        );
    }

    #[test]
    fn decode_error_converts_into_session_error() {
        let err: SessionError = DecodeError::UnknownTag("teleport".into()).into();
        assert!(matches!(err, SessionError::Decode(DecodeError::UnknownTag(_))));
        assert_eq!(err.to_string(), "unknown message tag `teleport`");
    }

    #[test]
    fn user_input_error_serializes_with_kind_tag() {
        let json = serde_json::to_value(UserInputError::CellOutOfRange { cell: 12 }).unwrap();
        assert_eq!(json["kind"], "cell_out_of_range");
        assert_eq!(json["cell"], 12);
    }
}
