//! The room directory: joinable rooms plus the player's pending selection.
//!
//! The list is replaced wholesale on every update. A pending selection is
//! never validated against the list; the server decides whether a join is
//! legal and answers with `join_room_error` when it is not.

use serde::Serialize;
use tracing::debug;

use crate::error::UserInputError;
use crate::protocol::{ClientMessage, RoomId};

/// One joinable room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RoomSummary {
    pub room_id: RoomId,
}

impl From<RoomId> for RoomSummary {
    fn from(room_id: RoomId) -> Self {
        Self { room_id }
    }
}

/// Externally visible list of rooms, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomDirectory {
    rooms: Vec<RoomSummary>,
    pending: Option<RoomId>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list.
    pub fn apply_update(&mut self, rooms: impl IntoIterator<Item = RoomSummary>) {
        self.rooms = rooms.into_iter().collect();
        if let Some(pending) = self.pending {
            if !self.contains(pending) {
                debug!(room_id = pending, "pending selection no longer listed");
            }
        }
    }

    pub fn rooms(&self) -> &[RoomSummary] {
        &self.rooms
    }

    pub fn contains(&self, room_id: RoomId) -> bool {
        self.rooms.iter().any(|room| room.room_id == room_id)
    }

    /// Record the intent to join `room_id` and build the request for it.
    pub fn select(&mut self, room_id: RoomId) -> ClientMessage {
        self.pending = Some(room_id);
        ClientMessage::JoinRoom { room_id }
    }

    /// The room id the player last asked to join, if unanswered.
    pub fn pending(&self) -> Option<RoomId> {
        self.pending
    }

    pub fn clear_pending(&mut self) {
        self.pending = None;
    }
}

/// Parse free-form room-id input.
///
/// Accepts a non-empty, non-negative integer, surrounding whitespace allowed.
///
/// # Errors
///
/// Returns [`UserInputError::InvalidRoomId`] for anything else.
pub fn parse_room_input(input: &str) -> Result<RoomId, UserInputError> {
    input
        .trim()
        .parse::<RoomId>()
        .map_err(|_| UserInputError::InvalidRoomId {
            input: input.to_owned(),
        })
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

    fn summaries(ids: &[RoomId]) -> Vec<RoomSummary> {
        ids.iter().copied().map(RoomSummary::from).collect()
    }

    #[test]
    fn update_replaces_instead_of_merging() {
        let mut directory = RoomDirectory::new();
        directory.apply_update(summaries(&[1, 2]));
        directory.apply_update(summaries(&[]));
        directory.apply_update(summaries(&[5, 7]));
        assert_eq!(directory.rooms(), summaries(&[5, 7]).as_slice());
    }

    #[test]
    fn select_records_intent_without_validation() {
        let mut directory = RoomDirectory::new();
        directory.apply_update(summaries(&[5]));
        let request = directory.select(42);
        assert_eq!(request, ClientMessage::JoinRoom { room_id: 42 });
        assert_eq!(directory.pending(), Some(42));
        assert!(!directory.contains(42));

        directory.clear_pending();
        assert_eq!(directory.pending(), None);
    }

    #[test]
    fn stale_selection_survives_an_update() {
        let mut directory = RoomDirectory::new();
        directory.select(5);
        directory.apply_update(summaries(&[7]));
        assert_eq!(directory.pending(), Some(5));
    }

    #[test]
    fn room_input_must_be_a_non_negative_integer() {
        assert_eq!(parse_room_input(" 17 ").unwrap(), 17);
        assert_eq!(parse_room_input("0").unwrap(), 0);
        for bad in ["", "   ", "-3", "abc", "1.5"] {
            assert!(
                matches!(
                    parse_room_input(bad),
                    Err(UserInputError::InvalidRoomId { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
    }
}
