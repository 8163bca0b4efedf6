//! JSON text codec for the message unions in [`protocol`](crate::protocol).
//!
//! Decoding happens in two steps so that the two failure modes stay apart:
//! the payload is first parsed into a [`serde_json::Value`] and its `type`
//! discriminator checked against [`ServerMessage::TAGS`], and only then is the
//! value converted into the typed message.

use serde_json::Value;

use crate::error::{DecodeError, Result};
use crate::protocol::{ClientMessage, ServerMessage};

/// Serialize an outbound message to a JSON text frame.
///
/// # Errors
///
/// Returns [`SessionError::Serialization`](crate::SessionError::Serialization)
/// if serialization fails.
pub fn encode(message: &ClientMessage) -> Result<String> {
    Ok(serde_json::to_string(message)?)
}

/// Decode an inbound JSON text frame.
///
/// # Errors
///
/// - [`DecodeError::Malformed`] for invalid JSON, a missing or non-string
///   `type`, or fields that do not fit the tag's schema.
/// - [`DecodeError::UnknownTag`] when `type` names no known message.
pub fn decode(text: &str) -> std::result::Result<ServerMessage, DecodeError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    decode_value(value)
}

/// Decode an inbound frame given as raw bytes.
///
/// # Errors
///
/// Same as [`decode`]; invalid UTF-8 is reported as [`DecodeError::Malformed`].
pub fn decode_slice(bytes: &[u8]) -> std::result::Result<ServerMessage, DecodeError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    decode_value(value)
}

fn decode_value(value: Value) -> std::result::Result<ServerMessage, DecodeError> {
    let Some(tag) = value.get("type").and_then(Value::as_str) else {
        return Err(DecodeError::Malformed(
            "missing string `type` discriminator".into(),
        ));
    };
    if !ServerMessage::TAGS.contains(&tag) {
        return Err(DecodeError::UnknownTag(tag.to_owned()));
    }
    serde_json::from_value(value).map_err(|e| DecodeError::Malformed(e.to_string()))
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
    use crate::protocol::{CellIndex, Sign};

    #[test]
    fn decodes_create_room() {
        let msg = decode(r#"{"type":"create_room","room_id":3,"sign":"x"}"#).unwrap();
        assert_eq!(
            msg,
            ServerMessage::CreateRoom {
                room_id: 3,
                sign: Sign::X
            }
        );
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = decode("{not json").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn missing_type_is_malformed() {
        let err = decode(r#"{"room_id":3}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn non_object_is_malformed() {
        assert!(matches!(
            decode("[1,2,3]").unwrap_err(),
            DecodeError::Malformed(_)
        ));
    }

    #[test]
    fn unknown_tag_is_reported_by_name() {
        let err = decode(r#"{"type":"teleport","to":4}"#).unwrap_err();
        assert_eq!(err, DecodeError::UnknownTag("teleport".into()));
    }

    #[test]
    fn known_tag_with_bad_fields_is_malformed() {
        let err = decode(r#"{"type":"update_board","board":[["x"]]}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));

        let err = decode(r#"{"type":"win_round","sign":"x","cells":[0,4,9]}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn decode_slice_rejects_invalid_utf8() {
        let err = decode_slice(&[0xff, 0xfe, 0x7b]).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn encode_move() {
        let text = encode(&ClientMessage::Move {
            room_id: 9,
            sign: Sign::O,
            cell: CellIndex::new(4).unwrap(),
        })
        .unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "move");
        assert_eq!(value["cell"], 4);
        assert_eq!(value["sign"], "o");
    }

    #[test]
    fn encode_unit_requests_carry_only_the_tag() {
        assert_eq!(
            encode(&ClientMessage::GetOpenRooms).unwrap(),
            r#"{"type":"get_open_rooms"}"#
        );
        assert_eq!(
            encode(&ClientMessage::LeaveRoom).unwrap(),
            r#"{"type":"leave_room"}"#
        );
    }
}
