// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message filtering and conversion.
//!
//! Only private (DM) text messages with a sender are forwarded. Everything
//! else (groups, channels, stickers, photos, service messages) is dropped.

use parley_core::{InboundMessage, UserId};
use teloxide::prelude::*;
use teloxide::types::ChatKind;

/// Channel name stamped on inbound messages.
pub const CHANNEL_NAME: &str = "telegram";

/// Checks whether the message is from a private (DM) chat.
///
/// Group, supergroup, and channel messages return `false`.
pub fn is_dm(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}

/// Converts a Telegram message into an [`InboundMessage`].
///
/// Returns `None` when the message should be ignored: not a DM, no text, or
/// no sender.
pub fn to_inbound_message(msg: &Message) -> Option<InboundMessage> {
    if !is_dm(msg) {
        return None;
    }
    let text = msg.text()?;
    let sender = msg.from.as_ref()?;

    // Store chat_id in metadata for routing responses back
    let metadata = serde_json::json!({
        "chat_id": msg.chat.id.0.to_string(),
    })
    .to_string();

    Some(InboundMessage {
        id: msg.id.0.to_string(),
        channel: CHANNEL_NAME.to_string(),
        sender: UserId(sender.id.0.to_string()),
        text: text.to_string(),
        received_at: msg.date,
        metadata: Some(metadata),
    })
}

/// Reads `chat_id` from inbound metadata.
pub fn chat_id_from_metadata(metadata: Option<&str>) -> Option<i64> {
    let meta: serde_json::Value = serde_json::from_str(metadata?).ok()?;
    meta.get("chat_id")?.as_str()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a mock private chat message from JSON, matching Telegram Bot API structure.
    fn make_private_message(user_id: u64, text: Option<&str>) -> Message {
        let mut json = serde_json::json!({
            "message_id": 1,
            "date": 1700000000i64,
            "chat": {
                "id": user_id as i64,
                "type": "private",
                "first_name": "Test",
            },
            "from": {
                "id": user_id,
                "is_bot": false,
                "first_name": "Test",
            },
        });
        match text {
            Some(t) => json["text"] = serde_json::json!(t),
            None => {
                json["location"] = serde_json::json!({
                    "latitude": 52.52,
                    "longitude": 13.405,
                })
            }
        }

        serde_json::from_value(json).expect("failed to deserialize mock message")
    }

    /// Build a mock group chat message.
    fn make_group_message(user_id: u64, text: &str) -> Message {
        let json = serde_json::json!({
            "message_id": 1,
            "date": 1700000000i64,
            "chat": {
                "id": -100123i64,
                "type": "supergroup",
                "title": "Test Group",
            },
            "from": {
                "id": user_id,
                "is_bot": false,
                "first_name": "Test",
            },
            "text": text,
        });

        serde_json::from_value(json).expect("failed to deserialize mock group message")
    }

    #[test]
    fn is_dm_private_chat() {
        assert!(is_dm(&make_private_message(12345, Some("hello"))));
    }

    #[test]
    fn is_dm_group_chat() {
        assert!(!is_dm(&make_group_message(12345, "hello")));
    }

    #[test]
    fn private_text_maps_fields() {
        let msg = make_private_message(12345, Some("hello"));
        let inbound = to_inbound_message(&msg).unwrap();

        assert_eq!(inbound.id, "1");
        assert_eq!(inbound.channel, "telegram");
        assert_eq!(inbound.sender, UserId::from("12345"));
        assert_eq!(inbound.text, "hello");
        assert_eq!(inbound.received_at.timestamp(), 1_700_000_000);
        assert_eq!(chat_id_from_metadata(inbound.metadata.as_deref()), Some(12345));
    }

    #[test]
    fn group_messages_are_dropped() {
        assert!(to_inbound_message(&make_group_message(12345, "hello")).is_none());
    }

    #[test]
    fn non_text_messages_are_dropped() {
        assert!(to_inbound_message(&make_private_message(12345, None)).is_none());
    }

    #[test]
    fn chat_id_from_bad_metadata_is_none() {
        assert_eq!(chat_id_from_metadata(None), None);
        assert_eq!(chat_id_from_metadata(Some("not json")), None);
        assert_eq!(chat_id_from_metadata(Some(r#"{"chat_id":"x"}"#)), None);
    }
}
