// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Parley relay.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Opaque end-user identifier issued by the messaging platform.
///
/// This is the only partition key in the system: history, pacing tickets,
/// and logs are all keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        UserId(id.to_string())
    }
}

/// Unique identifier for a delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Author of a conversation turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single persisted exchange unit of a user's conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub user_id: UserId,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Creates a turn stamped with the current time.
    pub fn now(user_id: UserId, role: Role, content: impl Into<String>) -> Self {
        Self {
            user_id,
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// One entry of the conversation window sent to the completion API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl From<Turn> for ChatMessage {
    fn from(turn: Turn) -> Self {
        Self {
            role: turn.role,
            content: turn.content,
        }
    }
}

/// Pacing class of an inbound action. Each class has its own cooldown and
/// its own ticket per user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ActionClass {
    /// Free-text messages forwarded to the completion API.
    Message,
    /// Bot commands such as `/reset` or `/help`.
    Command,
}

impl ActionClass {
    /// Cache key of the rate-limit ticket for `user` in this class.
    pub fn ticket_key(&self, user: &UserId) -> String {
        format!("{self}_rate_limit:{user}")
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Provider,
    History,
}

/// An inbound message received from a channel adapter.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Platform message identifier.
    pub id: String,
    /// Channel name the message arrived on (e.g. "telegram").
    pub channel: String,
    /// Sender identity.
    pub sender: UserId,
    /// Message text.
    pub text: String,
    /// When the adapter received the message.
    pub received_at: DateTime<Utc>,
    /// Adapter-specific routing data (chat id and similar), JSON encoded.
    pub metadata: Option<String>,
}

/// An outbound message to be sent via a channel adapter.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    /// Channel name to send on.
    pub channel: String,
    /// Recipient identity.
    pub recipient: UserId,
    /// Message text.
    pub content: String,
    /// Optional parse mode hint ("HTML"); plain text when absent.
    pub parse_mode: Option<String>,
    /// Adapter-specific routing data copied from the inbound message.
    pub metadata: Option<String>,
}

impl OutboundMessage {
    /// Builds a plain-text reply to `inbound` on the same channel.
    pub fn reply_to(inbound: &InboundMessage, content: impl Into<String>) -> Self {
        Self {
            channel: inbound.channel.clone(),
            recipient: inbound.sender.clone(),
            content: content.into(),
            parse_mode: None,
            metadata: inbound.metadata.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trips_as_lowercase() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
        assert_eq!(Role::from_str("assistant").unwrap(), Role::Assistant);
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
    }

    #[test]
    fn ticket_keys_are_class_scoped() {
        let user = UserId::from(42_i64);
        assert_eq!(
            ActionClass::Message.ticket_key(&user),
            "message_rate_limit:42"
        );
        assert_eq!(
            ActionClass::Command.ticket_key(&user),
            "command_rate_limit:42"
        );
    }

    #[test]
    fn turn_converts_to_chat_message() {
        let turn = Turn::now(UserId::from("u1"), Role::User, "hi");
        let msg = ChatMessage::from(turn);
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "hi");
    }

    #[test]
    fn reply_to_copies_routing() {
        let inbound = InboundMessage {
            id: "1".into(),
            channel: "telegram".into(),
            sender: UserId::from("7"),
            text: "hello".into(),
            received_at: Utc::now(),
            metadata: Some(r#"{"chat_id":7}"#.into()),
        };
        let out = OutboundMessage::reply_to(&inbound, "hey");
        assert_eq!(out.channel, "telegram");
        assert_eq!(out.recipient, UserId::from("7"));
        assert_eq!(out.metadata, inbound.metadata);
        assert!(out.parse_mode.is_none());
    }
}
