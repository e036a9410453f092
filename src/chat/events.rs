//! Typed chat events exchanged over the event channel
//!
//! [`ClientEvent`] is everything the client emits; [`ServerEvent`] is
//! everything it reacts to. Conversion to and from `(name, payload)` pairs
//! lives here so that the codec only deals with framing.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::types::{Message, MessageType};
use crate::error::{Result, StudyflowError};

/// A typing indicator for one participant in one session.
///
/// Never stored; the tracker derives a single boolean from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingSignal {
    pub chat_id: String,
    pub user_id: String,
    pub is_typing: bool,
}

/// Events emitted by the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Subscribe to a session's broadcasts.
    JoinChat { chat_id: String, user_id: String },
    /// Unsubscribe from a session's broadcasts.
    LeaveChat { chat_id: String },
    /// Publish a message; the backend persists it and echoes `new_message`.
    SendMessage {
        chat_id: String,
        sender_id: String,
        content: String,
        message_type: MessageType,
    },
    /// Local typing state changed.
    Typing(TypingSignal),
    /// Everything not sent by `user_id` in `chat_id` has been read.
    MarkRead { chat_id: String, user_id: String },
}

impl ClientEvent {
    /// Event name on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinChat { .. } => "join_chat",
            Self::LeaveChat { .. } => "leave_chat",
            Self::SendMessage { .. } => "send_message",
            Self::Typing(_) => "typing",
            Self::MarkRead { .. } => "mark_read",
        }
    }

    /// Event payload on the wire.
    pub fn payload(&self) -> Value {
        match self {
            Self::JoinChat { chat_id, user_id } | Self::MarkRead { chat_id, user_id } => {
                json!({ "chat_id": chat_id, "user_id": user_id })
            }
            Self::LeaveChat { chat_id } => json!({ "chat_id": chat_id }),
            Self::SendMessage {
                chat_id,
                sender_id,
                content,
                message_type,
            } => json!({
                "chat_id": chat_id,
                "sender_id": sender_id,
                "content": content,
                "message_type": message_type,
            }),
            Self::Typing(signal) => json!({
                "chat_id": signal.chat_id,
                "user_id": signal.user_id,
                "is_typing": signal.is_typing,
            }),
        }
    }

    /// Session the event refers to.
    pub fn chat_id(&self) -> &str {
        match self {
            Self::JoinChat { chat_id, .. }
            | Self::LeaveChat { chat_id }
            | Self::SendMessage { chat_id, .. }
            | Self::MarkRead { chat_id, .. } => chat_id,
            Self::Typing(signal) => &signal.chat_id,
        }
    }
}

/// Events received from the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// The Socket.IO namespace connection was accepted.
    Connected,
    /// The connection ended; no further events follow.
    Disconnected { reason: String },
    /// A persisted message broadcast to a session room.
    NewMessage(Message),
    /// The other participant's typing state. Carries no session id: it
    /// belongs to whichever session is joined when it arrives.
    UserTyping { user_id: String, is_typing: bool },
    /// `user_id` has read everything sent to them in the joined session.
    MessagesRead { user_id: String },
    /// Any other event name.
    Unknown { name: String },
}

#[derive(Deserialize)]
struct UserTypingPayload {
    user_id: String,
    #[serde(default = "default_true")]
    is_typing: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct MessagesReadPayload {
    user_id: String,
}

impl ServerEvent {
    /// Build a typed event from a decoded `(name, payload)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`StudyflowError::Protocol`] when a known event carries a
    /// payload of the wrong shape.
    pub fn from_parts(name: &str, payload: Value) -> Result<Self> {
        let malformed =
            |e: serde_json::Error| StudyflowError::Protocol(format!("Malformed {}: {}", name, e));
        let event = match name {
            "new_message" => Self::NewMessage(serde_json::from_value(payload).map_err(malformed)?),
            "user_typing" => {
                let p: UserTypingPayload = serde_json::from_value(payload).map_err(malformed)?;
                Self::UserTyping {
                    user_id: p.user_id,
                    is_typing: p.is_typing,
                }
            }
            "messages_read" => {
                let p: MessagesReadPayload = serde_json::from_value(payload).map_err(malformed)?;
                Self::MessagesRead { user_id: p.user_id }
            }
            other => Self::Unknown {
                name: other.to_string(),
            },
        };
        Ok(event)
    }
}
