//! Engine.IO v4 / Socket.IO v5 text framing
//!
//! Only the subset the chat channel needs is implemented: text frames over a
//! WebSocket, the default namespace, no binary attachments.
//!
//! ```text
//! 0{"sid":..,"pingInterval":..}   engine open
//! 2 / 3                           engine ping / pong
//! 40                              socket connect (default namespace)
//! 42["new_message",{...}]         socket event
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::chat::events::{ClientEvent, ServerEvent};
use crate::error::{Result, StudyflowError};

/// Frame sent to answer an engine ping.
pub const PONG: &str = "3";

/// Frame sent to connect the default namespace after the engine handshake.
pub const CONNECT: &str = "40";

/// Frame sent to leave the default namespace before closing.
pub const DISCONNECT: &str = "41";

/// Engine.IO open handshake.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

/// A decoded Engine.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Message(SocketPacket),
    Upgrade,
    Noop,
}

/// A decoded Socket.IO packet carried in an engine `message`.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect,
    Disconnect,
    Event { name: String, payload: Value },
    Ack,
    ConnectError(String),
}

/// Encode a client event as a Socket.IO event frame.
///
/// # Examples
///
/// ```
/// use studyflow::chat::codec::encode_event;
/// use studyflow::chat::events::ClientEvent;
///
/// let frame = encode_event(&ClientEvent::LeaveChat { chat_id: "c1".into() });
/// assert_eq!(frame, r#"42["leave_chat",{"chat_id":"c1"}]"#);
/// ```
pub fn encode_event(event: &ClientEvent) -> String {
    let array = Value::Array(vec![Value::String(event.name().to_string()), event.payload()]);
    format!("42{}", array)
}

/// Decode one text frame.
///
/// # Errors
///
/// Returns [`StudyflowError::Protocol`] for an empty frame, an unknown
/// packet type, or a malformed payload.
pub fn decode(frame: &str) -> Result<EnginePacket> {
    let mut chars = frame.chars();
    let kind = chars
        .next()
        .ok_or_else(|| StudyflowError::Protocol("Empty frame".to_string()))?;
    let rest = chars.as_str();

    let packet = match kind {
        '0' => {
            let handshake: Handshake = serde_json::from_str(rest)
                .map_err(|e| StudyflowError::Protocol(format!("Bad open packet: {}", e)))?;
            EnginePacket::Open(handshake)
        }
        '1' => EnginePacket::Close,
        '2' => EnginePacket::Ping,
        '3' => EnginePacket::Pong,
        '4' => EnginePacket::Message(decode_socket(rest)?),
        '5' => EnginePacket::Upgrade,
        '6' => EnginePacket::Noop,
        other => {
            return Err(
                StudyflowError::Protocol(format!("Unknown engine packet type: {}", other)).into(),
            )
        }
    };
    Ok(packet)
}

fn decode_socket(body: &str) -> Result<SocketPacket> {
    let mut chars = body.chars();
    let kind = chars
        .next()
        .ok_or_else(|| StudyflowError::Protocol("Empty socket packet".to_string()))?;
    let rest = skip_namespace(chars.as_str());

    let packet = match kind {
        '0' => SocketPacket::Connect,
        '1' => SocketPacket::Disconnect,
        '2' => {
            // Optional ack id precedes the payload array.
            let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());
            let (name, payload) = decode_event_array(rest)?;
            SocketPacket::Event { name, payload }
        }
        '3' => SocketPacket::Ack,
        '4' => {
            let message = serde_json::from_str::<Value>(rest)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| rest.to_string());
            SocketPacket::ConnectError(message)
        }
        other => {
            return Err(
                StudyflowError::Protocol(format!("Unknown socket packet type: {}", other)).into(),
            )
        }
    };
    Ok(packet)
}

/// Strip a `/namespace,` prefix if present.
fn skip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        match body.find(',') {
            Some(idx) => &body[idx + 1..],
            None => "",
        }
    } else {
        body
    }
}

fn decode_event_array(body: &str) -> Result<(String, Value)> {
    let array: Vec<Value> = serde_json::from_str(body)
        .map_err(|e| StudyflowError::Protocol(format!("Bad event payload: {}", e)))?;
    let mut items = array.into_iter();
    let name = match items.next() {
        Some(Value::String(name)) => name,
        _ => return Err(StudyflowError::Protocol("Event without a name".to_string()).into()),
    };
    let payload = items.next().unwrap_or(Value::Null);
    Ok((name, payload))
}

/// What the channel should do with a decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameAction {
    /// Send these frames back to the server.
    Reply(&'static str),
    /// Hand this event to the chat loop.
    Deliver(ServerEvent),
    /// Handshake accepted; send the namespace connect.
    Opened(Handshake),
    /// Nothing to do.
    Ignore,
}

/// Decide how to react to one inbound frame.
///
/// # Errors
///
/// Propagates decoding failures; unknown event names are not errors. A
/// refused namespace connect is not an error either: it is delivered as
/// [`ServerEvent::Disconnected`] so the chat loop can report it.
pub fn interpret(frame: &str) -> Result<FrameAction> {
    let action = match decode(frame)? {
        EnginePacket::Open(handshake) => FrameAction::Opened(handshake),
        EnginePacket::Ping => FrameAction::Reply(PONG),
        EnginePacket::Close => FrameAction::Deliver(ServerEvent::Disconnected {
            reason: "server closed the connection".to_string(),
        }),
        EnginePacket::Message(SocketPacket::Connect) => FrameAction::Deliver(ServerEvent::Connected),
        EnginePacket::Message(SocketPacket::Disconnect) => {
            FrameAction::Deliver(ServerEvent::Disconnected {
                reason: "namespace disconnected".to_string(),
            })
        }
        EnginePacket::Message(SocketPacket::ConnectError(message)) => {
            FrameAction::Deliver(ServerEvent::Disconnected {
                reason: format!("Connection refused: {}", message),
            })
        }
        EnginePacket::Message(SocketPacket::Event { name, payload }) => {
            FrameAction::Deliver(ServerEvent::from_parts(&name, payload)?)
        }
        EnginePacket::Message(SocketPacket::Ack)
        | EnginePacket::Pong
        | EnginePacket::Upgrade
        | EnginePacket::Noop => FrameAction::Ignore,
    };
    Ok(action)
}
