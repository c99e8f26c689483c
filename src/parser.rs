//! Socket frame codec and event payload decoding
//!
//! The venue pushes events over Socket.IO, which rides on Engine.IO text
//! frames. Only the subset the interactive feed uses is understood here:
//! open/close/ping/pong at the Engine.IO layer and connect, disconnect,
//! event and connect-error at the Socket.IO layer.

use crate::{data::EventKind, error::SdkError};
use serde::Deserialize;
use serde_json::Value;

/// Engine.IO open handshake body
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

/// One Engine.IO text frame
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(SocketPacket),
    Upgrade,
    Noop,
}

/// Socket.IO packet carried inside an Engine.IO message frame
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect(Value),
    Disconnect,
    Event { name: String, data: Value },
    Ack(Value),
    ConnectError(Value),
}

/// Decode a single text frame
pub fn decode_frame(text: &str) -> Result<EnginePacket, SdkError> {
    let (kind, body) = split_type(text)?;

    match kind {
        '0' => {
            let handshake: Handshake = serde_json::from_str(body)
                .map_err(|e| SdkError::decode(format!("Invalid open handshake: {}", e)))?;
            Ok(EnginePacket::Open(handshake))
        }
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping(body.to_string())),
        '3' => Ok(EnginePacket::Pong(body.to_string())),
        '4' => decode_socket_packet(body).map(EnginePacket::Message),
        '5' => Ok(EnginePacket::Upgrade),
        '6' => Ok(EnginePacket::Noop),
        other => Err(SdkError::decode(format!("Unknown engine packet type: {}", other))),
    }
}

fn decode_socket_packet(text: &str) -> Result<SocketPacket, SdkError> {
    let (kind, rest) = split_type(text)?;
    let data = packet_data(rest)?;

    match kind {
        '0' => Ok(SocketPacket::Connect(data)),
        '1' => Ok(SocketPacket::Disconnect),
        '2' => {
            let mut args = match data {
                Value::Array(args) => args.into_iter(),
                other => {
                    return Err(SdkError::decode(format!(
                        "Event packet is not an array: {}",
                        other
                    )))
                }
            };
            let name = match args.next() {
                Some(Value::String(name)) => name,
                _ => return Err(SdkError::decode("Event packet has no name")),
            };
            Ok(SocketPacket::Event {
                name,
                data: args.next().unwrap_or(Value::Null),
            })
        }
        '3' => Ok(SocketPacket::Ack(data)),
        '4' => Ok(SocketPacket::ConnectError(data)),
        '5' | '6' => Err(SdkError::decode("Binary packets are not supported")),
        other => Err(SdkError::decode(format!("Unknown socket packet type: {}", other))),
    }
}

fn split_type(text: &str) -> Result<(char, &str), SdkError> {
    match text.chars().next() {
        Some(c) if c.is_ascii_digit() => Ok((c, &text[1..])),
        Some(c) => Err(SdkError::decode(format!("Invalid packet type: {}", c))),
        None => Err(SdkError::decode("Empty frame")),
    }
}

/// Strip the optional `/namespace,` prefix and ack id, then parse the JSON
/// remainder (absent remainder is `null`).
fn packet_data(rest: &str) -> Result<Value, SdkError> {
    let mut rest = rest;
    if rest.starts_with('/') {
        rest = match rest.find(',') {
            Some(i) => &rest[i + 1..],
            None => "",
        };
    }
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());

    if rest.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(rest).map_err(|e| SdkError::decode(format!("Invalid packet body: {}", e)))
}

pub fn encode_ping() -> String {
    "2".to_string()
}

pub fn encode_pong(probe: &str) -> String {
    format!("3{}", probe)
}

pub fn encode_socket_connect() -> String {
    "40".to_string()
}

pub fn encode_socket_disconnect() -> String {
    "41".to_string()
}

/// Turn a raw event payload into the value handed to subscribers.
///
/// Order, trade and position payloads are JSON documents sent as strings
/// and are parsed; a payload that already arrived structured is passed
/// through. Every other kind is delivered as-is.
pub fn decode_event_payload(kind: EventKind, raw: Value) -> Result<Value, SdkError> {
    if !kind.carries_json_body() {
        return Ok(raw);
    }

    match raw {
        Value::String(text) => serde_json::from_str(&text)
            .map_err(|e| SdkError::decode(format!("Malformed {} payload: {}", kind, e))),
        Value::Null => Err(SdkError::decode(format!("Empty {} payload", kind))),
        structured => Ok(structured),
    }
}
