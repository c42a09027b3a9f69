// JSON text-frame codec for WebSocket messages.
//
// Each WebSocket text frame carries exactly one JSON object. The transport
// (tungstenite) already delimits frames, so this module only handles the
// size guard and the JSON layer: `encode_*` turn messages into frame text and
// `decode_*` turn frame text back into messages.
//
// `decode_client` is stricter than a plain `serde_json::from_str`. It checks
// the `type` tag before deserializing the variant so the relay can tell a
// client "unknown message type" apart from "known type with a bad shape",
// and it rejects blank usernames, which serde alone would accept.
//
// A `MAX_MESSAGE_SIZE` constant (64 KiB) protects against oversized frames.
// The largest legitimate message is a move object, which is well under 1 KiB.

use serde_json::Value;
use thiserror::Error;

use crate::message::{ClientMessage, ServerMessage};

/// Maximum accepted frame size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Reasons an inbound frame could not be turned into a message. The
/// `Display` text is what the client sees in the `ERROR` reply.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Message too large: {len} bytes (max {MAX_MESSAGE_SIZE})")]
    TooLarge { len: usize },
    #[error("Malformed message: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("Message has no \"type\" field")]
    MissingType,
    #[error("Unknown message type {0:?}")]
    UnknownType(String),
    #[error("Invalid {kind} message: {source}")]
    InvalidShape {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Username must not be empty")]
    EmptyUsername,
}

/// Serialize a `ServerMessage` to frame text.
pub fn encode_server(msg: &ServerMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}

/// Serialize a `ClientMessage` to frame text.
pub fn encode_client(msg: &ClientMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}

/// Parse and validate a frame received from a client.
pub fn decode_client(text: &str) -> Result<ClientMessage, ProtocolError> {
    check_size(text)?;
    let value: Value = serde_json::from_str(text).map_err(ProtocolError::Malformed)?;

    let kind = match value.get("type").and_then(Value::as_str) {
        Some(kind) => kind.to_owned(),
        None => return Err(ProtocolError::MissingType),
    };
    if !ClientMessage::TYPES.contains(&kind.as_str()) {
        return Err(ProtocolError::UnknownType(kind));
    }

    let msg: ClientMessage = serde_json::from_value(value)
        .map_err(|source| ProtocolError::InvalidShape { kind, source })?;

    if let ClientMessage::SetUsername { username } = &msg
        && username.trim().is_empty()
    {
        return Err(ProtocolError::EmptyUsername);
    }
    Ok(msg)
}

/// Parse a frame received from the relay.
pub fn decode_server(text: &str) -> Result<ServerMessage, ProtocolError> {
    check_size(text)?;
    serde_json::from_str(text).map_err(ProtocolError::Malformed)
}

fn check_size(text: &str) -> Result<(), ProtocolError> {
    if text.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::TooLarge { len: text.len() });
    }
    Ok(())
}
