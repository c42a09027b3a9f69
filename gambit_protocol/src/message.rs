// Protocol messages for client-relay communication.
//
// Two enums define the full protocol vocabulary:
// - `ClientMessage`: sent by players to the relay.
// - `ServerMessage`: sent by the relay to players.
//
// Both are internally tagged on a `type` field with SCREAMING_SNAKE_CASE
// names (`{"type": "JOIN_ROOM", "roomId": 42}`), which is the format the
// browser clients already speak. Field names that are camelCase or Rust
// keywords on the wire (`roomId`, `move`) are renamed per field.
//
// Move payloads are opaque `serde_json::Value`s. The relay hands them to the
// rules oracle and echoes them back verbatim in the `MOVE` broadcast; the
// protocol crate never interprets them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{Color, Identity, RoomId};

/// Messages sent by a client to the relay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Claim a display name as this connection's identity.
    SetUsername { username: String },
    /// Open a new room with the sender in the first seat.
    CreateRoom,
    /// Take a seat in an existing room. Older clients send `id`.
    JoinRoom {
        #[serde(rename = "roomId", alias = "id")]
        room_id: RoomId,
    },
    /// Submit a move in a room.
    Move {
        #[serde(rename = "roomId")]
        room_id: RoomId,
        #[serde(rename = "move")]
        payload: Value,
    },
}

impl ClientMessage {
    /// Wire names of every client message type, in declaration order.
    pub const TYPES: [&'static str; 4] = ["SET_USERNAME", "CREATE_ROOM", "JOIN_ROOM", "MOVE"];
}

/// Messages sent by the relay to a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Username claim accepted.
    Username { message: String },
    /// Room allocated; the sender occupies the first seat.
    RoomCreated {
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },
    /// Informational room event (a player joined).
    Notification { message: String },
    /// Both seats are filled; the match starts with this side.
    InitGame { color: Color },
    /// A move was accepted and applied.
    Move {
        user: Identity,
        #[serde(rename = "move")]
        payload: Value,
    },
    /// The match concluded.
    GameOver { payload: GameOverPayload },
    /// A room peer disconnected.
    Disconnect { message: String },
    /// The request was rejected. Only ever sent to the requester.
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

/// Result of a finished match. `winner` is `null` on a draw.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameOverPayload {
    pub winner: Option<Identity>,
    pub reason: GameOverReason,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameOverReason {
    Checkmate,
    Draw,
}
