// Core ID and value types for the relay protocol.
//
// These are lightweight newtypes shared by `message.rs` (protocol messages)
// and the relay's registry/session code (`gambit_relay`). `RoomId` is the
// short human-readable room code; `Identity` is the token a connection is
// known by (either relay-assigned or a claimed username). Both serialize as
// their bare inner value so the JSON stays compatible with browser clients.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Short numeric room code. Clients may send it as a JSON number or as a
/// numeric string (form inputs tend to produce the latter).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RoomId(pub u32);

impl<'de> Deserialize<'de> for RoomId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(RoomId(n)),
            Raw::Text(s) => s
                .trim()
                .parse()
                .map(RoomId)
                .map_err(|_| serde::de::Error::custom(format!("invalid room id {s:?}"))),
        }
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The name a connection is known by inside the relay. Sessions store
/// identities by value and never hold connection handles.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub String);

impl Identity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Identity(s.to_owned())
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Identity(s)
    }
}

/// Side assigned to a seat when a match starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// Seat 0 plays white, seat 1 plays black.
    pub fn for_slot(slot: usize) -> Self {
        if slot == 0 { Color::White } else { Color::Black }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => f.write_str("white"),
            Color::Black => f.write_str("black"),
        }
    }
}
