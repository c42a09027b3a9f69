// Request rejection taxonomy.
//
// Every way a client request can fail maps to one `RelayError` variant. None
// of them are fatal: the router turns each into a single `ERROR` message sent
// back to the originating connection, and the state the request targeted is
// left untouched. The `Display` text is the exact client-facing message.

use gambit_protocol::{ProtocolError, RoomId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// The frame could not be parsed into a known message.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("Room {0} does not exist")]
    RoomNotFound(RoomId),
    #[error("Room is full")]
    RoomFull,
    #[error("Username already in use")]
    UsernameTaken,
    #[error("Cannot change username while seated in a room")]
    AlreadySeated,
    #[error("It's not your turn")]
    OutOfTurn,
    #[error("Invalid move")]
    IllegalMove,
    #[error("Game is already over")]
    GameAlreadyOver,
    #[error("No free room codes available")]
    RoomAllocationExhausted,
    /// A handler panicked; details are logged, not sent.
    #[error("Internal server error")]
    Internal,
}

pub type RelayResult<T> = Result<T, RelayError>;
