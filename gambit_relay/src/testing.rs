// Shared fixtures for unit tests: a scripted rules oracle and helpers that
// wire registry entries to in-memory outboxes.

use gambit_protocol::{Identity, ServerMessage};
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::oracle::{MoveRejected, RulesOracle};
use crate::registry::{ConnectionHandle, ConnectionId, ConnectionRegistry};

/// Oracle driven by the move text itself:
/// - any string starting with `illegal` is rejected, as is any non-string;
/// - a move ending in `#` is checkmate;
/// - `draw` and `stalemate` end the game the way their names say.
pub(crate) struct ScriptedOracle;

impl RulesOracle for ScriptedOracle {
    type Board = Vec<String>;

    fn new_board(&self) -> Vec<String> {
        Vec::new()
    }

    fn apply(&self, board: &Vec<String>, mv: &Value) -> Result<Vec<String>, MoveRejected> {
        let text = mv.as_str().ok_or(MoveRejected)?;
        if text.starts_with("illegal") {
            return Err(MoveRejected);
        }
        let mut next = board.clone();
        next.push(text.to_owned());
        Ok(next)
    }

    fn is_checkmate(&self, board: &Vec<String>) -> bool {
        board.last().is_some_and(|m| m.ends_with('#'))
    }

    fn is_draw(&self, board: &Vec<String>) -> bool {
        board.last().is_some_and(|m| m == "draw")
    }

    fn is_stalemate(&self, board: &Vec<String>) -> bool {
        board.last().is_some_and(|m| m == "stalemate")
    }
}

/// Register a connection under `name` and return its id, identity and inbox.
pub(crate) fn connect(
    registry: &mut ConnectionRegistry,
    id: u64,
    name: &str,
) -> (ConnectionId, Identity, UnboundedReceiver<ServerMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let connection = ConnectionId(id);
    registry.register(ConnectionHandle::new(connection, tx));
    let identity = registry.claim(connection, name).unwrap();
    (connection, identity, rx)
}

/// Everything currently queued in an inbox.
pub(crate) fn drain(rx: &mut UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut messages = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        messages.push(msg);
    }
    messages
}
