// Connection registry: the two-way map between live connections and the
// identities the rest of the relay knows them by.
//
// This is the only place a sendable handle (`ConnectionHandle`) is stored.
// Sessions and the room manager hold `Identity` values and resolve them here
// at the moment of sending, so a departed connection can never be written to
// through a stale handle held elsewhere.
//
// Identities start as relay-assigned tokens (`player-1a2b3c4d`) and can be
// replaced by a claimed username. Registration never fails; unregistering an
// unknown connection is a no-op so a double disconnect is harmless.

use std::collections::HashMap;
use std::fmt;

use gambit_protocol::{Identity, ServerMessage};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::error::{RelayError, RelayResult};

/// Transport-level connection number, assigned by the server per accept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Write side of a connection: messages pushed here are serialized and sent
/// by that connection's writer task.
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    outbox: UnboundedSender<ServerMessage>,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, outbox: UnboundedSender<ServerMessage>) -> Self {
        Self { id, outbox }
    }

    /// Queue a message. Returns false if the writer side is gone.
    fn send(&self, msg: &ServerMessage) -> bool {
        self.outbox.send(msg.clone()).is_ok()
    }
}

#[derive(Default)]
pub struct ConnectionRegistry {
    identities: HashMap<ConnectionId, Identity>,
    handles: HashMap<Identity, ConnectionHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a fresh identity to the connection and return it.
    pub fn register(&mut self, handle: ConnectionHandle) -> Identity {
        let identity = loop {
            let candidate = generate_identity();
            if !self.handles.contains_key(&candidate) {
                break candidate;
            }
        };
        self.identities.insert(handle.id, identity.clone());
        self.handles.insert(identity.clone(), handle);
        identity
    }

    pub fn resolve(&self, connection: ConnectionId) -> Option<&Identity> {
        self.identities.get(&connection)
    }

    /// Remove the connection's binding, returning the identity it freed.
    pub fn unregister(&mut self, connection: ConnectionId) -> Option<Identity> {
        let identity = self.identities.remove(&connection)?;
        self.handles.remove(&identity);
        Some(identity)
    }

    /// Rebind the connection to `username`. Claiming the name the connection
    /// already holds succeeds without change.
    pub fn claim(&mut self, connection: ConnectionId, username: &str) -> RelayResult<Identity> {
        let current = self
            .identities
            .get(&connection)
            .cloned()
            .ok_or(RelayError::Internal)?;
        if current.as_str() == username {
            return Ok(current);
        }

        let claimed = Identity::from(username);
        if self.handles.contains_key(&claimed) {
            return Err(RelayError::UsernameTaken);
        }

        let handle = self.handles.remove(&current).ok_or(RelayError::Internal)?;
        self.handles.insert(claimed.clone(), handle);
        self.identities.insert(connection, claimed.clone());
        Ok(claimed)
    }

    /// Fire-and-forget send to whichever connection holds `identity`.
    pub fn send(&self, identity: &Identity, msg: &ServerMessage) {
        match self.handles.get(identity) {
            Some(handle) => {
                if !handle.send(msg) {
                    debug!(%identity, "dropping message for closed connection");
                }
            }
            None => debug!(%identity, "dropping message for unknown identity"),
        }
    }

    /// Send to a connection by transport id (used for replies to requests
    /// that failed before an identity could be involved).
    pub fn send_to_connection(&self, connection: ConnectionId, msg: &ServerMessage) {
        match self.identities.get(&connection) {
            Some(identity) => self.send(identity, msg),
            None => debug!(%connection, "dropping message for unregistered connection"),
        }
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

fn generate_identity() -> Identity {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    Identity(format!("player-{}", &uuid[..8]))
}
