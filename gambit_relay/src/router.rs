// Message router: the hub-side entry point for everything a connection does.
//
// `Router` owns the `ConnectionRegistry` and the `RoomManager` and exposes
// three operations that mirror the server's internal events:
// - `connect`: a new connection is registered and given an identity;
// - `handle_text`: one inbound frame is decoded and dispatched;
// - `disconnect`: the connection is unregistered and every room it sat in is
//   told.
//
// Every request either succeeds (and the room/session sends whatever it
// sends) or fails with a `RelayError`, which becomes exactly one `ERROR`
// message to the requesting connection. Decoding happens before any state is
// touched, so a malformed frame can never half-apply.
//
// Handler panics are caught here and reported as a generic internal error so
// a bug in one request does not take down the hub task and every room with
// it.

use std::panic::{self, AssertUnwindSafe};

use gambit_protocol::{ClientMessage, Identity, ServerMessage, decode_client};
use tracing::{debug, error, info};

use crate::error::{RelayError, RelayResult};
use crate::oracle::RulesOracle;
use crate::registry::{ConnectionHandle, ConnectionId, ConnectionRegistry};
use crate::rooms::RoomManager;

pub struct Router<R: RulesOracle> {
    registry: ConnectionRegistry,
    rooms: RoomManager<R>,
}

impl<R: RulesOracle> Router<R> {
    pub fn new(rooms: RoomManager<R>) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            rooms,
        }
    }

    /// Register a new connection and return its assigned identity.
    pub fn connect(&mut self, handle: ConnectionHandle) -> Identity {
        let connection = handle.id;
        let identity = self.registry.register(handle);
        info!(%connection, %identity, "identity assigned");
        identity
    }

    /// Tear down a connection. Unknown connections are ignored.
    pub fn disconnect(&mut self, connection: ConnectionId) -> Option<Identity> {
        let identity = self.registry.unregister(connection)?;
        let rooms = self.rooms.handle_disconnect(&identity, &self.registry);
        info!(%connection, %identity, rooms_left = rooms.len(), "identity released");
        Some(identity)
    }

    /// Decode and dispatch one inbound frame.
    pub fn handle_text(&mut self, connection: ConnectionId, text: &str) {
        let result = decode_client(text)
            .map_err(RelayError::from)
            .and_then(|msg| self.dispatch_guarded(connection, msg));

        if let Err(err) = result {
            debug!(%connection, error = %err, "request rejected");
            self.registry
                .send_to_connection(connection, &ServerMessage::error(err.to_string()));
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn rooms(&self) -> &RoomManager<R> {
        &self.rooms
    }

    fn dispatch_guarded(
        &mut self,
        connection: ConnectionId,
        msg: ClientMessage,
    ) -> RelayResult<()> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(connection, msg))) {
            Ok(result) => result,
            Err(_) => {
                error!(%connection, "request handler panicked");
                Err(RelayError::Internal)
            }
        }
    }

    fn dispatch(&mut self, connection: ConnectionId, msg: ClientMessage) -> RelayResult<()> {
        let Some(identity) = self.registry.resolve(connection).cloned() else {
            debug!(%connection, "request from unregistered connection dropped");
            return Ok(());
        };

        match msg {
            ClientMessage::SetUsername { username } => {
                let username = username.trim();
                if identity.as_str() != username && self.rooms.is_seated(&identity) {
                    return Err(RelayError::AlreadySeated);
                }
                let claimed = self.registry.claim(connection, username)?;
                info!(%connection, from = %identity, to = %claimed, "username claimed");
                self.registry.send(
                    &claimed,
                    &ServerMessage::Username {
                        message: format!("Welcome, {claimed}"),
                    },
                );
            }
            ClientMessage::CreateRoom => {
                let room_id = self.rooms.create_room(identity.clone())?;
                self.registry
                    .send(&identity, &ServerMessage::RoomCreated { room_id });
            }
            ClientMessage::JoinRoom { room_id } => {
                self.rooms.join_room(identity, room_id, &self.registry)?;
            }
            ClientMessage::Move { room_id, payload } => {
                self.rooms
                    .route_move(&identity, room_id, payload, &self.registry)?;
            }
        }
        Ok(())
    }
}
