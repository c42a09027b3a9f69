// Room manager: owns every live `GameSession`, keyed by room code.
//
// Rooms are created on request, looked up for joins and moves, and dropped
// as soon as their last player disconnects. Lookups of a missing room return
// `RoomNotFound` to the caller; nothing is broadcast in that case.
//
// Room codes are drawn from a small human-readable range
// (`0..room_id_space`). A random draw that hits a live room is retried, and
// if every random attempt collides the range is scanned for the first free
// code, so a live room is never overwritten. Only a completely full range
// fails the request.

use std::collections::BTreeMap;

use gambit_protocol::{Identity, RoomId, ServerMessage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{RelayError, RelayResult};
use crate::oracle::RulesOracle;
use crate::registry::ConnectionRegistry;
use crate::session::{GameSession, MatchStatus};

/// Default number of distinct room codes (`0000` to `9999`).
pub const DEFAULT_ROOM_ID_SPACE: u32 = 10_000;

/// Random draws before falling back to a linear scan.
const RANDOM_ATTEMPTS: usize = 32;

pub struct RoomManager<R: RulesOracle> {
    oracle: R,
    rooms: BTreeMap<RoomId, GameSession<R::Board>>,
    id_space: u32,
    rng: StdRng,
}

impl<R: RulesOracle> RoomManager<R> {
    pub fn new(oracle: R, id_space: u32) -> Self {
        Self::with_rng(oracle, id_space, StdRng::from_os_rng())
    }

    /// Like `new`, with a caller-supplied generator (deterministic tests).
    pub fn with_rng(oracle: R, id_space: u32, rng: StdRng) -> Self {
        Self {
            oracle,
            rooms: BTreeMap::new(),
            id_space,
            rng,
        }
    }

    /// Open a room with `creator` in the first seat.
    pub fn create_room(&mut self, creator: Identity) -> RelayResult<RoomId> {
        let room_id = self.allocate_room_id()?;
        info!(room = %room_id, identity = %creator, "room created");
        let session = GameSession::new(room_id, creator, self.oracle.new_board());
        self.rooms.insert(room_id, session);
        Ok(room_id)
    }

    pub fn join_room(
        &mut self,
        identity: Identity,
        room_id: RoomId,
        registry: &ConnectionRegistry,
    ) -> RelayResult<()> {
        let session = self
            .rooms
            .get_mut(&room_id)
            .ok_or(RelayError::RoomNotFound(room_id))?;
        let was_waiting = session.status() == MatchStatus::WaitingForOpponent;
        session.add_player(identity.clone(), registry)?;
        if was_waiting && session.status() == MatchStatus::InProgress {
            info!(room = %room_id, identity = %identity, "match started");
        } else {
            debug!(room = %room_id, identity = %identity, "player joined");
        }
        Ok(())
    }

    pub fn route_move(
        &mut self,
        identity: &Identity,
        room_id: RoomId,
        payload: Value,
        registry: &ConnectionRegistry,
    ) -> RelayResult<()> {
        let session = self
            .rooms
            .get_mut(&room_id)
            .ok_or(RelayError::RoomNotFound(room_id))?;
        session.make_move(identity, payload, &self.oracle, registry)?;
        if session.status() == MatchStatus::Completed {
            info!(room = %room_id, moves = session.move_count(), "match completed");
        }
        Ok(())
    }

    /// Remove `identity` from every room it sits in, telling the remaining
    /// occupants, and drop rooms left empty. Returns the rooms it left.
    pub fn handle_disconnect(
        &mut self,
        identity: &Identity,
        registry: &ConnectionRegistry,
    ) -> Vec<RoomId> {
        let affected: Vec<RoomId> = self
            .rooms
            .iter()
            .filter(|(_, session)| session.has_player(identity))
            .map(|(room_id, _)| *room_id)
            .collect();

        let notice = ServerMessage::Disconnect {
            message: format!("{identity} has disconnected."),
        };
        for room_id in &affected {
            let Some(session) = self.rooms.get_mut(room_id) else {
                continue;
            };
            session.remove_player(identity);
            session.broadcast(registry, &notice);
            if session.is_empty() {
                self.rooms.remove(room_id);
                info!(room = %room_id, "room closed");
            }
        }
        affected
    }

    /// True if `identity` holds a seat in any room.
    pub fn is_seated(&self, identity: &Identity) -> bool {
        self.rooms.values().any(|s| s.has_player(identity))
    }

    pub fn session(&self, room_id: RoomId) -> Option<&GameSession<R::Board>> {
        self.rooms.get(&room_id)
    }

    pub fn contains(&self, room_id: RoomId) -> bool {
        self.rooms.contains_key(&room_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn allocate_room_id(&mut self) -> RelayResult<RoomId> {
        if self.rooms.len() >= self.id_space as usize {
            return Err(RelayError::RoomAllocationExhausted);
        }
        for _ in 0..RANDOM_ATTEMPTS {
            let candidate = RoomId(self.rng.random_range(0..self.id_space));
            if !self.rooms.contains_key(&candidate) {
                return Ok(candidate);
            }
        }
        (0..self.id_space)
            .map(RoomId)
            .find(|id| !self.rooms.contains_key(id))
            .ok_or(RelayError::RoomAllocationExhausted)
    }
}
