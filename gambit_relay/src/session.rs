// Game session: one room's match state machine.
//
// `GameSession` owns the two seats, the move counter, the match status and
// the oracle's board for a single room. All mutation happens through methods
// called from the relay's single hub task, so there is no internal locking;
// the room manager looks sessions up and calls into them.
//
// States:
//   WaitingForOpponent --(second seat filled)--> InProgress
//   InProgress --(checkmate / draw / stalemate)--> Completed
// Nothing leaves Completed. Emptiness is not a state: when both seats are
// vacant the room manager drops the session.
//
// Seat 0 moves on even move counts and plays white; seat 1 moves on odd
// counts and plays black. Colors belong to seats, so a player who fills a
// seat vacated mid-game inherits that seat's color.
//
// Outbound messages go through the `ConnectionRegistry`, addressed by
// identity. A failed request returns a `RelayError` and sends nothing; the
// router reports it to the requester.

use gambit_protocol::{Color, GameOverPayload, GameOverReason, Identity, RoomId, ServerMessage};
use serde_json::Value;

use crate::error::{RelayError, RelayResult};
use crate::oracle::RulesOracle;
use crate::registry::ConnectionRegistry;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchStatus {
    WaitingForOpponent,
    InProgress,
    Completed,
}

pub struct GameSession<B> {
    room_id: RoomId,
    slots: [Option<Identity>; 2],
    move_count: u64,
    status: MatchStatus,
    board: B,
}

impl<B> GameSession<B> {
    /// New room with `creator` in the first seat.
    pub fn new(room_id: RoomId, creator: Identity, board: B) -> Self {
        Self {
            room_id,
            slots: [Some(creator), None],
            move_count: 0,
            status: MatchStatus::WaitingForOpponent,
            board,
        }
    }

    /// Seat a player. Fails with `RoomFull` (session unchanged) when both
    /// seats are taken by others. The first time the second seat fills, the
    /// match starts and each player is told their color.
    ///
    /// Re-joining a room you already sit in is accepted and just repeats the
    /// join notification while the other seat is still open; legacy clients
    /// join their own room right after creating it. Once both seats are
    /// taken every join, including a re-join, is `RoomFull`.
    pub fn add_player(
        &mut self,
        identity: Identity,
        registry: &ConnectionRegistry,
    ) -> RelayResult<()> {
        if self.is_full() {
            return Err(RelayError::RoomFull);
        }

        let joined = ServerMessage::Notification {
            message: format!("{identity} has joined."),
        };

        if self.has_player(&identity) {
            self.broadcast(registry, &joined);
            return Ok(());
        }

        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(RelayError::RoomFull)?;
        self.slots[slot] = Some(identity.clone());
        self.broadcast(registry, &joined);

        if self.is_full() {
            match self.status {
                MatchStatus::WaitingForOpponent => {
                    self.status = MatchStatus::InProgress;
                    for (seat, occupant) in self.slots.iter().enumerate() {
                        if let Some(occupant) = occupant {
                            let init = ServerMessage::InitGame {
                                color: Color::for_slot(seat),
                            };
                            registry.send(occupant, &init);
                        }
                    }
                }
                MatchStatus::InProgress | MatchStatus::Completed => {
                    // Refilled a vacated seat; only the newcomer needs a color.
                    let init = ServerMessage::InitGame {
                        color: Color::for_slot(slot),
                    };
                    registry.send(&identity, &init);
                }
            }
        }
        Ok(())
    }

    /// Vacate the seat held by `identity`. Returns false if they had none.
    pub fn remove_player(&mut self, identity: &Identity) -> bool {
        match self.slot_of(identity) {
            Some(slot) => {
                self.slots[slot] = None;
                true
            }
            None => false,
        }
    }

    /// Validate and apply a move by `identity`.
    ///
    /// Checks run in order: finished game, turn ownership, oracle legality.
    /// An accepted move is broadcast to both seats before the terminal check,
    /// so `GAME_OVER` always arrives after the move that caused it.
    pub fn make_move<R>(
        &mut self,
        identity: &Identity,
        payload: Value,
        oracle: &R,
        registry: &ConnectionRegistry,
    ) -> RelayResult<()>
    where
        R: RulesOracle<Board = B>,
    {
        match self.status {
            MatchStatus::Completed => return Err(RelayError::GameAlreadyOver),
            MatchStatus::WaitingForOpponent => return Err(RelayError::OutOfTurn),
            MatchStatus::InProgress => {}
        }
        if self.slots[self.turn_slot()].as_ref() != Some(identity) {
            return Err(RelayError::OutOfTurn);
        }

        let next = oracle
            .apply(&self.board, &payload)
            .map_err(|_| RelayError::IllegalMove)?;
        self.board = next;

        let moved = ServerMessage::Move {
            user: identity.clone(),
            payload,
        };
        self.broadcast(registry, &moved);
        self.move_count += 1;

        let outcome = if oracle.is_checkmate(&self.board) {
            Some(GameOverPayload {
                winner: Some(identity.clone()),
                reason: GameOverReason::Checkmate,
            })
        } else if oracle.is_draw(&self.board) || oracle.is_stalemate(&self.board) {
            Some(GameOverPayload {
                winner: None,
                reason: GameOverReason::Draw,
            })
        } else {
            None
        };

        if let Some(payload) = outcome {
            self.status = MatchStatus::Completed;
            self.broadcast(registry, &ServerMessage::GameOver { payload });
        }
        Ok(())
    }

    /// Send a message to every occupied seat, seat 0 first.
    pub fn broadcast(&self, registry: &ConnectionRegistry, msg: &ServerMessage) {
        for occupant in self.slots.iter().flatten() {
            registry.send(occupant, msg);
        }
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn move_count(&self) -> u64 {
        self.move_count
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    /// Seat occupants, seat 0 (white) first.
    pub fn players(&self) -> &[Option<Identity>; 2] {
        &self.slots
    }

    pub fn has_player(&self, identity: &Identity) -> bool {
        self.slot_of(identity).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    fn slot_of(&self, identity: &Identity) -> Option<usize> {
        self.slots.iter().position(|s| s.as_ref() == Some(identity))
    }

    /// Seat entitled to the next move.
    fn turn_slot(&self) -> usize {
        (self.move_count % 2) as usize
    }
}
