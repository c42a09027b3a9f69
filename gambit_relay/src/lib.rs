// gambit_relay — room and turn coordinator for two-player Gambit matches.
//
// The relay pairs WebSocket clients into rooms, enforces whose turn it is,
// validates moves against a pluggable rules oracle and relays accepted moves
// to both seats. It keeps no state across restarts and has no notion of
// accounts; an identity lives exactly as long as its connection.
//
// Module overview:
// - `registry.rs`: Connection Registry. Maps connections to identities and
//                  identities to sendable handles; owns username claims.
// - `session.rs`:  Game Session. One match: two seats, turn order, move
//                  counting and the WaitingForOpponent/InProgress/Completed
//                  lifecycle.
// - `rooms.rs`:    Room Manager. Room id allocation, join/move routing and
//                  disconnect fan-out across rooms.
// - `router.rs`:   Message Router. Decodes inbound frames, dispatches them and
//                  turns every failure into a single ERROR reply.
// - `oracle.rs`:   The `RulesOracle` trait the session consults.
// - `chess.rs`:    `StandardChess`, the default oracle (shakmaty-backed).
// - `error.rs`:    `RelayError`, whose messages are what clients see.
// - `server.rs`:   tokio listener, per-connection reader/writer tasks and the
//                  hub task that owns the router.
// - `client.rs`:   `RelayClient`, a small async client for tests and tooling.
//
// Dependencies: `gambit_protocol` (shared message types and codec).
//
// The relay can run as a standalone binary (`main.rs`) or be embedded via the
// library API (`start_relay`).

pub mod chess;
pub mod client;
pub mod error;
pub mod oracle;
pub mod registry;
pub mod rooms;
pub mod router;
pub mod server;
pub mod session;

#[cfg(test)]
mod testing;

pub use server::{RelayConfig, RelayHandle, start_relay, start_relay_with};
