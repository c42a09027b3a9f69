// Test-only player for multiplayer integration tests.
//
// Wraps the real `RelayClient` (from `gambit_relay::client`) and keeps a local
// mirror of the board, fed only by the MOVE broadcasts the relay sends. Two
// players whose mirrors agree after a game have seen exactly the same move
// sequence, which is the property the relay exists to guarantee.
//
// The mirror uses the same `StandardChess` oracle the relay runs, through the
// public `RulesOracle` trait. The only test-specific code here is the
// expect/await helpers that turn protocol surprises into panics.
//
// See also: `tests/full_pipeline.rs` for the integration scenarios.

use std::net::SocketAddr;
use std::time::Duration;

use gambit_protocol::{Color, GameOverPayload, Identity, RoomId, ServerMessage};
use gambit_relay::chess::{ChessBoard, StandardChess};
use gambit_relay::client::{ClientError, RelayClient};
use gambit_relay::oracle::RulesOracle;
use serde_json::Value;

/// How long `expect_silence` listens before deciding nothing is coming.
pub const QUIET_PERIOD: Duration = Duration::from_millis(200);

/// A test player wrapping a real `RelayClient` and a mirrored board.
pub struct TestPlayer {
    client: RelayClient,
    pub name: String,
    pub color: Option<Color>,
    pub board: ChessBoard,
    pub game_over: Option<GameOverPayload>,
}

impl TestPlayer {
    /// Connect and claim `name`.
    pub async fn connect(addr: SocketAddr, name: &str) -> Self {
        let mut client = RelayClient::connect(addr)
            .await
            .expect("TestPlayer::connect failed");
        client.set_username(name).await.expect("set_username failed");
        let mut player = Self {
            client,
            name: name.into(),
            color: None,
            board: StandardChess.new_board(),
            game_over: None,
        };
        player
            .expect(ServerMessage::Username {
                message: format!("Welcome, {name}"),
            })
            .await;
        player
    }

    pub fn identity(&self) -> Identity {
        Identity::from(self.name.as_str())
    }

    pub fn client(&mut self) -> &mut RelayClient {
        &mut self.client
    }

    pub async fn create_room(&mut self) -> RoomId {
        self.client.create_room().await.expect("create_room failed");
        match self.recv().await {
            ServerMessage::RoomCreated { room_id } => room_id,
            other => panic!("{}: expected ROOM_CREATED, got {other:?}", self.name),
        }
    }

    pub async fn join(&mut self, room_id: RoomId) {
        self.client.join_room(room_id).await.expect("join_room failed");
    }

    pub async fn play(&mut self, room_id: RoomId, mv: Value) {
        self.client
            .send_move(room_id, mv)
            .await
            .expect("send_move failed");
    }

    /// Skip notifications until INIT_GAME arrives and record the color.
    pub async fn await_color(&mut self) -> Color {
        loop {
            match self.recv().await {
                ServerMessage::InitGame { color } => {
                    self.color = Some(color);
                    return color;
                }
                ServerMessage::Notification { .. } => continue,
                other => panic!("{}: expected INIT_GAME, got {other:?}", self.name),
            }
        }
    }

    /// Wait for the next MOVE broadcast and apply it to the mirror. Returns
    /// who moved and what they sent.
    pub async fn await_move(&mut self) -> (Identity, Value) {
        match self.recv().await {
            ServerMessage::Move { user, payload } => {
                self.board = StandardChess
                    .apply(&self.board, &payload)
                    .unwrap_or_else(|_| {
                        panic!("{}: relay broadcast an illegal move {payload}", self.name)
                    });
                (user, payload)
            }
            other => panic!("{}: expected MOVE, got {other:?}", self.name),
        }
    }

    pub async fn await_game_over(&mut self) -> GameOverPayload {
        match self.recv().await {
            ServerMessage::GameOver { payload } => {
                self.game_over = Some(payload.clone());
                payload
            }
            other => panic!("{}: expected GAME_OVER, got {other:?}", self.name),
        }
    }

    /// Next message must be an ERROR; returns its text.
    pub async fn expect_error(&mut self) -> String {
        match self.recv().await {
            ServerMessage::Error { message } => message,
            other => panic!("{}: expected ERROR, got {other:?}", self.name),
        }
    }

    pub async fn expect(&mut self, expected: ServerMessage) {
        let got = self.recv().await;
        assert_eq!(got, expected, "{}: unexpected message", self.name);
    }

    /// Assert nothing arrives for `QUIET_PERIOD`.
    pub async fn expect_silence(&mut self) {
        self.expect_silence_for(QUIET_PERIOD).await;
    }

    /// Keep reading for `period` and assert no game message arrives. Reading
    /// is what lets the socket answer the relay's heartbeat pings, so this is
    /// how a quiet but healthy client behaves.
    pub async fn expect_silence_for(&mut self, period: Duration) {
        let got = self
            .client
            .recv_timeout(period)
            .await
            .expect("connection failed while expecting silence");
        assert!(got.is_none(), "{}: expected silence, got {got:?}", self.name);
    }

    /// Wait until the relay closes this connection.
    pub async fn expect_closed(&mut self, within: Duration) {
        match self.client.recv_timeout(within).await {
            Err(ClientError::Closed) => {}
            other => panic!("{}: expected the relay to close, got {other:?}", self.name),
        }
    }

    pub async fn disconnect(self) {
        // The relay may already have gone; either way the socket is done.
        let _ = self.client.close().await;
    }

    async fn recv(&mut self) -> ServerMessage {
        self.client
            .recv()
            .await
            .unwrap_or_else(|e| panic!("{}: recv failed: {e}", self.name))
    }
}
