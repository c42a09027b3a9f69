// End-to-end integration tests for the multiplayer pipeline.
//
// Each test starts a real relay, connects real `RelayClient`s (via
// `TestPlayer`), and verifies the full path:
// create → join → colors → moves → relayed moves → identical mirrored boards.
//
// Disconnect and idle scenarios check that rooms are released once their last
// seat is gone, so a stale room code stops resolving.

use std::net::SocketAddr;
use std::time::Duration;

use gambit_protocol::{Color, GameOverPayload, GameOverReason, RoomId, ServerMessage};
use gambit_relay::server::{RelayConfig, RelayHandle, start_relay};
use multiplayer_tests::TestPlayer;
use serde_json::json;
use shakmaty::Position;

/// Long enough for the hub to process a disconnect from another connection.
const SETTLE: Duration = Duration::from_millis(200);

async fn start_test_relay(config: RelayConfig) -> (RelayHandle, SocketAddr) {
    start_relay(RelayConfig { port: 0, ..config }).await.unwrap()
}

/// Start a relay and seat alice (white) and bob (black) in a fresh room.
async fn start_test_match() -> (RelayHandle, SocketAddr, TestPlayer, TestPlayer, RoomId) {
    let (handle, addr) = start_test_relay(RelayConfig::default()).await;
    let mut alice = TestPlayer::connect(addr, "alice").await;
    let mut bob = TestPlayer::connect(addr, "bob").await;

    let room_id = alice.create_room().await;
    bob.join(room_id).await;
    assert_eq!(alice.await_color().await, Color::White);
    assert_eq!(bob.await_color().await, Color::Black);

    (handle, addr, alice, bob, room_id)
}

// ---------------------------------------------------------------------------
// Test scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scholars_mate_mirrors_agree() {
    let (handle, _addr, mut alice, mut bob, room_id) = start_test_match().await;

    let moves = ["e4", "e5", "Bc4", "Nc6", "Qh5", "Nf6", "Qxf7#"];
    for (i, mv) in moves.iter().enumerate() {
        let (mover, expected) = if i % 2 == 0 {
            (&mut alice, "alice")
        } else {
            (&mut bob, "bob")
        };
        mover.play(room_id, json!(mv)).await;

        for player in [&mut alice, &mut bob] {
            let (user, payload) = player.await_move().await;
            assert_eq!(user.as_str(), expected);
            assert_eq!(payload, json!(mv));
        }
    }

    let expected = GameOverPayload {
        winner: Some(alice.identity()),
        reason: GameOverReason::Checkmate,
    };
    assert_eq!(alice.await_game_over().await, expected);
    assert_eq!(bob.await_game_over().await, expected);

    assert!(alice.board.position().is_checkmate());
    assert_eq!(alice.board.position().board(), bob.board.position().board());
    assert_eq!(alice.board.position().turn(), bob.board.position().turn());

    handle.stop().await;
}

#[tokio::test]
async fn rejected_moves_change_nothing() {
    let (handle, _addr, mut alice, mut bob, room_id) = start_test_match().await;

    // Illegal for white, and black out of turn.
    alice.play(room_id, json!("Ke2")).await;
    assert_eq!(alice.expect_error().await, "Invalid move");
    bob.play(room_id, json!("e5")).await;
    assert_eq!(bob.expect_error().await, "It's not your turn");
    alice.expect_silence().await;

    // The game carries on from the start position.
    alice.play(room_id, json!({"from": "e2", "to": "e4"})).await;
    alice.await_move().await;
    bob.await_move().await;
    bob.play(room_id, json!("e5")).await;
    alice.await_move().await;
    bob.await_move().await;
    assert_eq!(alice.board.position().board(), bob.board.position().board());

    handle.stop().await;
}

#[tokio::test]
async fn third_player_is_turned_away() {
    let (handle, addr, mut alice, mut bob, room_id) = start_test_match().await;
    let mut carol = TestPlayer::connect(addr, "carol").await;

    carol.join(room_id).await;
    assert_eq!(carol.expect_error().await, "Room is full");
    alice.expect_silence().await;
    bob.expect_silence().await;

    handle.stop().await;
}

#[tokio::test]
async fn disconnect_notifies_then_releases_room() {
    let (handle, addr, mut alice, bob, room_id) = start_test_match().await;

    bob.disconnect().await;
    alice
        .expect(ServerMessage::Disconnect {
            message: "bob has disconnected.".into(),
        })
        .await;

    // The vacated seat can be taken by someone else.
    let mut carol = TestPlayer::connect(addr, "carol").await;
    carol.join(room_id).await;
    assert_eq!(carol.await_color().await, Color::Black);
    alice
        .expect(ServerMessage::Notification {
            message: "carol has joined.".into(),
        })
        .await;

    alice.disconnect().await;
    carol
        .expect(ServerMessage::Disconnect {
            message: "alice has disconnected.".into(),
        })
        .await;
    carol.disconnect().await;
    tokio::time::sleep(SETTLE).await;

    let mut dave = TestPlayer::connect(addr, "dave").await;
    dave.join(room_id).await;
    assert_eq!(
        dave.expect_error().await,
        format!("Room {room_id} does not exist")
    );

    handle.stop().await;
}

#[tokio::test]
async fn username_is_released_on_disconnect() {
    let (handle, addr) = start_test_relay(RelayConfig::default()).await;
    let alice = TestPlayer::connect(addr, "alice").await;

    let mut impostor = TestPlayer::connect(addr, "mallory").await;
    impostor.client().set_username("alice").await.unwrap();
    assert_eq!(impostor.expect_error().await, "Username already in use");

    alice.disconnect().await;
    tokio::time::sleep(SETTLE).await;

    impostor.client().set_username("alice").await.unwrap();
    impostor
        .expect(ServerMessage::Username {
            message: "Welcome, alice".into(),
        })
        .await;

    handle.stop().await;
}

fn short_liveness_window() -> RelayConfig {
    RelayConfig {
        idle_timeout: Some(Duration::from_millis(300)),
        ..RelayConfig::default()
    }
}

#[tokio::test]
async fn quiet_client_answering_pings_keeps_its_room() {
    let (handle, addr) = start_test_relay(short_liveness_window()).await;

    let mut alice = TestPlayer::connect(addr, "alice").await;
    let room_id = alice.create_room().await;

    // Several windows pass with no game traffic in either direction.
    alice.expect_silence_for(Duration::from_millis(1200)).await;

    let mut bob = TestPlayer::connect(addr, "bob").await;
    bob.join(room_id).await;
    assert_eq!(alice.await_color().await, Color::White);
    assert_eq!(bob.await_color().await, Color::Black);

    handle.stop().await;
}

#[tokio::test]
async fn unresponsive_client_is_closed_and_room_reclaimed() {
    let (handle, addr) = start_test_relay(short_liveness_window()).await;

    let mut alice = TestPlayer::connect(addr, "alice").await;
    let room_id = alice.create_room().await;

    // Not reading means the heartbeat pings go unanswered.
    tokio::time::sleep(Duration::from_millis(1200)).await;
    alice.expect_closed(Duration::from_secs(5)).await;

    let mut bob = TestPlayer::connect(addr, "bob").await;
    bob.join(room_id).await;
    assert_eq!(
        bob.expect_error().await,
        format!("Room {room_id} does not exist")
    );

    handle.stop().await;
}
