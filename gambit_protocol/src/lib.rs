// gambit_protocol — wire protocol for the Gambit two-player game relay.
//
// This crate defines the message types and JSON codec used by the relay
// (`gambit_relay`) and its clients to communicate over WebSocket text frames.
// It is shared between both sides and has no dependency on the relay, the
// async runtime, or any rules engine.
//
// Module overview:
// - `types.rs`:    Core value types: `RoomId`, `Identity`, `Color`.
// - `message.rs`:  Client-to-relay and relay-to-client message enums, plus
//                  the `GameOverPayload` struct.
// - `codec.rs`:    Frame text <-> message conversion with a size guard and a
//                  typed `ProtocolError` for rejected input.
//
// Design decisions:
// - **JSON with a `type` tag.** Matches the format existing browser clients
//   already speak, so they can talk to this relay unmodified.
// - **Moves as opaque `serde_json::Value`.** The relay never inspects move
//   payloads itself; the rules oracle does. This keeps the protocol crate
//   independent of any particular game.
// - **No framing layer.** WebSocket delimits frames, so one frame carries one
//   JSON object.

pub mod codec;
pub mod message;
pub mod types;

pub use codec::{
    MAX_MESSAGE_SIZE, ProtocolError, decode_client, decode_server, encode_client, encode_server,
};
pub use message::{ClientMessage, GameOverPayload, GameOverReason, ServerMessage};
pub use types::{Color, Identity, RoomId};

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    /// Encode a server message and parse it back as a generic JSON value so
    /// tests can assert on the exact wire shape clients see.
    fn wire(msg: &ServerMessage) -> Value {
        serde_json::from_str(&encode_server(msg).unwrap()).unwrap()
    }

    #[test]
    fn set_username_from_wire() {
        let msg = decode_client(r#"{"type":"SET_USERNAME","username":"alice"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::SetUsername {
                username: "alice".into()
            }
        );
    }

    #[test]
    fn create_room_ignores_extra_fields() {
        let msg = decode_client(r#"{"type":"CREATE_ROOM","timeControl":"blitz"}"#).unwrap();
        assert_eq!(msg, ClientMessage::CreateRoom);
    }

    #[test]
    fn join_room_accepts_legacy_id_field() {
        let msg = decode_client(r#"{"type":"JOIN_ROOM","id":17}"#).unwrap();
        assert_eq!(msg, ClientMessage::JoinRoom { room_id: RoomId(17) });
    }

    #[test]
    fn room_id_accepts_numeric_string() {
        let msg = decode_client(r#"{"type":"JOIN_ROOM","roomId":" 0042 "}"#).unwrap();
        assert_eq!(msg, ClientMessage::JoinRoom { room_id: RoomId(42) });

        let err = decode_client(r#"{"type":"JOIN_ROOM","roomId":"lobby"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidShape { .. }));
    }

    #[test]
    fn move_payload_is_kept_verbatim() {
        let msg = decode_client(
            r#"{"type":"MOVE","roomId":3,"move":{"from":"e2","to":"e4","promotion":null}}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::Move { room_id, payload } => {
                assert_eq!(room_id, RoomId(3));
                assert_eq!(payload, json!({"from": "e2", "to": "e4", "promotion": null}));
            }
            other => panic!("expected Move, got {other:?}"),
        }
    }

    #[test]
    fn room_created_wire_shape() {
        let value = wire(&ServerMessage::RoomCreated {
            room_id: RoomId(4821),
        });
        assert_eq!(value, json!({"type": "ROOM_CREATED", "roomId": 4821}));
    }

    #[test]
    fn init_game_wire_shape() {
        let value = wire(&ServerMessage::InitGame {
            color: Color::Black,
        });
        assert_eq!(value, json!({"type": "INIT_GAME", "color": "black"}));
    }

    #[test]
    fn move_broadcast_wire_shape() {
        let value = wire(&ServerMessage::Move {
            user: Identity::from("alice"),
            payload: json!("e4"),
        });
        assert_eq!(value, json!({"type": "MOVE", "user": "alice", "move": "e4"}));
    }

    #[test]
    fn game_over_draw_has_null_winner() {
        let value = wire(&ServerMessage::GameOver {
            payload: GameOverPayload {
                winner: None,
                reason: GameOverReason::Draw,
            },
        });
        assert_eq!(
            value,
            json!({"type": "GAME_OVER", "payload": {"winner": null, "reason": "draw"}})
        );
    }

    #[test]
    fn game_over_checkmate_names_winner() {
        let value = wire(&ServerMessage::GameOver {
            payload: GameOverPayload {
                winner: Some(Identity::from("bob")),
                reason: GameOverReason::Checkmate,
            },
        });
        assert_eq!(value["payload"]["winner"], "bob");
        assert_eq!(value["payload"]["reason"], "checkmate");
    }

    #[test]
    fn error_helper_wire_shape() {
        let value = wire(&ServerMessage::error("Room does not exist"));
        assert_eq!(value, json!({"type": "ERROR", "message": "Room does not exist"}));
    }

    #[test]
    fn client_encoding_is_accepted_by_decoder() {
        let msg = ClientMessage::Move {
            room_id: RoomId(9),
            payload: json!("Nf3"),
        };
        let text = encode_client(&msg).unwrap();
        assert_eq!(decode_client(&text).unwrap(), msg);
    }

    #[test]
    fn color_for_slot() {
        assert_eq!(Color::for_slot(0), Color::White);
        assert_eq!(Color::for_slot(1), Color::Black);
    }
}
