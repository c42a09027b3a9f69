// WebSocket client for talking to a running relay.
//
// Used by the integration tests and handy for poking a deployed relay from a
// script. Unlike a game UI it is request/response shaped: callers send a
// message and then `recv` what the relay pushed back, with a timeout so a
// missing reply fails a test instead of hanging it.
//
// Inbound frames are decoded with the shared protocol codec, so anything the
// relay emits that a real client could not parse surfaces here as a
// `ClientError::Protocol`.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gambit_protocol::{
    ClientMessage, ProtocolError, RoomId, ServerMessage, decode_server, encode_client,
};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("bad message from relay: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("timed out waiting for relay after {0:?}")]
    Timeout(Duration),
    #[error("connection closed by relay")]
    Closed,
}

pub struct RelayClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl RelayClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self, ClientError> {
        let (ws, _response) = connect_async(format!("ws://{addr}")).await?;
        Ok(Self { ws })
    }

    pub async fn send(&mut self, msg: &ClientMessage) -> Result<(), ClientError> {
        let text = encode_client(msg)?;
        self.send_raw(&text).await
    }

    /// Send an arbitrary text frame, valid or not.
    pub async fn send_raw(&mut self, text: &str) -> Result<(), ClientError> {
        self.ws.send(Message::text(text.to_owned())).await?;
        Ok(())
    }

    pub async fn set_username(&mut self, username: &str) -> Result<(), ClientError> {
        self.send(&ClientMessage::SetUsername {
            username: username.into(),
        })
        .await
    }

    pub async fn create_room(&mut self) -> Result<(), ClientError> {
        self.send(&ClientMessage::CreateRoom).await
    }

    pub async fn join_room(&mut self, room_id: RoomId) -> Result<(), ClientError> {
        self.send(&ClientMessage::JoinRoom { room_id }).await
    }

    pub async fn send_move(&mut self, room_id: RoomId, mv: Value) -> Result<(), ClientError> {
        self.send(&ClientMessage::Move {
            room_id,
            payload: mv,
        })
        .await
    }

    /// Next message from the relay, waiting up to five seconds.
    pub async fn recv(&mut self) -> Result<ServerMessage, ClientError> {
        self.recv_timeout(DEFAULT_RECV_TIMEOUT)
            .await?
            .ok_or(ClientError::Timeout(DEFAULT_RECV_TIMEOUT))
    }

    /// Next message from the relay, or `None` if nothing arrives in `limit`.
    /// A closed connection is an error, not `None`.
    pub async fn recv_timeout(
        &mut self,
        limit: Duration,
    ) -> Result<Option<ServerMessage>, ClientError> {
        let deadline = tokio::time::Instant::now() + limit;
        loop {
            let frame = match tokio::time::timeout_at(deadline, self.ws.next()).await {
                Ok(frame) => frame,
                Err(_) => return Ok(None),
            };
            match frame {
                None | Some(Ok(Message::Close(_))) => return Err(ClientError::Closed),
                Some(Err(
                    tungstenite::Error::ConnectionClosed
                    | tungstenite::Error::AlreadyClosed
                    | tungstenite::Error::Protocol(
                        tungstenite::error::ProtocolError::ResetWithoutClosingHandshake,
                    ),
                )) => return Err(ClientError::Closed),
                // Answering a heartbeat on a socket the relay already dropped.
                Some(Err(tungstenite::Error::Io(e)))
                    if matches!(
                        e.kind(),
                        io::ErrorKind::ConnectionReset
                            | io::ErrorKind::ConnectionAborted
                            | io::ErrorKind::BrokenPipe
                    ) =>
                {
                    return Err(ClientError::Closed);
                }
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(Message::Text(text))) => return Ok(Some(decode_server(text.as_str())?)),
                Some(Ok(_)) => continue,
            }
        }
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        self.ws.close(None).await?;
        Ok(())
    }
}
