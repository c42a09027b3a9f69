// WebSocket listener and hub event loop for the relay.
//
// Architecture: one hub task plus two tasks per connection, joined by a
// central `mpsc` channel.
//
// - **Accept loop** (inside the hub task): accepts TCP connections and spawns
//   a connection task for each, handing it a fresh `ConnectionId`.
// - **Connection tasks** (one per client): perform the WebSocket handshake,
//   create the outbox channel, report `InternalEvent::NewConnection`, then
//   read frames and forward them as `InternalEvent::MessageFrom`. On close,
//   transport error, idle timeout or relay shutdown they report
//   `InternalEvent::Disconnected`.
// - **Writer tasks** (one per client): drain the outbox into the WebSocket
//   sink and send a heartbeat ping several times per liveness window. The
//   outbox sender lives only in the registry, so unregistering a connection
//   ends its writer, which then closes the socket.
// - **Hub**: owns the `Router` (and through it every room and identity) and
//   applies events strictly in arrival order. Nothing else touches game
//   state, so no request handler can observe another half-applied.
//
// Liveness: any inbound frame, including the pong a client's WebSocket stack
// sends back for each heartbeat, restarts the reader's window. A client that
// is connected but quiet keeps answering pings and stays; one that stops
// reading (or vanished without a FIN) misses the window and is disconnected,
// which reclaims its rooms.
//
// Shutdown: `RelayHandle::stop` flips a `watch` flag. The hub stops
// accepting and drops the router; connection tasks see the same flag and
// stop reading.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use gambit_protocol::{ServerMessage, encode_server};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};
use tracing::{debug, info, warn};

use crate::chess::StandardChess;
use crate::oracle::RulesOracle;
use crate::registry::{ConnectionHandle, ConnectionId};
use crate::rooms::{DEFAULT_ROOM_ID_SPACE, RoomManager};
use crate::router::Router;

/// Heartbeat pings sent per liveness window, so a single delayed pong does
/// not cost a live client its connection.
const PINGS_PER_WINDOW: u32 = 3;

/// Events sent from connection tasks to the hub.
enum InternalEvent {
    NewConnection {
        handle: ConnectionHandle,
    },
    MessageFrom {
        connection: ConnectionId,
        text: String,
    },
    Disconnected {
        connection: ConnectionId,
    },
}

/// Handle returned by `start_relay` to control the running server. Dropping
/// it also stops the relay.
pub struct RelayHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RelayHandle {
    /// Signal the relay to stop and wait for the hub to shut down.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "relay hub task ended abnormally");
        }
    }
}

/// Configuration for starting a relay server.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    /// Room ids are drawn from `0..room_id_space`.
    pub room_id_space: u32,
    /// Liveness window. The relay pings each client several times per window
    /// and closes connections that send nothing back (not even a pong) for
    /// this long. `None` disables both the pings and the check.
    pub idle_timeout: Option<Duration>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            room_id_space: DEFAULT_ROOM_ID_SPACE,
            idle_timeout: Some(Duration::from_secs(300)),
        }
    }
}

/// Start the relay with standard chess rules. Returns a handle for stopping
/// it and the actual bound address (useful when port 0 is used to let the OS
/// pick a free port).
pub async fn start_relay(config: RelayConfig) -> std::io::Result<(RelayHandle, SocketAddr)> {
    start_relay_with(config, StandardChess).await
}

/// Start the relay with a caller-supplied rules oracle.
pub async fn start_relay_with<R: RulesOracle>(
    config: RelayConfig,
    oracle: R,
) -> std::io::Result<(RelayHandle, SocketAddr)> {
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    let addr = listener.local_addr()?;
    let (shutdown, shutdown_rx) = watch::channel(false);

    let router = Router::new(RoomManager::new(oracle, config.room_id_space));
    let task = tokio::spawn(run_relay(listener, router, config, shutdown_rx));
    info!(%addr, "relay listening");

    Ok((RelayHandle { shutdown, task }, addr))
}

/// Hub loop. Runs until the shutdown flag is raised.
async fn run_relay<R: RulesOracle>(
    listener: TcpListener,
    mut router: Router<R>,
    config: RelayConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut next_connection = 0u64;

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    next_connection += 1;
                    let connection = ConnectionId(next_connection);
                    debug!(%connection, %peer, "tcp connection accepted");
                    tokio::spawn(connection_task(
                        stream,
                        connection,
                        tx.clone(),
                        config.idle_timeout,
                        shutdown.clone(),
                    ));
                }
                Err(e) => warn!(error = %e, "accept failed"),
            },
            Some(event) = rx.recv() => handle_event(&mut router, event),
            _ = shutdown.changed() => break,
        }
    }

    info!(
        connections = router.registry().len(),
        rooms = router.rooms().room_count(),
        "relay stopped"
    );
}

fn handle_event<R: RulesOracle>(router: &mut Router<R>, event: InternalEvent) {
    match event {
        InternalEvent::NewConnection { handle } => {
            router.connect(handle);
        }
        InternalEvent::MessageFrom { connection, text } => {
            router.handle_text(connection, &text);
        }
        InternalEvent::Disconnected { connection } => {
            router.disconnect(connection);
        }
    }
}

/// Drive one client: handshake, then forward frames until the connection
/// ends for any reason.
async fn connection_task(
    stream: TcpStream,
    connection: ConnectionId,
    events: mpsc::UnboundedSender<InternalEvent>,
    idle_timeout: Option<Duration>,
    mut shutdown: watch::Receiver<bool>,
) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%connection, error = %e, "websocket handshake failed");
            return;
        }
    };
    let (sink, mut frames) = ws.split();

    let (outbox, outbox_rx) = mpsc::unbounded_channel();
    let ping_every = idle_timeout.map(|window| window / PINGS_PER_WINDOW);
    tokio::spawn(write_outbox(connection, sink, outbox_rx, ping_every));
    if events
        .send(InternalEvent::NewConnection {
            handle: ConnectionHandle::new(connection, outbox),
        })
        .is_err()
    {
        return;
    }

    loop {
        let next = async {
            match idle_timeout {
                Some(limit) => tokio::time::timeout(limit, frames.next()).await.ok(),
                None => Some(frames.next().await),
            }
        };
        let frame = tokio::select! {
            frame = next => frame,
            _ = shutdown.changed() => break,
        };

        let text = match frame {
            None => {
                info!(%connection, "no traffic within liveness window, closing");
                break;
            }
            Some(None) => break,
            Some(Some(Err(e))) => {
                warn!(%connection, error = %e, "websocket read failed");
                break;
            }
            Some(Some(Ok(msg))) => match msg {
                Message::Text(text) => text.as_str().to_owned(),
                Message::Binary(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Message::Close(_) => break,
                // Heartbeat replies and client pings only restart the window.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            },
        };

        if events
            .send(InternalEvent::MessageFrom { connection, text })
            .is_err()
        {
            break;
        }
    }

    let _ = events.send(InternalEvent::Disconnected { connection });
}

/// Serialize queued messages onto the socket until the outbox closes,
/// pinging the client every `ping_every` in between.
async fn write_outbox(
    connection: ConnectionId,
    mut sink: SplitSink<WebSocketStream<TcpStream>, Message>,
    mut outbox: mpsc::UnboundedReceiver<ServerMessage>,
    ping_every: Option<Duration>,
) {
    let mut heartbeat = ping_every.map(|every| {
        let mut interval = tokio::time::interval_at(Instant::now() + every, every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    loop {
        let frame = tokio::select! {
            msg = outbox.recv() => match msg {
                Some(msg) => match encode_server(&msg) {
                    Ok(text) => Message::text(text),
                    Err(e) => {
                        warn!(%connection, error = %e, "failed to encode outbound message");
                        continue;
                    }
                },
                None => break,
            },
            () = next_heartbeat(&mut heartbeat) => Message::Ping(Default::default()),
        };
        if let Err(e) = sink.send(frame).await {
            debug!(%connection, error = %e, "websocket write failed");
            return;
        }
    }
    let _ = sink.close().await;
}

async fn next_heartbeat(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
