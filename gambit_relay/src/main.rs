// CLI entry point for the Gambit relay.
//
// Starts a standalone relay that chess clients connect to over WebSocket and
// runs until Ctrl+C. See `server.rs` for the networking architecture and
// `router.rs` for how requests are handled.
//
// Usage:
//   relay [OPTIONS]
//     --host <HOST>                 Bind address (env GAMBIT_HOST, default 127.0.0.1)
//     --port <PORT>                 Listen port (env PORT, default 8080)
//     --room-id-space <N>           Room ids are drawn from 0..N (default 10000)
//     --idle-timeout-secs <SECS>    Liveness window for heartbeat pings, 0 disables (default 300)
//     --log <FILTER>                tracing filter (default from RUST_LOG, else gambit_relay=info)

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use gambit_relay::server::{RelayConfig, start_relay};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "relay", version, about = "Room and turn coordinator for Gambit matches")]
struct Args {
    /// Address to bind
    #[arg(long, env = "GAMBIT_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Room ids are drawn from 0..N
    #[arg(long, default_value_t = 10_000)]
    room_id_space: u32,

    /// Heartbeat liveness window in seconds: unanswered for this long, a
    /// connection is dropped (0 = no pings, never dropped)
    #[arg(long, default_value_t = 300)]
    idle_timeout_secs: u64,

    /// Log filter, e.g. "gambit_relay=debug"
    #[arg(long)]
    log: Option<String>,
}

impl Args {
    fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            host: self.host.clone(),
            port: self.port,
            room_id_space: self.room_id_space,
            idle_timeout: (self.idle_timeout_secs > 0)
                .then(|| Duration::from_secs(self.idle_timeout_secs)),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = match &args.log {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid --log filter {directives:?}"))?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gambit_relay=info,relay=info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let (handle, addr) = start_relay(args.relay_config())
        .await
        .with_context(|| format!("failed to bind {}:{}", args.host, args.port))?;
    info!(%addr, "press Ctrl+C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;

    info!("shutting down");
    handle.stop().await;
    Ok(())
}
