//! Pairing relay entry point.
//!
//! Listens for WebSocket connections from controller ("client") and device
//! ("target") apps, pairs them one-to-one, and relays their command strings.
//!
//! # Usage
//!
//! ```text
//! relay-server [OPTIONS]
//!
//! Options:
//!   --config <FILE>               TOML configuration file
//!   --port <PORT>                 Listen port [default: 17479]
//!   --bind <IP>                   Listen address [default: 0.0.0.0]
//!   --heartbeat-interval <SECS>   Heartbeat period [default: 60]
//!   --max-message-len <CHARS>     Reject longer `msg` payloads with 405
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                   | Flag                   |
//! |----------------------------|------------------------|
//! | `RELAY_PORT`               | `--port`               |
//! | `RELAY_BIND`               | `--bind`               |
//! | `RELAY_HEARTBEAT_INTERVAL` | `--heartbeat-interval` |
//! | `RELAY_MAX_MESSAGE_LEN`    | `--max-message-len`    |
//!
//! Precedence: flag / environment variable, then the config file, then the
//! built-in defaults.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use relay_server::domain::RelayConfig;
use relay_server::infrastructure::{load_config, RelayServer, StopMode};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Pairing relay server.
///
/// Every flag is optional; unset flags fall back to the config file and then
/// to the built-in defaults.
#[derive(Debug, Parser)]
#[command(
    name = "relay-server",
    about = "WebSocket relay that pairs controller and device endpoints",
    version
)]
struct Cli {
    /// Path to a TOML configuration file with a `[server]` table.
    #[arg(long)]
    config: Option<PathBuf>,

    /// TCP port to listen on.
    #[arg(long, env = "RELAY_PORT")]
    port: Option<u16>,

    /// IP address to listen on.
    ///
    /// Use `0.0.0.0` to accept connections from the LAN, or `127.0.0.1` for
    /// local connections only.
    #[arg(long, env = "RELAY_BIND")]
    bind: Option<IpAddr>,

    /// Seconds between heartbeat broadcasts.
    #[arg(long, env = "RELAY_HEARTBEAT_INTERVAL")]
    heartbeat_interval: Option<u64>,

    /// Maximum `msg` payload length in characters.
    #[arg(long, env = "RELAY_MAX_MESSAGE_LEN")]
    max_message_len: Option<usize>,
}

impl Cli {
    /// Layers the CLI flags over the config file (if any) over the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded or holds invalid
    /// values, or if a flag is out of range.
    fn into_relay_config(self) -> anyhow::Result<RelayConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .and_then(|file| file.server.to_relay_config())
                .with_context(|| format!("failed to load config file {}", path.display()))?,
            None => RelayConfig::default(),
        };

        if let Some(ip) = self.bind {
            config.bind_addr.set_ip(ip);
        }
        if let Some(port) = self.port {
            config.bind_addr.set_port(port);
        }
        if let Some(secs) = self.heartbeat_interval {
            anyhow::ensure!(secs > 0, "--heartbeat-interval must be at least 1 second");
            config.heartbeat_interval = Duration::from_secs(secs);
        }
        if let Some(limit) = self.max_message_len {
            anyhow::ensure!(limit > 0, "--max-message-len must be at least 1");
            config.max_message_len = Some(limit);
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// 1. Initialise `tracing` (level from `RUST_LOG`, default `info`).
/// 2. Parse the CLI and build a [`RelayConfig`].
/// 3. Start the relay and wait for Ctrl+C.
/// 4. Stop gracefully: sessions get a close frame and up to the configured
///    grace period to finish.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_relay_config()?;
    let port = config.bind_addr.port();

    let server = RelayServer::new(config);
    let addr = server
        .start(port)
        .await
        .context("failed to start pairing relay")?;
    info!("pairing relay ready on ws://{addr}");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("received Ctrl+C; shutting down");

    server.stop(StopMode::Graceful).await;
    info!("pairing relay stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
