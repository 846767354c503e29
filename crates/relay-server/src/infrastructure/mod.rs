//! Infrastructure layer for relay-server.
//!
//! The infrastructure layer handles all I/O.
//!
//! # Responsibilities
//!
//! - Binding the TCP listener and performing the WebSocket upgrade
//! - Spawning one Tokio task per session plus its writer task
//! - Starting and stopping the relay (heartbeat task, graceful shutdown)
//! - Reading the optional TOML configuration file
//!
//! # What does NOT belong here?
//!
//! - Pairing and forwarding rules (application layer)
//! - Wire types (`relay-core`)

pub mod config_file;
pub mod server;
pub mod ws_server;

pub use config_file::{load_config, ConfigError, ConfigFile};
pub use server::{LocalEndpointHandle, RelayServer, ServerError, StopMode};
pub use ws_server::WsEndpoint;
