//! relay-server library crate.
//!
//! A WebSocket relay that lets a controller ("client") endpoint and a device
//! ("target") endpoint find each other, pair up one-to-one, and exchange
//! opaque command strings through the relay.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Peers (JSON envelopes over WebSocket)
//!         ↕
//! [relay-server]
//!   ├── domain/           RelayConfig
//!   ├── application/      Registries, router, heartbeat, hub (no sockets)
//!   └── infrastructure/
//!         ├── ws_server/   Accept loop + per-session tasks (tokio-tungstenite)
//!         ├── server/      RelayServer lifecycle façade
//!         └── config_file/ Optional TOML configuration
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `relay-core`; apart from the
//!   heartbeat timer it is synchronous and runs in plain `#[test]` functions.
//! - `infrastructure` depends on all other layers plus `tokio` and `tungstenite`.
//!
//! # For beginners: where does a message go?
//!
//! ```text
//! WebSocket frame → ws_server session task → RelayHub::dispatch
//!     → Router (validate) → BindingRegistry (who is the peer?)
//!     → ConnectionRegistry (find the peer's endpoint) → Endpoint::send
//! ```

/// Domain layer: plain configuration types.
pub mod domain;

/// Application layer: pairing, routing and liveness logic.
pub mod application;

/// Infrastructure layer: WebSocket transport, server lifecycle, config file.
pub mod infrastructure;
