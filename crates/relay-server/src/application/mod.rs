//! Application layer for relay-server.
//!
//! Everything here is transport-independent.  Apart from the heartbeat timer
//! it is also synchronous: the registries guard their state with `std::sync`
//! locks that are never held across an `.await`, so the same code serves
//! WebSocket sessions and in-process endpoints alike.
//!
//! # Modules
//!
//! - [`endpoint`]: the `Endpoint` trait and the in-process `LocalEndpoint`.
//! - [`binding_registry`]: the symmetric 1:1 pairing table.
//! - [`connection_registry`]: id → endpoint table; cascades into bindings.
//! - [`router`]: validates inbound envelopes and forwards them.
//! - [`heartbeat`]: periodic liveness broadcast.
//! - [`hub`]: open / close / dispatch, shared by every transport.

pub mod binding_registry;
pub mod connection_registry;
pub mod endpoint;
pub mod heartbeat;
pub mod hub;
pub mod router;

pub use binding_registry::{Binding, BindingRegistry};
pub use connection_registry::{BindError, ConnectionRegistry, Unregistered};
pub use endpoint::{Endpoint, LocalEndpoint, SendError};
pub use heartbeat::{send_heartbeats, spawn_heartbeat, HeartbeatReport};
pub use hub::RelayHub;
pub use router::{Dispatch, Router};
