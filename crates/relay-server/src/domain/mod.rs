//! Domain layer for relay-server.
//!
//! Only the runtime configuration lives here.  Identity and wire types are
//! shared with peers and therefore live in `relay-core`.

pub mod config;

pub use config::RelayConfig;
