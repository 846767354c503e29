//! Relay configuration types.
//!
//! [`RelayConfig`] is the single source of truth for all runtime settings.
//! It is populated from defaults, then an optional TOML file, then CLI
//! arguments and environment variables (see `main.rs`).
//!
//! Keeping configuration as a plain struct (no global state, no environment
//! reads inside the domain) makes the relay easy to embed in tests.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Default listen port for the relay.
pub const DEFAULT_PORT: u16 = 17479;

/// Default interval between heartbeat broadcasts.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Default time a graceful stop waits for sessions to flush and close.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// All runtime configuration for the relay server.
///
/// # Example
///
/// ```rust
/// use relay_server::domain::RelayConfig;
///
/// let cfg = RelayConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 17479);
/// assert!(cfg.max_message_len.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Address the WebSocket listener binds to.
    ///
    /// The port part is the default used by `main`; `RelayServer::start`
    /// takes the port explicitly and only reuses the IP.
    pub bind_addr: SocketAddr,

    /// Period of the heartbeat broadcast.  The first heartbeat goes out one
    /// full period after the server starts.
    pub heartbeat_interval: Duration,

    /// Upper bound on how long [`StopMode::Graceful`] waits for sessions.
    ///
    /// [`StopMode::Graceful`]: crate::infrastructure::server::StopMode::Graceful
    pub shutdown_grace: Duration,

    /// When set, forwarded `msg` payloads longer than this many characters
    /// are rejected with code 405.  `None` disables the check.
    pub max_message_len: Option<usize>,
}

impl RelayConfig {
    /// Returns the listen address for `port` on the configured IP.
    pub fn listen_addr(&self, port: u16) -> SocketAddr {
        SocketAddr::new(self.bind_addr.ip(), port)
    }
}

impl Default for RelayConfig {
    /// | Field              | Default         |
    /// |--------------------|-----------------|
    /// | bind_addr          | `0.0.0.0:17479` |
    /// | heartbeat_interval | 60 seconds      |
    /// | shutdown_grace     | 1 second        |
    /// | max_message_len    | `None`          |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            max_message_len: None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port_is_17479() {
        // Arrange / Act
        let cfg = RelayConfig::default();
        // Assert
        assert_eq!(cfg.bind_addr.port(), 17479);
    }

    #[test]
    fn test_default_binds_all_interfaces() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.bind_addr.ip().to_string(), "0.0.0.0");
    }

    #[test]
    fn test_default_heartbeat_is_60s() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.heartbeat_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_default_has_no_length_limit() {
        assert_eq!(RelayConfig::default().max_message_len, None);
    }

    #[test]
    fn test_listen_addr_keeps_ip_and_swaps_port() {
        // Arrange
        let cfg = RelayConfig {
            bind_addr: "127.0.0.1:9000".parse().unwrap(),
            ..RelayConfig::default()
        };

        // Act
        let addr = cfg.listen_addr(4000);

        // Assert
        assert_eq!(addr.to_string(), "127.0.0.1:4000");
    }
}
