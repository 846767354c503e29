//! Optional TOML configuration file.
//!
//! # Format
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! port = 17479
//! heartbeat_interval_secs = 60
//! shutdown_grace_ms = 1000
//! max_message_len = 1950      # omit to disable the length check
//! ```
//!
//! Every key is optional.  Fields annotated with `#[serde(default = "...")]`
//! take the value of the named function when the key is absent, so an empty
//! file (or an empty `[server]` table) yields [`RelayConfig::default`].
//!
//! Command-line flags and `RELAY_*` environment variables override whatever
//! the file says (see `main.rs`).

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::config::{
    RelayConfig, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_PORT, DEFAULT_SHUTDOWN_GRACE,
};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but makes no sense.
    #[error("invalid config value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ── Schema ────────────────────────────────────────────────────────────────────

/// Top-level layout of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
}

/// The `[server]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    #[serde(default)]
    pub max_message_len: Option<usize>,
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_heartbeat_interval_secs() -> u64 {
    DEFAULT_HEARTBEAT_INTERVAL.as_secs()
}

fn default_shutdown_grace_ms() -> u64 {
    DEFAULT_SHUTDOWN_GRACE.as_millis() as u64
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            max_message_len: None,
        }
    }
}

impl ServerSection {
    /// Converts the table into a [`RelayConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero heartbeat interval or a
    /// zero message length limit.
    pub fn to_relay_config(&self) -> Result<RelayConfig, ConfigError> {
        if self.heartbeat_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "heartbeat_interval_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_message_len == Some(0) {
            return Err(ConfigError::Invalid {
                key: "max_message_len",
                reason: "must be at least 1 (omit the key to disable the limit)".to_string(),
            });
        }
        Ok(RelayConfig {
            bind_addr: SocketAddr::new(self.bind_address, self.port),
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval_secs),
            shutdown_grace: Duration::from_millis(self.shutdown_grace_ms),
            max_message_len: self.max_message_len,
        })
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Parses configuration from TOML text.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for invalid TOML or mistyped values.
pub fn parse_config(text: &str) -> Result<ConfigFile, ConfigError> {
    Ok(toml::from_str(text)?)
}

/// Reads and parses the configuration file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read (including when it
/// does not exist) and [`ConfigError::Parse`] if it is not valid.
pub fn load_config(path: &Path) -> Result<ConfigFile, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
