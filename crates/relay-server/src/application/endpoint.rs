//! Endpoint abstraction: anything the relay can deliver text frames to.
//!
//! Two implementations exist:
//!
//! - `WsEndpoint` (infrastructure): a WebSocket session.  `send` queues the
//!   frame on the session's writer task and returns immediately.
//! - [`LocalEndpoint`] (this module): an in-process peer whose outbound frames
//!   are handed to a callback.
//!
//! # For beginners: why a trait?
//!
//! The registries, router and heartbeat only ever need two things from a peer:
//! its id and a way to push text at it.  Putting those behind a trait lets the
//! same routing code serve real sockets and in-process peers, and lets unit
//! tests substitute a `mockall` mock.

use std::fmt;
use std::sync::Arc;

use relay_core::EndpointId;
use thiserror::Error;

/// Errors returned by [`Endpoint::send`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The underlying connection has already gone away.
    #[error("endpoint {0} is closed")]
    Closed(EndpointId),
}

/// A connected peer that can receive text frames.
///
/// Implementations must be cheap to call from any thread: `send` is invoked
/// while routing and must not block on network I/O.
#[cfg_attr(test, mockall::automock)]
pub trait Endpoint: Send + Sync {
    /// The relay-assigned id of this endpoint.
    fn id(&self) -> EndpointId;

    /// Delivers one text frame to the peer (best effort, no retry).
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] if the frame could not be handed to the transport.
    fn send(&self, text: &str) -> Result<(), SendError>;
}

/// Callback that receives every frame sent to a [`LocalEndpoint`].
pub type LocalSink = Arc<dyn Fn(&str) + Send + Sync>;

/// An in-process endpoint.
///
/// Frames sent to it are passed synchronously to the callback supplied when
/// the endpoint was opened.
#[derive(Clone)]
pub struct LocalEndpoint {
    id: EndpointId,
    sink: LocalSink,
}

impl LocalEndpoint {
    /// Creates a local endpoint with a fresh random id.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self::with_id(EndpointId::random(), callback)
    }

    /// Creates a local endpoint with a caller-chosen id.
    pub fn with_id<F>(id: EndpointId, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self {
            id,
            sink: Arc::new(callback),
        }
    }
}

impl Endpoint for LocalEndpoint {
    fn id(&self) -> EndpointId {
        self.id
    }

    fn send(&self, text: &str) -> Result<(), SendError> {
        (self.sink)(text);
        Ok(())
    }
}

impl fmt::Debug for LocalEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalEndpoint").field("id", &self.id).finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
