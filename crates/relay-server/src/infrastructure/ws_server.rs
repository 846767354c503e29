//! WebSocket server: accept loop and per-session tasks.
//!
//! Each accepted TCP connection gets its own Tokio task which:
//!
//! 1. Completes the WebSocket handshake (any request path is accepted).
//! 2. Spawns a writer task that drains the session's outbound queue into the
//!    socket, so [`WsEndpoint::send`] never waits on the network.
//! 3. Opens the endpoint on the [`RelayHub`] (register + connect ack).
//! 4. Feeds every inbound text frame to [`RelayHub::dispatch`].
//! 5. On close frame, EOF or error, closes the endpoint on the hub, which
//!    sends the break notice to its bound peer.
//!
//! # Shutdown
//!
//! The accept loop and every session watch the same `watch` channel.  When a
//! [`StopMode`] is published:
//!
//! - `Graceful`: sessions queue a close frame and finish; the accept loop
//!   waits for them for at most the grace period, then aborts stragglers.
//! - `Forced`: the accept loop aborts every session immediately.
//!
//! Sessions ended by a stop do not send break notices.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use relay_core::EndpointId;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};

use crate::application::endpoint::{Endpoint, SendError};
use crate::application::hub::RelayHub;
use crate::infrastructure::server::StopMode;

// ── Endpoint ──────────────────────────────────────────────────────────────────

/// A WebSocket session seen as an [`Endpoint`].
///
/// `send` pushes onto an unbounded queue drained by the session's writer
/// task.  It fails only once the writer has gone away.
#[derive(Debug, Clone)]
pub struct WsEndpoint {
    id: EndpointId,
    outbound: mpsc::UnboundedSender<WsMessage>,
}

impl WsEndpoint {
    /// Creates an endpoint with a fresh id that writes into `outbound`.
    pub fn new(outbound: mpsc::UnboundedSender<WsMessage>) -> Self {
        Self {
            id: EndpointId::random(),
            outbound,
        }
    }

    fn queue(&self, message: WsMessage) -> Result<(), SendError> {
        self.outbound
            .send(message)
            .map_err(|_| SendError::Closed(self.id))
    }
}

impl Endpoint for WsEndpoint {
    fn id(&self) -> EndpointId {
        self.id
    }

    fn send(&self, text: &str) -> Result<(), SendError> {
        self.queue(WsMessage::Text(text.to_owned()))
    }
}

// ── Accept loop ───────────────────────────────────────────────────────────────

/// Accepts connections until a [`StopMode`] is published on `shutdown`, then
/// winds the sessions down accordingly.
pub(crate) async fn run_accept_loop(
    listener: TcpListener,
    hub: Arc<RelayHub>,
    mut shutdown: watch::Receiver<Option<StopMode>>,
    grace: Duration,
) {
    let mut sessions = JoinSet::new();

    let mode = loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => {
                    debug!("new connection from {peer_addr}");
                    sessions.spawn(handle_session(
                        stream,
                        peer_addr,
                        Arc::clone(&hub),
                        shutdown.clone(),
                    ));
                }
                // Transient accept errors (e.g. too many open files) must not
                // take the whole relay down.
                Err(e) => error!("accept error: {e}"),
            },
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break StopMode::Forced;
                }
                if let Some(mode) = *shutdown.borrow() {
                    break mode;
                }
            }
            Some(_) = sessions.join_next(), if !sessions.is_empty() => {}
        }
    };

    drop(listener);
    debug!(?mode, sessions = sessions.len(), "accept loop stopping");

    if mode == StopMode::Graceful {
        let drained = timeout(grace, async {
            while sessions.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                remaining = sessions.len(),
                "sessions did not finish within {grace:?}; aborting"
            );
        }
    }
    sessions.abort_all();
    while sessions.join_next().await.is_some() {}
}

// ── Per-session handler ───────────────────────────────────────────────────────

async fn handle_session(
    stream: TcpStream,
    peer_addr: SocketAddr,
    hub: Arc<RelayHub>,
    shutdown: watch::Receiver<Option<StopMode>>,
) {
    match run_session(stream, peer_addr, hub, shutdown).await {
        Ok(()) => debug!("session {peer_addr} finished"),
        Err(e) => warn!("session {peer_addr} failed: {e}"),
    }
}

/// Why the read loop of a session ended.
enum SessionEnd {
    /// The peer went away; close the endpoint and notify its partner.
    Disconnected,
    /// The server is stopping; leave the endpoint for the hub to drop.
    Stopping,
}

async fn run_session(
    stream: TcpStream,
    peer_addr: SocketAddr,
    hub: Arc<RelayHub>,
    mut shutdown: watch::Receiver<Option<StopMode>>,
) -> Result<(), WsError> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    // ── Writer task ───────────────────────────────────────────────────────────
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<WsMessage>();
    let writer = tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            let closing = matches!(message, WsMessage::Close(_));
            if ws_tx.send(message).await.is_err() || closing {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let endpoint = Arc::new(WsEndpoint::new(out_tx));
    let id = endpoint.id();
    if !hub.open(endpoint.clone()) {
        drop(endpoint);
        let _ = writer.await;
        return Ok(());
    }
    info!(endpoint = %id, "session {peer_addr} established");

    // ── Reader loop ───────────────────────────────────────────────────────────
    let end = loop {
        tokio::select! {
            frame = ws_rx.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    let outcome = hub.dispatch(id, &text);
                    debug!(endpoint = %id, ?outcome, "frame dispatched");
                }
                Some(Ok(WsMessage::Binary(_))) => {
                    warn!(endpoint = %id, "binary frame ignored");
                }
                Some(Ok(WsMessage::Close(_))) | None => break SessionEnd::Disconnected,
                // Ping/pong are answered by tungstenite itself.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(endpoint = %id, "read error: {e}");
                    break SessionEnd::Disconnected;
                }
            },
            changed = shutdown.changed() => {
                if changed.is_err() || shutdown.borrow().is_some() {
                    break SessionEnd::Stopping;
                }
            }
        }
    };

    match end {
        SessionEnd::Disconnected => {
            hub.close(id);
            info!(endpoint = %id, "session {peer_addr} disconnected");
        }
        SessionEnd::Stopping => {
            let _ = endpoint.queue(WsMessage::Close(None));
        }
    }
    drop(endpoint);
    let _ = writer.await;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_endpoint_queues_text_frames() {
        // Arrange
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ep = WsEndpoint::new(tx);

        // Act
        ep.send("hello").unwrap();

        // Assert
        assert_eq!(rx.try_recv().unwrap(), WsMessage::Text("hello".to_string()));
    }

    #[test]
    fn test_ws_endpoint_send_after_writer_gone_is_closed_error() {
        let (tx, rx) = mpsc::unbounded_channel();
        let ep = WsEndpoint::new(tx);
        drop(rx);

        assert_eq!(ep.send("x"), Err(SendError::Closed(ep.id())));
    }

    #[test]
    fn test_ws_endpoints_get_distinct_ids() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let a = WsEndpoint::new(tx.clone());
        let b = WsEndpoint::new(tx);
        assert_ne!(a.id(), b.id());
    }
}
