//! RelayServer: start/stop lifecycle and in-process endpoints.
//!
//! `RelayServer` is owned by whoever creates it (normally `main`); there is no
//! global instance.  Start and stop are serialised through one async mutex
//! holding the running instance, so concurrent calls never interleave.
//!
//! # Lifecycle
//!
//! ```text
//! start(port) ─┬─ already running on `port`  → no-op, returns the address
//!              ├─ running on another port    → stop(Graceful), then start
//!              └─ stopped                    → bind, spawn accept loop + heartbeat
//!
//! stop(mode)  ── cancel heartbeat → signal sessions → wait (Graceful) or
//!                abort (Forced) → drop leftover endpoints silently
//! ```
//!
//! Each start creates a fresh [`RelayHub`], so ids and bindings never carry
//! over from a previous run.

use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock};

use relay_core::protocol::pairing::pairing_url;
use relay_core::EndpointId;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::application::endpoint::{Endpoint, LocalEndpoint};
use crate::application::heartbeat::spawn_heartbeat;
use crate::application::hub::RelayHub;
use crate::application::router::Dispatch;
use crate::domain::config::RelayConfig;
use crate::infrastructure::ws_server::run_accept_loop;

/// Errors returned by [`RelayServer::start`].
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not be bound (port in use, no permission, ...).
    #[error("failed to bind relay listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The bound listener could not report its local address.
    #[error("failed to read listener address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

/// How [`RelayServer::stop`] treats open sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    /// Send every session a close frame and wait up to the configured grace
    /// period for them to finish.
    Graceful,
    /// Abort every session immediately.
    Forced,
}

/// Everything owned by one running instance.
struct RunningServer {
    requested_port: u16,
    local_addr: SocketAddr,
    hub: Arc<RelayHub>,
    shutdown: watch::Sender<Option<StopMode>>,
    accept_task: JoinHandle<()>,
    heartbeat_task: JoinHandle<()>,
}

/// Snapshot readable without the async lock.
#[derive(Clone)]
struct Live {
    hub: Arc<RelayHub>,
    local_addr: SocketAddr,
}

/// The pairing relay.
pub struct RelayServer {
    config: RelayConfig,
    running: Mutex<Option<RunningServer>>,
    live: RwLock<Option<Live>>,
}

impl RelayServer {
    /// Creates a stopped server.
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            running: Mutex::new(None),
            live: RwLock::new(None),
        }
    }

    /// The configuration this server was created with.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    fn live(&self) -> Option<Live> {
        self.live
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_live(&self, live: Option<Live>) {
        *self.live.write().unwrap_or_else(PoisonError::into_inner) = live;
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Starts listening on `port` (on the configured IP).  Port `0` asks the
    /// OS for a free port.
    ///
    /// Calling `start` again with the same port while running does nothing.
    /// With a different port the server is stopped gracefully and restarted.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the port cannot be bound.  The server
    /// is then stopped, with nothing left running.
    pub async fn start(&self, port: u16) -> Result<SocketAddr, ServerError> {
        let mut running = self.running.lock().await;

        if let Some(current) = running.as_ref() {
            if current.requested_port == port {
                return Ok(current.local_addr);
            }
        }
        if let Some(previous) = running.take() {
            info!(
                from = previous.requested_port,
                to = port,
                "restarting relay on a different port"
            );
            self.shutdown_instance(previous, StopMode::Graceful).await;
        }

        let addr = self.config.listen_addr(port);
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

        let hub = Arc::new(RelayHub::new(self.config.max_message_len));
        let (shutdown_tx, shutdown_rx) = watch::channel(None);
        let accept_task = tokio::spawn(run_accept_loop(
            listener,
            Arc::clone(&hub),
            shutdown_rx,
            self.config.shutdown_grace,
        ));
        let heartbeat_task =
            spawn_heartbeat(Arc::clone(hub.registry()), self.config.heartbeat_interval);

        self.set_live(Some(Live {
            hub: Arc::clone(&hub),
            local_addr,
        }));
        *running = Some(RunningServer {
            requested_port: port,
            local_addr,
            hub,
            shutdown: shutdown_tx,
            accept_task,
            heartbeat_task,
        });

        info!(
            heartbeat = ?self.config.heartbeat_interval,
            "pairing relay listening on {local_addr}"
        );
        Ok(local_addr)
    }

    /// Stops the server.  Does nothing if it is not running.
    pub async fn stop(&self, mode: StopMode) {
        let mut running = self.running.lock().await;
        if let Some(instance) = running.take() {
            self.shutdown_instance(instance, mode).await;
        }
    }

    async fn shutdown_instance(&self, instance: RunningServer, mode: StopMode) {
        self.set_live(None);

        instance.heartbeat_task.abort();
        let _ = instance.heartbeat_task.await;

        // No receiver left means the accept loop already ended.
        let _ = instance.shutdown.send(Some(mode));
        if let Err(e) = instance.accept_task.await {
            warn!("accept loop ended abnormally: {e}");
        }

        let dropped = instance.hub.shutdown();
        info!(?mode, dropped, "pairing relay on {} stopped", instance.local_addr);
    }

    // ── Introspection ─────────────────────────────────────────────────────────

    /// Returns `true` between a successful `start` and the next `stop`.
    pub fn is_running(&self) -> bool {
        self.live().is_some()
    }

    /// The address actually bound, while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.live().map(|l| l.local_addr)
    }

    /// Number of registered endpoints (network and local); `0` when stopped.
    pub fn connection_count(&self) -> usize {
        self.live().map_or(0, |l| l.hub.registry().len())
    }

    // ── Local endpoints ───────────────────────────────────────────────────────

    /// Opens an in-process endpoint whose outbound frames go to `callback`.
    ///
    /// Returns `None` if the server is not running.
    pub fn open_local_endpoint<F>(&self, callback: F) -> Option<LocalEndpointHandle>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let live = self.live()?;
        let endpoint = LocalEndpoint::new(callback);
        let id = endpoint.id();
        if !live.hub.open_local(Arc::new(endpoint)) {
            return None;
        }
        Some(LocalEndpointHandle { id, hub: live.hub })
    }

    /// Closes an in-process endpoint (break notice to its peer, then unregister).
    ///
    /// Returns `false` if the server is stopped or `id` is unknown.
    pub fn close_local_endpoint(&self, id: EndpointId) -> bool {
        self.live().is_some_and(|l| l.hub.close(id))
    }
}

impl Drop for RelayServer {
    fn drop(&mut self) {
        // Dropped without `stop`: make the background tasks wind down.
        if let Some(instance) = self.running.get_mut().take() {
            instance.heartbeat_task.abort();
            let _ = instance.shutdown.send(Some(StopMode::Forced));
        }
    }
}

/// Handle to an in-process endpoint opened with
/// [`RelayServer::open_local_endpoint`].
///
/// The handle stays bound to the server run it was opened in; after a stop
/// or restart its frames are dropped as coming from an unknown sender.
pub struct LocalEndpointHandle {
    id: EndpointId,
    hub: Arc<RelayHub>,
}

impl LocalEndpointHandle {
    /// The relay-assigned id of this endpoint.
    pub fn id(&self) -> EndpointId {
        self.id
    }

    /// Submits one frame as if this endpoint had sent it over the wire.
    pub fn submit(&self, text: &str) -> Dispatch {
        self.hub.dispatch(self.id, text)
    }

    /// QR-code URL a target scans to bind to this endpoint.
    ///
    /// `ws_base` is the address peers use to reach the relay, e.g.
    /// `ws://192.168.1.5:17479`.
    pub fn pairing_url(&self, ws_base: &str) -> String {
        pairing_url(ws_base, self.id)
    }

    /// Closes the endpoint.  Returns `false` if it was already gone.
    pub fn close(self) -> bool {
        self.hub.close(self.id)
    }
}

impl std::fmt::Debug for LocalEndpointHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEndpointHandle")
            .field("id", &self.id)
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
