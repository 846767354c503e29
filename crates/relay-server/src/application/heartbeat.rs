//! Heartbeat: periodic liveness broadcast to every registered endpoint.
//!
//! Each tick sends every endpoint
//! `{"type":"heartbeat","clientId":<own id>,"targetId":<peer or "">,"message":"200"}`.
//! A peer whose send fails is logged and skipped; it never holds up the rest.
//!
//! The timer is a single `tokio::time::interval` task.  Its first tick fires
//! one full period after it is spawned, not immediately.  Cancelling it is
//! `JoinHandle::abort` followed by awaiting the handle.

use std::sync::Arc;
use std::time::Duration;

use relay_core::Envelope;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::application::connection_registry::ConnectionRegistry;
use crate::application::router::deliver;

/// Smallest period the timer accepts; `interval` panics on zero.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Outcome of one heartbeat round.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatReport {
    /// Endpoints the heartbeat was handed to.
    pub sent: usize,
    /// Endpoints whose send failed.
    pub failed: usize,
}

/// Sends one heartbeat to every endpoint registered right now.
pub fn send_heartbeats(registry: &ConnectionRegistry) -> HeartbeatReport {
    let mut report = HeartbeatReport::default();
    for endpoint in registry.snapshot() {
        let id = endpoint.id();
        let peer = registry.bindings().peer_of(id);
        if deliver(endpoint.as_ref(), &Envelope::heartbeat(id, peer)) {
            report.sent += 1;
        } else {
            report.failed += 1;
        }
    }
    report
}

/// Spawns the repeating heartbeat task.
///
/// Must be called from inside a Tokio runtime.
pub fn spawn_heartbeat(registry: Arc<ConnectionRegistry>, period: Duration) -> JoinHandle<()> {
    let period = period.max(MIN_PERIOD);
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let report = send_heartbeats(&registry);
            debug!(sent = report.sent, failed = report.failed, "heartbeat round");
        }
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
