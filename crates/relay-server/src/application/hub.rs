//! RelayHub: the connection lifecycle shared by every transport.
//!
//! The WebSocket server and in-process endpoints both go through the hub:
//!
//! ```text
//! open   register → send connect ack        (rolled back if either fails)
//! frame  dispatch → Router
//! close  unregister (with its binding) → break notice to the former peer
//! ```
//!
//! A fresh hub is created for every server start, so nothing survives a
//! restart.

use std::sync::Arc;

use relay_core::{EndpointId, Envelope};
use tracing::{debug, info, warn};

use crate::application::connection_registry::ConnectionRegistry;
use crate::application::endpoint::Endpoint;
use crate::application::router::{deliver, Dispatch, Router};

/// Registry + router bundle with open/close semantics.
pub struct RelayHub {
    registry: Arc<ConnectionRegistry>,
    router: Router,
}

impl RelayHub {
    /// Creates an empty hub.  `max_message_len` is passed through to the router.
    pub fn new(max_message_len: Option<usize>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let router = Router::new(Arc::clone(&registry)).with_max_message_len(max_message_len);
        Self { registry, router }
    }

    /// The connection table (for the heartbeat and introspection).
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Registers a network endpoint and sends it the connect acknowledgment
    /// carrying its id.
    ///
    /// Returns `false` if registration or the acknowledgment failed; in that
    /// case the endpoint is not left in the table.
    pub fn open(&self, endpoint: Arc<dyn Endpoint>) -> bool {
        let id = endpoint.id();
        if !self.registry.register(Arc::clone(&endpoint)) {
            warn!(endpoint = %id, "duplicate endpoint id; connection refused");
            return false;
        }
        if !deliver(endpoint.as_ref(), &Envelope::connect_ack(id)) {
            warn!(endpoint = %id, "connect acknowledgment failed; rolling back");
            self.registry.unregister(id);
            return false;
        }
        info!(endpoint = %id, "endpoint connected");
        true
    }

    /// Registers an in-process endpoint.  No acknowledgment is sent.
    pub fn open_local(&self, endpoint: Arc<dyn Endpoint>) -> bool {
        let id = endpoint.id();
        let ok = self.registry.register(endpoint);
        if ok {
            info!(endpoint = %id, "local endpoint opened");
        } else {
            warn!(endpoint = %id, "duplicate local endpoint id");
        }
        ok
    }

    /// Routes one inbound frame from `sender`.
    pub fn dispatch(&self, sender: EndpointId, text: &str) -> Dispatch {
        self.router.dispatch(sender, text)
    }

    /// Closes `id`: unregisters it, then tells the peer of the binding it
    /// held at that moment (if any) that it went offline.
    ///
    /// Returns `false` if `id` was not registered.
    pub fn close(&self, id: EndpointId) -> bool {
        let Some(removed) = self.registry.unregister(id) else {
            return false;
        };
        info!(endpoint = %id, "endpoint closed");
        if let Some(binding) = removed.binding {
            if let Some(peer) = binding.peer_of(id).and_then(|p| self.registry.get(p)) {
                deliver(
                    peer.as_ref(),
                    &Envelope::break_notice(binding.client, binding.target),
                );
                debug!(endpoint = %id, peer = %peer.id(), "break notice sent");
            }
        }
        true
    }

    /// Drops every remaining endpoint without notifying anyone.
    ///
    /// Returns how many endpoints were dropped.
    pub fn shutdown(&self) -> usize {
        let dropped = self.registry.drain().len();
        if dropped > 0 {
            debug!(count = dropped, "endpoints dropped at shutdown");
        }
        dropped
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::endpoint::{LocalEndpoint, MockEndpoint, SendError};
    use relay_core::{decode, encode, MessageType, ResultCode};
    use std::sync::Mutex;

    fn recorder() -> (Arc<dyn Endpoint>, Arc<Mutex<Vec<String>>>) {
        let inbox = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&inbox);
        let ep = LocalEndpoint::new(move |t: &str| sink.lock().unwrap().push(t.to_string()));
        (Arc::new(ep), inbox)
    }

    #[test]
    fn test_open_sends_connect_ack_with_new_id() {
        // Arrange
        let hub = RelayHub::new(None);
        let (ep, inbox) = recorder();
        let id = ep.id();

        // Act
        let ok = hub.open(ep);

        // Assert
        assert!(ok);
        assert!(hub.registry().contains(id));
        let ack = decode(&inbox.lock().unwrap()[0]).unwrap();
        assert_eq!(ack, Envelope::connect_ack(id));
    }

    #[test]
    fn test_open_rolls_back_when_ack_fails() {
        // Arrange
        let hub = RelayHub::new(None);
        let id = EndpointId::random();
        let mut ep = MockEndpoint::new();
        ep.expect_id().return_const(id);
        ep.expect_send()
            .times(1)
            .returning(move |_| Err(SendError::Closed(id)));

        // Act
        let ok = hub.open(Arc::new(ep));

        // Assert
        assert!(!ok);
        assert!(!hub.registry().contains(id));
    }

    #[test]
    fn test_open_local_skips_handshake() {
        let hub = RelayHub::new(None);
        let (ep, inbox) = recorder();

        assert!(hub.open_local(ep));
        assert!(inbox.lock().unwrap().is_empty());
    }

    #[test]
    fn test_close_bound_client_sends_break_to_target() {
        // Arrange
        let hub = RelayHub::new(None);
        let (client, _) = recorder();
        let (target, target_inbox) = recorder();
        let (c, t) = (client.id(), target.id());
        hub.open_local(client);
        hub.open_local(target);
        let bind = encode(&Envelope::bind_request(c, t)).unwrap();
        assert_eq!(hub.dispatch(t, &bind), Dispatch::Bound);
        target_inbox.lock().unwrap().clear();

        // Act
        let closed = hub.close(c);

        // Assert
        assert!(closed);
        let notice = decode(&target_inbox.lock().unwrap()[0]).unwrap();
        assert_eq!(notice.kind, MessageType::Break);
        assert_eq!(notice.client_id, c.to_string());
        assert_eq!(notice.target_id, t.to_string());
        assert_eq!(notice.result_code(), Some(ResultCode::PeerOffline));
        assert_eq!(hub.registry().bindings().peer_of(t), None);
        assert!(!hub.registry().contains(c));
    }

    #[test]
    fn test_close_unbound_endpoint_sends_nothing() {
        let hub = RelayHub::new(None);
        let (a, inbox_a) = recorder();
        let (b, inbox_b) = recorder();
        let id = a.id();
        hub.open_local(a);
        hub.open_local(b);

        assert!(hub.close(id));
        assert!(inbox_a.lock().unwrap().is_empty());
        assert!(inbox_b.lock().unwrap().is_empty());
    }

    #[test]
    fn test_close_unknown_id_returns_false() {
        let hub = RelayHub::new(None);
        assert!(!hub.close(EndpointId::random()));
    }

    #[test]
    fn test_close_racing_bind_never_leaves_target_unnotified() {
        // Either the bind loses (client already gone) or the target hears 209.
        for _ in 0..500 {
            // Arrange
            let hub = Arc::new(RelayHub::new(None));
            let (client, _) = recorder();
            let (target, target_inbox) = recorder();
            let (c, t) = (client.id(), target.id());
            hub.open_local(client);
            hub.open_local(target);
            let bind = encode(&Envelope::bind_request(c, t)).unwrap();

            // Act
            let closer = {
                let hub = Arc::clone(&hub);
                std::thread::spawn(move || hub.close(c))
            };
            let binder = {
                let hub = Arc::clone(&hub);
                std::thread::spawn(move || hub.dispatch(t, &bind))
            };
            assert!(closer.join().unwrap());
            let outcome = binder.join().unwrap();

            // Assert
            assert_eq!(hub.registry().bindings().peer_of(t), None);
            if outcome == Dispatch::Bound {
                let got_break = target_inbox
                    .lock()
                    .unwrap()
                    .iter()
                    .filter_map(|text| decode(text).ok())
                    .any(|env| {
                        env.kind == MessageType::Break
                            && env.result_code() == Some(ResultCode::PeerOffline)
                    });
                assert!(got_break, "bound target was never told its client left");
            }
        }
    }

    #[test]
    fn test_shutdown_drops_silently() {
        let hub = RelayHub::new(None);
        let (a, inbox) = recorder();
        hub.open_local(a);

        assert_eq!(hub.shutdown(), 1);
        assert!(hub.registry().is_empty());
        assert!(inbox.lock().unwrap().is_empty());
    }
}
