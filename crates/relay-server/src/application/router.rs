//! Router: validates inbound envelopes and carries out what they ask for.
//!
//! Every text frame a peer sends ends up in [`Router::dispatch`], together
//! with the id of the connection it arrived on.  The router decodes the
//! envelope, checks it against the pairing rules, and then either pairs two
//! endpoints, forwards the frame to the bound peer, or answers with a result
//! code.
//!
//! # Rules
//!
//! ```text
//! bind  message != "DGLAB"                         → 403 to sender
//!       targetId != sender                         → 500 to sender
//!       clientId not connected                     → 401 to sender
//!       either side already bound                  → 400 to sender
//!       otherwise                                  → 200 to both
//!
//! msg   message longer than the configured limit   → 405 to sender
//!       sender not bound                           → 402 to sender
//!       declared ids ≠ (sender, peer) for its role → 402 to sender
//!       peer connection vanished                   → 404 to sender
//!       otherwise                                  → raw frame to peer
//!
//! break / heartbeat / error / anything else        → logged, ignored
//! ```
//!
//! Frames that do not decode, and frames from ids that are not registered,
//! are logged and dropped without a reply.

use std::sync::Arc;

use relay_core::protocol::command::Command;
use relay_core::{decode, encode, EndpointId, Envelope, MessageType, ResultCode, Role};
use tracing::{debug, warn};

use crate::application::connection_registry::{BindError, ConnectionRegistry};
use crate::application::endpoint::Endpoint;

/// What the router did with one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A bind request succeeded; both parties were told `200`.
    Bound,
    /// A `msg` was relayed to the sender's peer.
    Forwarded,
    /// The frame was refused; the sender was told this code.
    Rejected(ResultCode),
    /// A frame type the relay does not act on.
    Ignored,
    /// The frame was not a decodable envelope.
    Malformed,
    /// The frame came from an id that is not registered.
    UnknownSender,
}

/// Stateless dispatcher over a shared [`ConnectionRegistry`].
#[derive(Clone)]
pub struct Router {
    registry: Arc<ConnectionRegistry>,
    max_message_len: Option<usize>,
}

impl Router {
    /// Creates a router with no message length limit.
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            max_message_len: None,
        }
    }

    /// Sets (or clears) the maximum accepted `msg` payload length, in characters.
    pub fn with_max_message_len(mut self, limit: Option<usize>) -> Self {
        self.max_message_len = limit;
        self
    }

    /// The registry this router reads and mutates.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Handles one text frame received from `sender`.
    pub fn dispatch(&self, sender: EndpointId, text: &str) -> Dispatch {
        let Some(sender_ep) = self.registry.get(sender) else {
            debug!(endpoint = %sender, "frame from unregistered endpoint dropped");
            return Dispatch::UnknownSender;
        };

        let envelope = match decode(text) {
            Ok(env) => env,
            Err(e) => {
                warn!(endpoint = %sender, "dropping undecodable frame: {e}");
                return Dispatch::Malformed;
            }
        };

        match &envelope.kind {
            MessageType::Bind => self.handle_bind(sender, sender_ep.as_ref(), &envelope),
            MessageType::Forward => {
                self.handle_forward(sender, sender_ep.as_ref(), &envelope, text)
            }
            MessageType::Break | MessageType::Heartbeat | MessageType::Error => {
                debug!(endpoint = %sender, kind = %envelope.kind, "inbound control frame ignored");
                Dispatch::Ignored
            }
            MessageType::Unknown(kind) => {
                debug!(endpoint = %sender, kind = %kind, "unrecognised frame type ignored");
                Dispatch::Ignored
            }
        }
    }

    // ── bind ──────────────────────────────────────────────────────────────────

    fn handle_bind(&self, sender: EndpointId, sender_ep: &dyn Endpoint, env: &Envelope) -> Dispatch {
        if !env.has_bind_token() {
            return self.reject_bind(sender_ep, env, ResultCode::InvalidBindFormat);
        }
        if !sender.matches(&env.target_id) {
            return self.reject_bind(sender_ep, env, ResultCode::InternalError);
        }
        let client = match EndpointId::parse_declared(&env.client_id) {
            Some(id) if self.registry.contains(id) => id,
            _ => return self.reject_bind(sender_ep, env, ResultCode::ClientNotFound),
        };

        match self.registry.bind(client, sender) {
            Ok(_) => {
                let reply = Envelope::bind_result(&env.client_id, &env.target_id, ResultCode::Success);
                if let Some(client_ep) = self.registry.get(client) {
                    deliver(client_ep.as_ref(), &reply);
                }
                deliver(sender_ep, &reply);
                debug!(client = %client, target = %sender, "endpoints bound");
                Dispatch::Bound
            }
            Err(BindError::NotRegistered(_)) => {
                self.reject_bind(sender_ep, env, ResultCode::ClientNotFound)
            }
            Err(BindError::AlreadyBound) => {
                self.reject_bind(sender_ep, env, ResultCode::IdAlreadyBound)
            }
        }
    }

    fn reject_bind(&self, sender_ep: &dyn Endpoint, env: &Envelope, code: ResultCode) -> Dispatch {
        warn!(endpoint = %sender_ep.id(), code = code.as_u16(), "bind rejected: {}", code.description());
        deliver(sender_ep, &Envelope::bind_result(&env.client_id, &env.target_id, code));
        Dispatch::Rejected(code)
    }

    // ── msg ───────────────────────────────────────────────────────────────────

    fn handle_forward(
        &self,
        sender: EndpointId,
        sender_ep: &dyn Endpoint,
        env: &Envelope,
        raw: &str,
    ) -> Dispatch {
        if let Some(limit) = self.max_message_len {
            if env.message_len() > limit {
                return self.reject_forward(sender_ep, env, ResultCode::MessageTooLong);
            }
        }

        let Some(binding) = self.registry.bindings().binding_of(sender) else {
            return self.reject_forward(sender_ep, env, ResultCode::NotBound);
        };
        let (own_declared, peer_declared) = match binding.role_of(sender) {
            Some(Role::Client) => (&env.client_id, &env.target_id),
            Some(Role::Target) => (&env.target_id, &env.client_id),
            None => return self.reject_forward(sender_ep, env, ResultCode::NotBound),
        };
        let Some(peer) = binding.peer_of(sender) else {
            return self.reject_forward(sender_ep, env, ResultCode::NotBound);
        };
        if !sender.matches(own_declared) || !peer.matches(peer_declared) {
            return self.reject_forward(sender_ep, env, ResultCode::NotBound);
        }

        let Some(receiver) = self.registry.get(peer) else {
            return self.reject_forward(sender_ep, env, ResultCode::ReceiverNotFound);
        };
        if let Err(e) = receiver.send(raw) {
            warn!(from = %sender, to = %peer, "forward failed: {e}");
        }
        debug!(
            from = %sender,
            to = %peer,
            command = Command::kind_of(&env.message),
            "message forwarded"
        );
        Dispatch::Forwarded
    }

    fn reject_forward(&self, sender_ep: &dyn Endpoint, env: &Envelope, code: ResultCode) -> Dispatch {
        warn!(endpoint = %sender_ep.id(), code = code.as_u16(), "msg rejected: {}", code.description());
        deliver(sender_ep, &Envelope::error(&env.client_id, &env.target_id, code));
        Dispatch::Rejected(code)
    }
}

/// Encodes `envelope` and sends it, logging instead of failing.
pub(crate) fn deliver(to: &dyn Endpoint, envelope: &Envelope) -> bool {
    let text = match encode(envelope) {
        Ok(text) => text,
        Err(e) => {
            warn!(endpoint = %to.id(), "failed to encode {} frame: {e}", envelope.kind);
            return false;
        }
    };
    match to.send(&text) {
        Ok(()) => true,
        Err(e) => {
            warn!(endpoint = %to.id(), "send failed: {e}");
            false
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
