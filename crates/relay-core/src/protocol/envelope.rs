//! The envelope: the one message shape that travels over the wire.
//!
//! Every WebSocket text frame exchanged with the relay is a JSON object with
//! exactly four string fields:
//!
//! ```json
//! {"type":"msg","clientId":"<uuid>","targetId":"<uuid>","message":"strength-1+1+5"}
//! ```
//!
//! # Message flow
//!
//! ```text
//! Relay → peer   bind       connect acknowledgment / bind result
//! peer  → Relay  bind       pairing request (message = "DGLAB")
//! peer ↔ peer    msg        opaque payload, forwarded verbatim
//! Relay → peer   break      the bound peer went away (message = "209")
//! Relay → peer   heartbeat  periodic liveness ping (message = "200")
//! Relay → peer   error      a `msg` was rejected (message = result code)
//! ```
//!
//! Peers never construct replies themselves; the relay builds all of its
//! outbound envelopes through the constructors below, keyed by a
//! [`ResultCode`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::identity::EndpointId;
use crate::protocol::codes::ResultCode;

/// The fixed token a bind request must carry in its `message` field.
pub const BIND_TOKEN: &str = "DGLAB";

/// The `message` value of the acknowledgment sent right after a connection
/// is accepted.  It tells the new peer that `clientId` holds its own id.
pub const CONNECT_ACK_MESSAGE: &str = "targetId";

/// Longest `message` (in characters) peers are expected to send.
///
/// The relay only enforces it when configured to (see `ResultCode::MessageTooLong`).
pub const MAX_MESSAGE_LEN: usize = 1950;

/// The envelope discriminant.
///
/// Inbound text is mapped onto a closed set; anything the relay does not
/// recognise becomes [`MessageType::Unknown`] (carrying the raw spelling for
/// log output) rather than a decode error, so an unexpected `type` is ignored
/// instead of tearing down the session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageType {
    /// `"bind"` – pairing request (inbound) or bind result / connect ack (outbound).
    Bind,
    /// `"msg"` – opaque payload forwarded between bound peers.
    Forward,
    /// `"break"` – relay tells a peer its partner disconnected.
    Break,
    /// `"heartbeat"` – relay liveness ping.
    Heartbeat,
    /// `"error"` – relay reports a rejected forward.
    Error,
    /// Any other spelling.
    Unknown(String),
}

impl MessageType {
    /// Wire spelling of the type.
    pub fn as_str(&self) -> &str {
        match self {
            MessageType::Bind => "bind",
            MessageType::Forward => "msg",
            MessageType::Break => "break",
            MessageType::Heartbeat => "heartbeat",
            MessageType::Error => "error",
            MessageType::Unknown(raw) => raw,
        }
    }
}

impl Default for MessageType {
    fn default() -> Self {
        MessageType::Unknown(String::new())
    }
}

impl From<String> for MessageType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "bind" => MessageType::Bind,
            "msg" => MessageType::Forward,
            "break" => MessageType::Break,
            "heartbeat" => MessageType::Heartbeat,
            "error" => MessageType::Error,
            _ => MessageType::Unknown(raw),
        }
    }
}

impl From<MessageType> for String {
    fn from(kind: MessageType) -> Self {
        match kind {
            MessageType::Unknown(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One wire message.
///
/// The id fields are kept as the raw strings the peer sent.  The relay
/// compares them against real ids with [`EndpointId::matches`], and it must be
/// able to echo them back unchanged in rejections even when they are
/// malformed.  Missing fields decode as empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Envelope {
    /// Envelope discriminant (`"type"` on the wire).
    #[serde(rename = "type")]
    pub kind: MessageType,

    /// Id of the client-side endpoint (`"clientId"` on the wire).
    #[serde(rename = "clientId")]
    pub client_id: String,

    /// Id of the target-side endpoint (`"targetId"` on the wire).
    #[serde(rename = "targetId")]
    pub target_id: String,

    /// Opaque payload, pairing token, or result code.
    pub message: String,
}

impl Envelope {
    /// Builds an envelope from its four parts.
    pub fn new(
        kind: MessageType,
        client_id: impl Into<String>,
        target_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            client_id: client_id.into(),
            target_id: target_id.into(),
            message: message.into(),
        }
    }

    // ── Relay → peer constructors ─────────────────────────────────────────────

    /// Acknowledgment sent right after a connection is registered.
    ///
    /// `clientId` carries the freshly allocated id; `targetId` is empty.
    pub fn connect_ack(id: EndpointId) -> Self {
        Self::new(MessageType::Bind, id.to_string(), "", CONNECT_ACK_MESSAGE)
    }

    /// Result of a bind request, echoing the ids as declared by the requester.
    pub fn bind_result(client_id: &str, target_id: &str, code: ResultCode) -> Self {
        Self::new(MessageType::Bind, client_id, target_id, code.as_str())
    }

    /// Rejection of a `msg`, echoing the ids as declared by the sender.
    pub fn error(client_id: &str, target_id: &str, code: ResultCode) -> Self {
        Self::new(MessageType::Error, client_id, target_id, code.as_str())
    }

    /// Notification that the partner of a binding went offline.
    pub fn break_notice(client: EndpointId, target: EndpointId) -> Self {
        Self::new(
            MessageType::Break,
            client.to_string(),
            target.to_string(),
            ResultCode::PeerOffline.as_str(),
        )
    }

    /// Periodic liveness ping carrying the endpoint's own id and its peer (if any).
    pub fn heartbeat(own: EndpointId, peer: Option<EndpointId>) -> Self {
        Self::new(
            MessageType::Heartbeat,
            own.to_string(),
            peer.map(|p| p.to_string()).unwrap_or_default(),
            ResultCode::Success.as_str(),
        )
    }

    // ── Peer → relay constructors ─────────────────────────────────────────────

    /// A pairing request as a target would send it.
    pub fn bind_request(client: EndpointId, target: EndpointId) -> Self {
        Self::new(
            MessageType::Bind,
            client.to_string(),
            target.to_string(),
            BIND_TOKEN,
        )
    }

    /// A forwarded payload.
    pub fn forward(client: EndpointId, target: EndpointId, message: impl Into<String>) -> Self {
        Self::new(
            MessageType::Forward,
            client.to_string(),
            target.to_string(),
            message,
        )
    }

    // ── Inspection ────────────────────────────────────────────────────────────

    /// Interprets `message` as a result code, if it is one.
    pub fn result_code(&self) -> Option<ResultCode> {
        ResultCode::from_wire(&self.message)
    }

    /// Returns `true` if the bind request carries the pairing token.
    pub fn has_bind_token(&self) -> bool {
        self.message == BIND_TOKEN
    }

    /// Length of `message` in characters (not bytes).
    pub fn message_len(&self) -> usize {
        self.message.chars().count()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_from_known_spellings() {
        assert_eq!(MessageType::from("bind".to_string()), MessageType::Bind);
        assert_eq!(MessageType::from("msg".to_string()), MessageType::Forward);
        assert_eq!(MessageType::from("break".to_string()), MessageType::Break);
        assert_eq!(MessageType::from("heartbeat".to_string()), MessageType::Heartbeat);
        assert_eq!(MessageType::from("error".to_string()), MessageType::Error);
    }

    #[test]
    fn test_message_type_unknown_keeps_raw_spelling() {
        let kind = MessageType::from("clientMsg".to_string());
        assert_eq!(kind, MessageType::Unknown("clientMsg".to_string()));
        assert_eq!(kind.as_str(), "clientMsg");
    }

    #[test]
    fn test_message_type_is_case_sensitive() {
        // Peers send lower-case types; "BIND" is not a bind request.
        assert!(matches!(
            MessageType::from("BIND".to_string()),
            MessageType::Unknown(_)
        ));
    }

    #[test]
    fn test_connect_ack_carries_new_id_and_empty_target() {
        // Arrange
        let id = EndpointId::random();

        // Act
        let ack = Envelope::connect_ack(id);

        // Assert
        assert_eq!(ack.kind, MessageType::Bind);
        assert_eq!(ack.client_id, id.to_string());
        assert_eq!(ack.target_id, "");
        assert_eq!(ack.message, CONNECT_ACK_MESSAGE);
    }

    #[test]
    fn test_heartbeat_without_peer_has_empty_target() {
        let own = EndpointId::random();
        let hb = Envelope::heartbeat(own, None);
        assert_eq!(hb.kind, MessageType::Heartbeat);
        assert_eq!(hb.client_id, own.to_string());
        assert!(hb.target_id.is_empty());
        assert_eq!(hb.result_code(), Some(ResultCode::Success));
    }

    #[test]
    fn test_heartbeat_with_peer_carries_peer_id() {
        let own = EndpointId::random();
        let peer = EndpointId::random();
        let hb = Envelope::heartbeat(own, Some(peer));
        assert_eq!(hb.target_id, peer.to_string());
    }

    #[test]
    fn test_break_notice_carries_peer_offline_code() {
        let c = EndpointId::random();
        let t = EndpointId::random();
        let notice = Envelope::break_notice(c, t);
        assert_eq!(notice.kind, MessageType::Break);
        assert_eq!(notice.result_code(), Some(ResultCode::PeerOffline));
        assert_eq!(notice.client_id, c.to_string());
        assert_eq!(notice.target_id, t.to_string());
    }

    #[test]
    fn test_error_echoes_declared_ids_verbatim() {
        // Malformed ids must survive unchanged so the peer can correlate the reply.
        let err = Envelope::error("bogus", "", ResultCode::NotBound);
        assert_eq!(err.client_id, "bogus");
        assert_eq!(err.target_id, "");
        assert_eq!(err.message, "402");
    }

    #[test]
    fn test_bind_request_has_token() {
        let req = Envelope::bind_request(EndpointId::random(), EndpointId::random());
        assert!(req.has_bind_token());
    }

    #[test]
    fn test_message_len_counts_characters() {
        let env = Envelope::forward(EndpointId::random(), EndpointId::random(), "ééé");
        assert_eq!(env.message_len(), 3);
    }
}
