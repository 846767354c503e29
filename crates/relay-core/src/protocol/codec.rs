//! JSON codec for [`Envelope`]s.
//!
//! Wire format: one envelope per WebSocket text frame, encoded as a compact
//! JSON object.  Field order on output is `type`, `clientId`, `targetId`,
//! `message`.  On input, field order does not matter, unknown extra fields are
//! ignored, and missing fields default to empty strings.

use thiserror::Error;

use crate::protocol::envelope::Envelope;

/// Errors that can occur while encoding or decoding an envelope.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The input was empty or only whitespace.
    #[error("empty frame")]
    Empty,

    /// The text is not a JSON object with string fields.
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes an envelope into its JSON text form.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] if serialization fails (it cannot for the
/// envelope's plain string fields, but the signature stays honest).
///
/// # Examples
///
/// ```rust
/// use relay_core::{decode, encode, EndpointId, Envelope};
///
/// let env = Envelope::heartbeat(EndpointId::random(), None);
/// let text = encode(&env).unwrap();
/// assert_eq!(decode(&text).unwrap(), env);
/// ```
pub fn encode(envelope: &Envelope) -> Result<String, CodecError> {
    Ok(serde_json::to_string(envelope)?)
}

/// Decodes one envelope from a text frame.
///
/// # Errors
///
/// Returns [`CodecError::Empty`] for blank input and [`CodecError::Malformed`]
/// when the text is not a JSON object whose present fields are strings.
pub fn decode(text: &str) -> Result<Envelope, CodecError> {
    if text.trim().is_empty() {
        return Err(CodecError::Empty);
    }
    Ok(serde_json::from_str(text)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
