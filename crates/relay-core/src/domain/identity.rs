//! Endpoint identity and binding roles.
//!
//! # Why a newtype around `Uuid`? (for beginners)
//!
//! The relay juggles several kinds of string on the wire: identifiers, command
//! payloads, result codes.  Wrapping identifiers in [`EndpointId`] means the
//! compiler rejects code that accidentally passes a payload where an id is
//! expected.  The wrapper is `Copy`, so it costs nothing to pass around.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique 128-bit identifier assigned to every connected endpoint.
///
/// Ids are allocated by the relay (never chosen by peers) using random UUID v4
/// values, so two live endpoints colliding is astronomically unlikely.  The
/// registry still rejects duplicates explicitly.
///
/// # Example
///
/// ```rust
/// use relay_core::EndpointId;
///
/// let id = EndpointId::random();
/// let parsed: EndpointId = id.to_string().parse().unwrap();
/// assert_eq!(id, parsed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointId(Uuid);

impl EndpointId {
    /// Allocates a fresh random id.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parses an id as declared by a peer inside an envelope.
    ///
    /// Returns `None` for empty or malformed strings instead of an error,
    /// because a malformed id on the wire is just "an id that matches nothing".
    pub fn parse_declared(text: &str) -> Option<Self> {
        Uuid::parse_str(text.trim()).ok().map(Self)
    }

    /// Returns `true` if `declared` (an id string taken from an envelope)
    /// names this endpoint.
    ///
    /// Comparison happens on the parsed value, so upper-case or braced UUID
    /// spellings still match.
    pub fn matches(&self, declared: &str) -> bool {
        Self::parse_declared(declared) == Some(*self)
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Canonical lower-case hyphenated form, e.g. 67e55044-10b1-426f-9247-bb680e5fe0c8
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for EndpointId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for EndpointId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// The side an endpoint occupies inside a binding.
///
/// Roles only differ in naming: both sides have the same forwarding rights.
/// The role decides which envelope field (`clientId` or `targetId`) must
/// carry the sender's own id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The controller side (the id declared as `clientId`).
    Client,
    /// The device side (the id declared as `targetId`, the one that asked to bind).
    Target,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Client => f.write_str("client"),
            Role::Target => f.write_str("target"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_ids_are_distinct() {
        let a = EndpointId::random();
        let b = EndpointId::random();
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_is_lowercase_hyphenated() {
        let id = EndpointId::from_uuid(
            Uuid::parse_str("67E55044-10B1-426F-9247-BB680E5FE0C8").unwrap(),
        );
        assert_eq!(id.to_string(), "67e55044-10b1-426f-9247-bb680e5fe0c8");
    }

    #[test]
    fn test_matches_accepts_uppercase_spelling() {
        // Arrange
        let id = EndpointId::random();
        let upper = id.to_string().to_uppercase();

        // Act / Assert
        assert!(id.matches(&upper));
    }

    #[test]
    fn test_matches_rejects_other_id() {
        let id = EndpointId::random();
        assert!(!id.matches(&EndpointId::random().to_string()));
    }

    #[test]
    fn test_parse_declared_rejects_empty_and_garbage() {
        assert_eq!(EndpointId::parse_declared(""), None);
        assert_eq!(EndpointId::parse_declared("not-an-id"), None);
    }

    #[test]
    fn test_serde_is_transparent_string() {
        let id = EndpointId::random();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}
