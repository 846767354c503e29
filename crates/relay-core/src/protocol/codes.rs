//! Result and error codes carried in the `message` field of relay replies.
//!
//! The relay never answers with free-form text: every reply it builds carries
//! one of these codes rendered as a decimal string (e.g. `"402"`).  Keeping the
//! set closed in an enum makes it impossible to send a code the peers do not
//! understand.

use std::fmt;

/// The closed set of result codes the relay can emit.
///
/// | Code | Variant              | Sent when                                        |
/// |------|----------------------|--------------------------------------------------|
/// | 200  | `Success`            | bind succeeded; also the heartbeat payload       |
/// | 209  | `PeerOffline`        | the bound peer disconnected (`break` envelope)   |
/// | 400  | `IdAlreadyBound`     | one of the ids in a bind request is already bound|
/// | 401  | `ClientNotFound`     | the declared client id is not connected          |
/// | 402  | `NotBound`           | a `msg` came from an unbound or mismatched sender|
/// | 403  | `InvalidBindFormat`  | the bind request did not carry the pairing token |
/// | 404  | `ReceiverNotFound`   | the bound receiver has no live connection        |
/// | 405  | `MessageTooLong`     | the forwarded message exceeds the length limit   |
/// | 500  | `InternalError`      | the bind request's target id is not the sender   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ResultCode {
    Success = 200,
    PeerOffline = 209,
    IdAlreadyBound = 400,
    ClientNotFound = 401,
    NotBound = 402,
    InvalidBindFormat = 403,
    ReceiverNotFound = 404,
    MessageTooLong = 405,
    InternalError = 500,
}

impl ResultCode {
    /// Every code, in ascending numeric order.
    pub const ALL: [ResultCode; 9] = [
        ResultCode::Success,
        ResultCode::PeerOffline,
        ResultCode::IdAlreadyBound,
        ResultCode::ClientNotFound,
        ResultCode::NotBound,
        ResultCode::InvalidBindFormat,
        ResultCode::ReceiverNotFound,
        ResultCode::MessageTooLong,
        ResultCode::InternalError,
    ];

    /// Numeric value of the code.
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// The wire spelling of the code, as placed in the `message` field.
    pub fn as_str(self) -> &'static str {
        match self {
            ResultCode::Success => "200",
            ResultCode::PeerOffline => "209",
            ResultCode::IdAlreadyBound => "400",
            ResultCode::ClientNotFound => "401",
            ResultCode::NotBound => "402",
            ResultCode::InvalidBindFormat => "403",
            ResultCode::ReceiverNotFound => "404",
            ResultCode::MessageTooLong => "405",
            ResultCode::InternalError => "500",
        }
    }

    /// Parses a wire code back into the enum.  Unknown codes yield `None`.
    pub fn from_wire(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|code| code.as_str() == text.trim())
    }

    /// Short human-readable description, used in log lines.
    pub fn description(self) -> &'static str {
        match self {
            ResultCode::Success => "success",
            ResultCode::PeerOffline => "peer offline",
            ResultCode::IdAlreadyBound => "id already bound",
            ResultCode::ClientNotFound => "client not found",
            ResultCode::NotBound => "not bound",
            ResultCode::InvalidBindFormat => "invalid bind format",
            ResultCode::ReceiverNotFound => "receiver not found",
            ResultCode::MessageTooLong => "message too long",
            ResultCode::InternalError => "internal error",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.description())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_strings_match_numeric_values() {
        for code in ResultCode::ALL {
            assert_eq!(code.as_str(), code.as_u16().to_string());
        }
    }

    #[test]
    fn test_from_wire_parses_known_codes() {
        assert_eq!(ResultCode::from_wire("209"), Some(ResultCode::PeerOffline));
        assert_eq!(ResultCode::from_wire(" 402 "), Some(ResultCode::NotBound));
    }

    #[test]
    fn test_from_wire_rejects_unknown_codes() {
        assert_eq!(ResultCode::from_wire("201"), None);
        assert_eq!(ResultCode::from_wire("DGLAB"), None);
    }

    #[test]
    fn test_display_includes_code_and_description() {
        assert_eq!(ResultCode::NotBound.to_string(), "402 (not bound)");
    }
}
