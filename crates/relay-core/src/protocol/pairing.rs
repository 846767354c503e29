//! QR-code payload that hands a client id to a target device.
//!
//! A target learns which client to bind to by scanning a QR code shown by the
//! client.  The code encodes a URL whose fragment names the socket protocol
//! and the relay address followed by the client's id:
//!
//! ```text
//! https://www.dungeon-lab.com/app-download.php#DGLAB-SOCKET#ws://192.168.1.5:17479/<client-id>
//! ```

use crate::domain::identity::EndpointId;

/// Landing page prefix of every pairing URL.
pub const PAIRING_URL_PREFIX: &str = "https://www.dungeon-lab.com/app-download.php";

/// Fragment tag identifying the socket pairing protocol.
pub const PAIRING_PROTOCOL_TAG: &str = "DGLAB-SOCKET";

/// Builds the pairing URL for `client_id` reachable through `ws_base`
/// (e.g. `ws://192.168.1.5:17479`).  A trailing `/` on `ws_base` is ignored.
pub fn pairing_url(ws_base: &str, client_id: EndpointId) -> String {
    let base = ws_base.trim_end_matches('/');
    format!("{PAIRING_URL_PREFIX}#{PAIRING_PROTOCOL_TAG}#{base}/{client_id}")
}

/// Extracts the client id from a pairing URL, if it is one.
pub fn parse_pairing_url(url: &str) -> Option<EndpointId> {
    let rest = url.strip_prefix(PAIRING_URL_PREFIX)?;
    let rest = rest.strip_prefix('#')?.strip_prefix(PAIRING_PROTOCOL_TAG)?;
    let socket_url = rest.strip_prefix('#')?;
    let (_, id) = socket_url.rsplit_once('/')?;
    EndpointId::parse_declared(id)
}
