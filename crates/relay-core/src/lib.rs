//! # relay-core
//!
//! Shared library for the pairing relay containing the envelope wire format,
//! the result-code taxonomy, endpoint identity types, and the codec for the
//! command strings that ride inside forwarded messages.
//!
//! This crate is used by the relay server and by anything that wants to speak
//! the protocol (test clients, tools).  It has no dependencies on sockets,
//! async runtimes, or logging.
//!
//! # Architecture overview (for beginners)
//!
//! The relay lets two kinds of peer find each other and talk:
//!
//! - a **client** (the controller, e.g. a web page with sliders), and
//! - a **target** (the device side, e.g. a phone app driving hardware).
//!
//! Both connect to the relay, receive a fresh identifier, and then the target
//! asks the relay to *bind* it to a client.  Once bound, every `msg` envelope
//! one side sends is forwarded verbatim to the other.
//!
//! This crate defines:
//!
//! - **`domain`** – Identity: [`EndpointId`] and the [`Role`] an endpoint plays
//!   inside a binding.
//!
//! - **`protocol`** – How text travels over the wire.  Every frame is a JSON
//!   [`Envelope`] with four string fields; replies carry a numeric
//!   [`ResultCode`].  The `command` sub-module understands the strings carried
//!   inside forwarded messages.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `relay_core::Envelope` instead of `relay_core::protocol::envelope::Envelope`.
pub use domain::identity::{EndpointId, Role};
pub use protocol::codec::{decode, encode, CodecError};
pub use protocol::codes::ResultCode;
pub use protocol::envelope::{Envelope, MessageType, BIND_TOKEN, MAX_MESSAGE_LEN};
