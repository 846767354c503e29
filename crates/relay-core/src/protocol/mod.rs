//! Protocol module containing the envelope type, result codes, and codecs.

pub mod codec;
pub mod codes;
pub mod command;
pub mod envelope;
pub mod pairing;

pub use codec::{decode, encode, CodecError};
pub use codes::ResultCode;
pub use command::{Channel, Command, CommandError, StrengthMode};
pub use envelope::{Envelope, MessageType, BIND_TOKEN, MAX_MESSAGE_LEN};
pub use pairing::pairing_url;
