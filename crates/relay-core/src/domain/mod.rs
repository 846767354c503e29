//! Domain types shared by every relay component.
//!
//! Nothing in here performs I/O.  The types are small value objects that can
//! be copied freely between tasks.

pub mod identity;

pub use identity::{EndpointId, Role};
