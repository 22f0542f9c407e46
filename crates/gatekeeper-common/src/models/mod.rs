//! Domain models shared across Gatekeeper crates.

pub mod member;
pub mod role;

pub use member::*;
pub use role::*;
