//! Credential primitives: redacted secrets and the one-time OAuth `state` nonce.

pub mod secret;
pub mod state;

pub use secret::*;
pub use state::*;
