//! The `client` module defines the per-client link state held by the broker.
//!
//! A session is created implicitly by the first subscribe of a client id and
//! is never torn down by the engine.

pub mod session;
pub use session::ClientSession;
