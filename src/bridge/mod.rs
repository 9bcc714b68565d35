//! Cross-service request bridge.
//!
//! External services decide subscription and will policy and instruct the
//! engine through typed [`Request`]s, each carrying its own oneshot responder.
//! [`BridgeClient`] is the async handle those services hold. [`bus`] keeps the
//! address-and-header style endpoints (`subscribe`, `unsubscribe`, `will`)
//! for callers that can only pass a string key and park the real payload in
//! a [`bus::CorrelationStore`].

pub mod bus;
pub mod client;
pub mod request;

pub use bus::{BusMessage, BusReply, CorrelationStore, Deferred, EventBus};
pub use client::BridgeClient;
pub use request::{
    EngineSnapshot, Request, Responder, SubscribeGrant, SubscribeRequest, UnsubscribeRequest,
};

#[cfg(test)]
mod tests;
