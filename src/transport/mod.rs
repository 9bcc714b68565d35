//! The `transport` module defines the engine's view of the AMQP connection.
//!
//! Frame encoding, connection bootstrap and session negotiation live outside
//! the engine. What the engine needs is expressed by the [`Connection`],
//! [`LinkSender`] and [`LinkReceiver`] traits. [`memory::MemoryConnection`] is
//! an in-process implementation used by the tests and the loopback binary.

pub mod link;
pub mod memory;

pub use link::{
    Connection, Delivery, DeliveryReceipt, InboundDelivery, InboundSink, LinkQos, LinkReceiver,
    LinkSender,
};
pub use memory::MemoryConnection;

#[cfg(test)]
mod tests;
