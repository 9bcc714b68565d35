//! Decoded message model.
//!
//! The transport hands the engine already-decoded [`AmqpMessage`]s. The MQTT
//! semantics ride on top of them: the subject names the MQTT packet kind and
//! message annotations carry QoS, retain and dup flags.

pub mod address;
pub mod amqp;
pub mod mqtt;

pub use amqp::{AmqpMessage, Annotation, Disposition};
pub use mqtt::{PublishMessage, PubrelMessage, Qos, TopicSubscription, WillMessage};
