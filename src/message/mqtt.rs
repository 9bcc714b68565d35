//! MQTT views over [`AmqpMessage`].

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::amqp::{AmqpMessage, Annotation};
use crate::utils::{BrokerError, Result};

pub const PUBLISH_SUBJECT: &str = "publish";
pub const PUBREL_SUBJECT: &str = "pubrel";

pub const QOS_ANNOTATION: &str = "x-opt-mqtt-qos";
pub const RETAIN_ANNOTATION: &str = "x-opt-mqtt-retain";
pub const DUP_ANNOTATION: &str = "x-opt-mqtt-dup";

/// MQTT delivery guarantee level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Qos {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl TryFrom<u8> for Qos {
    type Error = BrokerError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Qos::AtMostOnce),
            1 => Ok(Qos::AtLeastOnce),
            2 => Ok(Qos::ExactlyOnce),
            other => Err(BrokerError::InvalidMessage(format!("qos {other} out of range"))),
        }
    }
}

impl From<Qos> for u8 {
    fn from(qos: Qos) -> u8 {
        match qos {
            Qos::AtMostOnce => 0,
            Qos::AtLeastOnce => 1,
            Qos::ExactlyOnce => 2,
        }
    }
}

/// A requested subscription: topic plus the QoS the client asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSubscription {
    pub topic: String,
    pub qos: Qos,
}

impl TopicSubscription {
    pub fn new(topic: impl Into<String>, qos: Qos) -> Self {
        Self {
            topic: topic.into(),
            qos,
        }
    }
}

/// MQTT PUBLISH carried over AMQP with subject `publish`.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishMessage {
    pub message_id: Option<u64>,
    pub qos: Qos,
    pub dup: bool,
    pub retain: bool,
    pub topic: String,
    pub payload: Bytes,
}

impl PublishMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>, qos: Qos) -> Self {
        Self {
            message_id: None,
            qos,
            dup: false,
            retain: false,
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    pub fn retained(mut self) -> Self {
        self.retain = true;
        self
    }

    pub fn from_amqp(message: &AmqpMessage) -> Result<Self> {
        if message.subject.as_deref() != Some(PUBLISH_SUBJECT) {
            return Err(BrokerError::InvalidMessage(format!(
                "expected subject {PUBLISH_SUBJECT}, got {:?}",
                message.subject
            )));
        }
        let topic = message
            .address
            .clone()
            .ok_or_else(|| BrokerError::InvalidMessage("publish without address".to_string()))?;
        let qos = message
            .int_annotation(QOS_ANNOTATION)
            .ok_or_else(|| BrokerError::InvalidMessage("publish without qos".to_string()))?;
        let qos = u8::try_from(qos)
            .map_err(|_| BrokerError::InvalidMessage(format!("qos {qos} out of range")))
            .and_then(Qos::try_from)?;

        Ok(Self {
            message_id: message.message_id,
            qos,
            dup: message.bool_annotation(DUP_ANNOTATION).unwrap_or(false),
            retain: message.bool_annotation(RETAIN_ANNOTATION).unwrap_or(false),
            topic,
            payload: message.body.clone(),
        })
    }

    pub fn to_amqp(&self) -> AmqpMessage {
        let mut message = AmqpMessage::new(self.payload.clone())
            .with_subject(PUBLISH_SUBJECT)
            .with_address(self.topic.clone())
            .annotate(QOS_ANNOTATION, Annotation::Int(u8::from(self.qos).into()))
            .annotate(RETAIN_ANNOTATION, Annotation::Bool(self.retain))
            .annotate(DUP_ANNOTATION, Annotation::Bool(self.dup));
        message.message_id = self.message_id;
        message
    }
}

/// MQTT PUBREL carried over AMQP with subject `pubrel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PubrelMessage {
    pub message_id: u64,
}

impl PubrelMessage {
    pub fn from_amqp(message: &AmqpMessage) -> Result<Self> {
        if message.subject.as_deref() != Some(PUBREL_SUBJECT) {
            return Err(BrokerError::InvalidMessage(format!(
                "expected subject {PUBREL_SUBJECT}, got {:?}",
                message.subject
            )));
        }
        let message_id = message
            .message_id
            .ok_or_else(|| BrokerError::InvalidMessage("pubrel without message id".to_string()))?;
        Ok(Self { message_id })
    }

    pub fn to_amqp(&self) -> AmqpMessage {
        AmqpMessage::new(Bytes::new())
            .with_subject(PUBREL_SUBJECT)
            .with_message_id(self.message_id)
    }
}

/// Last will registered by a connection.
#[derive(Debug, Clone, PartialEq)]
pub struct WillMessage {
    pub retain: bool,
    pub topic: String,
    pub qos: Qos,
    pub payload: Bytes,
}

impl WillMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>, qos: Qos) -> Self {
        Self {
            retain: false,
            topic: topic.into(),
            qos,
            payload: payload.into(),
        }
    }

    /// The publish sent when the will fires. Marked dup since it is synthesized
    /// by the broker rather than published by the client.
    pub fn to_publish(&self) -> PublishMessage {
        PublishMessage {
            message_id: None,
            qos: self.qos,
            dup: true,
            retain: self.retain,
            topic: self.topic.clone(),
            payload: self.payload.clone(),
        }
    }
}
