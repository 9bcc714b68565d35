use std::collections::BTreeMap;

use bytes::Bytes;

/// A message annotation value. Only the primitive kinds the MQTT mapping uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    Bool(bool),
    Int(i64),
    Str(String),
}

/// An AMQP message as seen by the engine after frame decoding.
///
/// The engine forwards these byte-for-byte: fan-out clones the message, it
/// never re-encodes it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AmqpMessage {
    pub message_id: Option<u64>,
    pub subject: Option<String>,
    /// The `to` address.
    pub address: Option<String>,
    pub annotations: BTreeMap<String, Annotation>,
    pub body: Bytes,
}

impl AmqpMessage {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_message_id(mut self, id: u64) -> Self {
        self.message_id = Some(id);
        self
    }

    pub fn annotate(mut self, key: impl Into<String>, value: Annotation) -> Self {
        self.annotations.insert(key.into(), value);
        self
    }

    pub fn bool_annotation(&self, key: &str) -> Option<bool> {
        match self.annotations.get(key) {
            Some(Annotation::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn int_annotation(&self, key: &str) -> Option<i64> {
        match self.annotations.get(key) {
            Some(Annotation::Int(i)) => Some(*i),
            _ => None,
        }
    }
}

/// Outcome of a delivery, as settled by the receiving side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Accepted,
    Rejected,
    Released,
}
