//! Event-bus style endpoints.
//!
//! Requests arrive as a [`BusMessage`] on one of three addresses. The body is
//! a plain string: for `subscribe`, `unsubscribe` and `will-add` it is a
//! correlation key whose payload the caller has parked in the shared
//! [`CorrelationStore`]; for `will-clear` and `will-delivery` it is the
//! connection key itself. Each correlation key is consumed exactly once.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::client::BridgeClient;
use super::request::{SubscribeGrant, SubscribeRequest, UnsubscribeRequest};
use crate::message::WillMessage;
use crate::utils::{BrokerError, Result};

pub const SUBSCRIBE_ADDRESS: &str = "subscribe";
pub const UNSUBSCRIBE_ADDRESS: &str = "unsubscribe";
pub const WILL_ADDRESS: &str = "will";

pub const WILL_ACTION_HEADER: &str = "will-action";
pub const WILL_ACTION_ADD: &str = "will-add";
pub const WILL_ACTION_CLEAR: &str = "will-clear";
pub const WILL_ACTION_DELIVERY: &str = "will-delivery";

/// Payload parked under a correlation key.
#[derive(Debug, Clone, PartialEq)]
pub enum Deferred {
    Subscribe(SubscribeRequest),
    Unsubscribe(UnsubscribeRequest),
    Will(WillMessage),
}

impl Deferred {
    fn kind(&self) -> &'static str {
        match self {
            Deferred::Subscribe(_) => "subscribe",
            Deferred::Unsubscribe(_) => "unsubscribe",
            Deferred::Will(_) => "will",
        }
    }
}

/// Process-local, single-consumption payload store shared by callers and the bus.
#[derive(Debug, Clone, Default)]
pub struct CorrelationStore {
    entries: Arc<Mutex<HashMap<String, Deferred>>>,
}

impl CorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh key no caller has used.
    pub fn new_key() -> String {
        Uuid::new_v4().to_string()
    }

    /// Park `payload` under `key`. Returns `false` and keeps the existing
    /// payload if `key` is still pending.
    pub fn put(&self, key: impl Into<String>, payload: Deferred) -> bool {
        let mut entries = self.entries.lock();
        let key = key.into();
        if entries.contains_key(&key) {
            return false;
        }
        entries.insert(key, payload);
        true
    }

    /// Remove and return the payload under `key`.
    pub fn take(&self, key: &str) -> Option<Deferred> {
        self.entries.lock().remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub address: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl BusMessage {
    pub fn new(address: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// A `will` request with the given action.
    pub fn will(action: &str, connection_key: impl Into<String>) -> Self {
        Self::new(WILL_ADDRESS, connection_key).with_header(WILL_ACTION_HEADER, action)
    }
}

#[derive(Debug)]
pub enum BusReply {
    Granted(SubscribeGrant),
    Empty,
    Delivered(bool),
}

impl BusReply {
    /// JSON body of the reply: granted QoS array, `null`, or a boolean.
    pub fn body(&self) -> Value {
        match self {
            BusReply::Granted(grant) => Value::from(
                grant
                    .granted()
                    .iter()
                    .map(|q| Value::from(u8::from(*q)))
                    .collect::<Vec<_>>(),
            ),
            BusReply::Empty => Value::Null,
            BusReply::Delivered(delivered) => Value::Bool(*delivered),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    client: BridgeClient,
    store: CorrelationStore,
}

impl EventBus {
    pub fn new(client: BridgeClient, store: CorrelationStore) -> Self {
        Self { client, store }
    }

    pub fn store(&self) -> &CorrelationStore {
        &self.store
    }

    /// Handle one bus request. `Ok(None)` means the engine sent no reply,
    /// which for `will-clear` means there was nothing to clear.
    pub async fn dispatch(&self, message: BusMessage) -> Result<Option<BusReply>> {
        debug!(address = %message.address, body = %message.body, "bus request");

        let address = message.address.clone();
        match address.as_str() {
            SUBSCRIBE_ADDRESS => match self.take(&message.body)? {
                Deferred::Subscribe(request) => {
                    let grant = self.client.request_subscribe(request).await?;
                    Ok(Some(BusReply::Granted(grant)))
                }
                other => Err(mismatch(&message.body, SUBSCRIBE_ADDRESS, &other)),
            },
            UNSUBSCRIBE_ADDRESS => match self.take(&message.body)? {
                Deferred::Unsubscribe(request) => {
                    self.client.request_unsubscribe(request).await?;
                    Ok(Some(BusReply::Empty))
                }
                other => Err(mismatch(&message.body, UNSUBSCRIBE_ADDRESS, &other)),
            },
            WILL_ADDRESS => self.dispatch_will(message).await,
            other => Err(BrokerError::InvalidMessage(format!(
                "unknown bus address {other}"
            ))),
        }
    }

    async fn dispatch_will(&self, message: BusMessage) -> Result<Option<BusReply>> {
        let action = message.headers.get(WILL_ACTION_HEADER).map(String::as_str);
        let connection_key = message.body;

        match action {
            Some(WILL_ACTION_ADD) => match self.take(&connection_key)? {
                Deferred::Will(will) => {
                    self.client.will_add(connection_key, will).await?;
                    Ok(Some(BusReply::Empty))
                }
                other => Err(mismatch(&connection_key, WILL_ACTION_ADD, &other)),
            },
            Some(WILL_ACTION_CLEAR) => match self.client.will_clear(connection_key).await {
                Ok(()) => Ok(Some(BusReply::Empty)),
                Err(BrokerError::Unanswered(_)) => Ok(None),
                Err(e) => Err(e),
            },
            Some(WILL_ACTION_DELIVERY) => {
                let delivered = self.client.will_deliver(connection_key).await?;
                Ok(Some(BusReply::Delivered(delivered)))
            }
            other => Err(BrokerError::InvalidMessage(format!(
                "unknown will action {other:?}"
            ))),
        }
    }

    fn take(&self, key: &str) -> Result<Deferred> {
        self.store
            .take(key)
            .ok_or_else(|| BrokerError::UnknownCorrelationKey(key.to_string()))
    }
}

fn mismatch(key: &str, expected: &str, found: &Deferred) -> BrokerError {
    BrokerError::InvalidMessage(format!(
        "correlation key {key} holds a {} payload, expected {expected}",
        found.kind()
    ))
}
