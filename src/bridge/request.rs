use std::collections::BTreeMap;

use tokio::sync::oneshot;

use crate::message::{Qos, TopicSubscription, WillMessage};
use crate::utils::{BrokerError, Result};

/// Reply channel of a request.
pub type Responder<T> = oneshot::Sender<Result<T>>;

#[derive(Debug, Clone, PartialEq)]
pub struct SubscribeRequest {
    pub client_id: String,
    pub subscriptions: Vec<TopicSubscription>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnsubscribeRequest {
    pub client_id: String,
    pub topics: Vec<String>,
}

/// One instruction for the engine.
#[derive(Debug)]
pub enum Request {
    Subscribe {
        request: SubscribeRequest,
        reply: Responder<SubscribeGrant>,
    },
    Unsubscribe {
        request: UnsubscribeRequest,
        reply: Responder<()>,
    },
    WillAdd {
        connection_key: String,
        will: WillMessage,
        reply: Responder<()>,
    },
    /// Left unanswered when no will is registered for the key.
    WillClear {
        connection_key: String,
        reply: Responder<()>,
    },
    WillDeliver {
        connection_key: String,
        reply: Responder<bool>,
    },
    Snapshot {
        reply: Responder<EngineSnapshot>,
    },
    Shutdown {
        reply: Responder<()>,
    },
}

impl Request {
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Subscribe { .. } => "subscribe",
            Request::Unsubscribe { .. } => "unsubscribe",
            Request::WillAdd { .. } => "will-add",
            Request::WillClear { .. } => "will-clear",
            Request::WillDeliver { .. } => "will-delivery",
            Request::Snapshot { .. } => "snapshot",
            Request::Shutdown { .. } => "shutdown",
        }
    }
}

/// Reply to a subscribe: the granted QoS levels, in request order.
///
/// Retained messages for the subscribed topics are sent only once the
/// subscriber calls [`SubscribeGrant::acknowledge`], so they cannot overtake
/// the subscription acknowledgement on the client side. Dropping the grant
/// skips the replay.
#[derive(Debug)]
pub struct SubscribeGrant {
    granted: Vec<Qos>,
    ack: oneshot::Sender<oneshot::Sender<usize>>,
}

impl SubscribeGrant {
    pub(crate) fn new(granted: Vec<Qos>, ack: oneshot::Sender<oneshot::Sender<usize>>) -> Self {
        Self { granted, ack }
    }

    pub fn granted(&self) -> &[Qos] {
        &self.granted
    }

    /// Confirm the reply was processed. Resolves with the number of retained
    /// messages sent to the subscriber.
    pub async fn acknowledge(self) -> Result<usize> {
        let (tx, rx) = oneshot::channel();
        self.ack.send(tx).map_err(|_| BrokerError::EngineStopped)?;
        rx.await.map_err(|_| BrokerError::EngineStopped)
    }
}

/// Point-in-time view of the engine state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineSnapshot {
    /// Topic to subscriber ids, in subscription order.
    pub subscriptions: BTreeMap<String, Vec<String>>,
    pub retained_topics: Vec<String>,
    pub will_keys: Vec<String>,
    pub topic_receivers: Vec<String>,
    pub clients: Vec<String>,
    pub open_links: usize,
    pub routed: u64,
    pub unrouted: u64,
    pub rejected: u64,
    pub failed_sends: u64,
}
