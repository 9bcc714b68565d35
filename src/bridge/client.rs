use tokio::sync::{mpsc, oneshot};

use super::request::{
    EngineSnapshot, Request, Responder, SubscribeGrant, SubscribeRequest, UnsubscribeRequest,
};
use crate::message::{TopicSubscription, WillMessage};
use crate::utils::{BrokerError, Result};

/// Handle used by external services to instruct the engine.
///
/// Cheap to clone. The engine stops once every handle is dropped.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    requests: mpsc::UnboundedSender<Request>,
}

impl BridgeClient {
    pub(crate) fn new(requests: mpsc::UnboundedSender<Request>) -> Self {
        Self { requests }
    }

    async fn call<T>(
        &self,
        kind: &'static str,
        build: impl FnOnce(Responder<T>) -> Request,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.requests
            .send(build(tx))
            .map_err(|_| BrokerError::EngineStopped)?;
        rx.await.map_err(|_| BrokerError::Unanswered(kind))?
    }

    pub async fn subscribe(
        &self,
        client_id: impl Into<String>,
        subscriptions: Vec<TopicSubscription>,
    ) -> Result<SubscribeGrant> {
        self.request_subscribe(SubscribeRequest {
            client_id: client_id.into(),
            subscriptions,
        })
        .await
    }

    pub async fn request_subscribe(&self, request: SubscribeRequest) -> Result<SubscribeGrant> {
        self.call("subscribe", |reply| Request::Subscribe { request, reply })
            .await
    }

    pub async fn unsubscribe(
        &self,
        client_id: impl Into<String>,
        topics: Vec<String>,
    ) -> Result<()> {
        self.request_unsubscribe(UnsubscribeRequest {
            client_id: client_id.into(),
            topics,
        })
        .await
    }

    pub async fn request_unsubscribe(&self, request: UnsubscribeRequest) -> Result<()> {
        self.call("unsubscribe", |reply| Request::Unsubscribe { request, reply })
            .await
    }

    pub async fn will_add(&self, connection_key: impl Into<String>, will: WillMessage) -> Result<()> {
        let connection_key = connection_key.into();
        self.call("will-add", |reply| Request::WillAdd {
            connection_key,
            will,
            reply,
        })
        .await
    }

    /// Fails with [`BrokerError::Unanswered`] when there was nothing to clear.
    pub async fn will_clear(&self, connection_key: impl Into<String>) -> Result<()> {
        let connection_key = connection_key.into();
        self.call("will-clear", |reply| Request::WillClear {
            connection_key,
            reply,
        })
        .await
    }

    /// `true` iff a will was registered and its publish was settled.
    pub async fn will_deliver(&self, connection_key: impl Into<String>) -> Result<bool> {
        let connection_key = connection_key.into();
        self.call("will-delivery", |reply| Request::WillDeliver {
            connection_key,
            reply,
        })
        .await
    }

    pub async fn snapshot(&self) -> Result<EngineSnapshot> {
        self.call("snapshot", |reply| Request::Snapshot { reply }).await
    }

    /// Stop the engine and close the connection.
    pub async fn shutdown(&self) -> Result<()> {
        self.call("shutdown", |reply| Request::Shutdown { reply }).await
    }
}
