//! Broker engine
//!
//! The engine owns the link, subscription, retained and will registries and
//! runs as a single task consuming three queues:
//! - inbound deliveries from every receiver link (fed to the [`Router`])
//! - bridge [`Request`]s from external services
//! - continuations, i.e. work chained off an external event such as the
//!   subscriber acknowledging a subscribe reply
//!
//! Handlers never block. Anything that has to wait (a will publish being
//! settled, a subscribe reply being acknowledged) is parked on a spawned
//! task that touches no engine state and reports back through a channel.

use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::links::LinkRegistry;
use super::retained::RetainedStore;
use super::router::Router;
use super::subscriptions::SubscriptionRegistry;
use super::wills::{DeliveryResult, WillDelivery, WillRegistry};
use crate::bridge::{
    BridgeClient, EngineSnapshot, Request, Responder, SubscribeGrant, SubscribeRequest,
    UnsubscribeRequest,
};
use crate::config::{BrokerSettings, UnknownUnsubscribePolicy};
use crate::message::{Qos, WillMessage};
use crate::transport::{Connection, InboundDelivery};
use crate::utils::{BrokerError, Result};

#[derive(Debug)]
enum Continuation {
    ReplayRetained {
        client_id: String,
        topics: Vec<String>,
        done: oneshot::Sender<usize>,
    },
}

pub struct Engine {
    settings: BrokerSettings,
    connection: Arc<dyn Connection>,
    links: LinkRegistry,
    subscriptions: SubscriptionRegistry,
    retained: RetainedStore,
    wills: WillRegistry,
    router: Router,
    continuations: mpsc::UnboundedSender<Continuation>,
}

/// A running engine.
#[derive(Debug)]
pub struct EngineHandle {
    client: BridgeClient,
    task: JoinHandle<()>,
}

impl EngineHandle {
    pub fn client(&self) -> BridgeClient {
        self.client.clone()
    }

    /// Wait for the engine task to finish.
    pub async fn join(self) {
        let EngineHandle { client, task } = self;
        drop(client);
        if let Err(e) = task.await {
            error!("engine task failed: {e}");
        }
    }
}

impl Engine {
    /// Attach the preconfigured topic receivers on `connection` and spawn the
    /// engine loop. Fails on the first link that cannot be attached.
    pub fn start(connection: Arc<dyn Connection>, settings: BrokerSettings) -> Result<EngineHandle> {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (continuation_tx, continuation_rx) = mpsc::unbounded_channel();

        let mut engine = Engine {
            links: LinkRegistry::new(connection.clone(), inbound_tx),
            subscriptions: SubscriptionRegistry::new(),
            retained: RetainedStore::new(),
            wills: WillRegistry::new(),
            router: Router::new(settings.unrouted),
            continuations: continuation_tx,
            connection,
            settings,
        };

        for topic in &engine.settings.topics {
            if let Err(e) = engine.links.ensure_topic_receiver(topic) {
                error!(topic = %topic, "failed to attach topic receiver: {e}");
                return Err(e);
            }
        }
        info!(
            topics = engine.settings.topics.len(),
            "broker engine started"
        );

        let task = tokio::spawn(engine.run(inbound_rx, request_rx, continuation_rx));
        Ok(EngineHandle {
            client: BridgeClient::new(request_tx),
            task,
        })
    }

    async fn run(
        mut self,
        mut inbound: mpsc::UnboundedReceiver<InboundDelivery>,
        mut requests: mpsc::UnboundedReceiver<Request>,
        mut continuations: mpsc::UnboundedReceiver<Continuation>,
    ) {
        loop {
            tokio::select! {
                Some(delivery) = inbound.recv() => {
                    self.router.route(delivery, &self.links, &self.subscriptions, &mut self.retained);
                }
                Some(continuation) = continuations.recv() => self.on_continuation(continuation),
                request = requests.recv() => match request {
                    Some(request) => {
                        if self.on_request(request).is_break() {
                            break;
                        }
                    }
                    None => {
                        self.close();
                        break;
                    }
                },
            }
        }
    }

    fn close(&self) {
        self.connection.close();
        info!("broker engine shut down");
    }

    fn on_request(&mut self, request: Request) -> ControlFlow<()> {
        debug!(kind = request.kind(), "bridge request");

        match request {
            Request::Subscribe { request, reply } => self.on_subscribe(request, reply),
            Request::Unsubscribe { request, reply } => {
                let _ = reply.send(self.unsubscribe(request));
            }
            Request::WillAdd {
                connection_key,
                will,
                reply,
            } => {
                self.add_will(&connection_key, will);
                let _ = reply.send(Ok(()));
            }
            Request::WillClear {
                connection_key,
                reply,
            } => {
                if self.wills.clear(&connection_key).is_some() {
                    debug!(connection_key = %connection_key, "will cleared");
                    let _ = reply.send(Ok(()));
                } else {
                    // no reply: the caller reads silence as "nothing to clear"
                    debug!(connection_key = %connection_key, "no will to clear");
                }
            }
            Request::WillDeliver {
                connection_key,
                reply,
            } => self.on_will_deliver(&connection_key, reply),
            Request::Snapshot { reply } => {
                let _ = reply.send(Ok(self.snapshot()));
            }
            Request::Shutdown { reply } => {
                self.close();
                let _ = reply.send(Ok(()));
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn on_continuation(&mut self, continuation: Continuation) {
        match continuation {
            Continuation::ReplayRetained {
                client_id,
                topics,
                done,
            } => {
                let replayed = self.replay_retained(&client_id, &topics);
                let _ = done.send(replayed);
            }
        }
    }

    fn on_subscribe(&mut self, request: SubscribeRequest, reply: Responder<SubscribeGrant>) {
        let granted = match self.subscribe(&request) {
            Ok(granted) => granted,
            Err(e) => {
                error!(client_id = %request.client_id, "subscribe failed: {e}");
                let _ = reply.send(Err(e));
                return;
            }
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        if reply.send(Ok(SubscribeGrant::new(granted, ack_tx))).is_err() {
            debug!(client_id = %request.client_id, "subscribe reply dropped by caller");
            return;
        }

        let continuations = self.continuations.clone();
        let SubscribeRequest {
            client_id,
            subscriptions,
        } = request;
        tokio::spawn(async move {
            if let Ok(done) = ack_rx.await {
                let topics = subscriptions.into_iter().map(|s| s.topic).collect();
                let _ = continuations.send(Continuation::ReplayRetained {
                    client_id,
                    topics,
                    done,
                });
            }
        });
    }

    /// Attach the links a subscription needs and record it. Every requested
    /// QoS is granted as is.
    fn subscribe(&mut self, request: &SubscribeRequest) -> Result<Vec<Qos>> {
        let client_id = &request.client_id;
        let mut granted = Vec::with_capacity(request.subscriptions.len());

        for subscription in &request.subscriptions {
            self.links.ensure_topic_receiver(&subscription.topic)?;
            self.links.ensure_client_sender(client_id)?;
            self.links.ensure_client_pubrel_receiver(client_id)?;

            self.subscriptions
                .subscribe(&subscription.topic, client_id.clone());
            granted.push(subscription.qos);
            debug!(client_id = %client_id, topic = %subscription.topic, qos = ?subscription.qos, "subscribed");
        }

        Ok(granted)
    }

    fn unsubscribe(&mut self, request: UnsubscribeRequest) -> Result<()> {
        let UnsubscribeRequest { client_id, topics } = request;
        let missing = self.subscriptions.unsubscribe(&topics, &client_id);
        debug!(client_id = %client_id, topics = ?topics, "unsubscribed");

        if missing.is_empty() {
            return Ok(());
        }
        match self.settings.unknown_unsubscribe {
            UnknownUnsubscribePolicy::Error => {
                warn!(client_id = %client_id, topics = ?missing, "unsubscribe for topics not subscribed");
                Err(BrokerError::NotSubscribed {
                    client_id,
                    topics: missing,
                })
            }
            UnknownUnsubscribePolicy::Ignore => {
                debug!(client_id = %client_id, topics = ?missing, "ignoring unsubscribe for topics not subscribed");
                Ok(())
            }
        }
    }

    fn replay_retained(&self, client_id: &str, topics: &[String]) -> usize {
        let mut replayed = 0;
        for topic in topics {
            let Some(retained) = self.retained.get(topic) else {
                continue;
            };
            match self.links.send_to(client_id, retained.to_amqp()) {
                Ok(_) => replayed += 1,
                Err(e) => warn!(client_id, topic = %topic, "retained replay failed: {e}"),
            }
        }
        if replayed > 0 {
            debug!(client_id, replayed, "retained messages replayed");
        }
        replayed
    }

    fn add_will(&mut self, connection_key: &str, will: WillMessage) {
        debug!(connection_key, topic = %will.topic, "will registered");
        self.wills.add(connection_key, will);
    }

    fn on_will_deliver(&mut self, connection_key: &str, reply: Responder<bool>) {
        match self.wills.deliver(connection_key, &mut self.links) {
            Ok(WillDelivery::NotDelivered) => {
                let _ = reply.send(Ok(false));
            }
            Ok(in_flight) => {
                tokio::spawn(async move {
                    let delivered = in_flight.outcome().await == DeliveryResult::Delivered;
                    let _ = reply.send(Ok(delivered));
                });
            }
            Err(e) => {
                error!(connection_key, "will delivery failed: {e}");
                let _ = reply.send(Ok(false));
            }
        }
    }

    fn snapshot(&self) -> EngineSnapshot {
        let stats = self.router.stats();
        let mut snapshot = EngineSnapshot {
            subscriptions: self
                .subscriptions
                .iter()
                .map(|(topic, subscribers)| (topic.clone(), subscribers.clone()))
                .collect(),
            retained_topics: self.retained.topics().cloned().collect(),
            will_keys: self.wills.keys().cloned().collect(),
            topic_receivers: self.links.topic_receivers().cloned().collect(),
            clients: self.links.clients().cloned().collect(),
            open_links: self.links.link_count(),
            routed: stats.routed,
            unrouted: stats.unrouted,
            rejected: stats.rejected,
            failed_sends: stats.failed_sends,
        };
        snapshot.retained_topics.sort();
        snapshot.will_keys.sort();
        snapshot.topic_receivers.sort();
        snapshot.clients.sort();
        snapshot
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("settings", &self.settings)
            .field("links", &self.links)
            .field("subscriptions", &self.subscriptions)
            .field("retained", &self.retained)
            .field("wills", &self.wills)
            .finish()
    }
}
