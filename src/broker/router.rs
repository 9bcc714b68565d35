//! Message router
//!
//! Dispatches each inbound delivery by its subject:
//! - `publish`: update the retained store when the retain flag is set, accept
//!   the delivery, then forward the message unchanged to every subscriber of
//!   the topic the receiver link serves. Fan-out is best effort; a failed send
//!   to one subscriber is logged and does not affect the others.
//! - `pubrel`: accept, then forward the message to the client owning the
//!   pubrel link it arrived on.
//! - anything else is handled per [`UnroutedPolicy`] and counted.

use tracing::{trace, warn};

use super::links::LinkRegistry;
use super::retained::RetainedStore;
use super::subscriptions::SubscriptionRegistry;
use crate::config::UnroutedPolicy;
use crate::message::address::client_id_from_pubrel_address;
use crate::message::mqtt::{PUBLISH_SUBJECT, PUBREL_SUBJECT};
use crate::message::{Disposition, PublishMessage, PubrelMessage};
use crate::transport::InboundDelivery;

/// What the router did with one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Published { delivered: usize, failed: usize },
    Completed { client_id: String },
    Rejected,
    Unrouted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteStats {
    pub routed: u64,
    pub unrouted: u64,
    pub rejected: u64,
    pub failed_sends: u64,
}

#[derive(Debug)]
pub struct Router {
    unrouted: UnroutedPolicy,
    stats: RouteStats,
}

impl Router {
    pub fn new(unrouted: UnroutedPolicy) -> Self {
        Self {
            unrouted,
            stats: RouteStats::default(),
        }
    }

    pub fn stats(&self) -> RouteStats {
        self.stats
    }

    pub fn route(
        &mut self,
        inbound: InboundDelivery,
        links: &LinkRegistry,
        subscriptions: &SubscriptionRegistry,
        retained: &mut RetainedStore,
    ) -> RouteOutcome {
        let outcome = match inbound.message.subject.as_deref() {
            Some(PUBLISH_SUBJECT) => self.route_publish(inbound, links, subscriptions, retained),
            Some(PUBREL_SUBJECT) => self.route_pubrel(inbound, links),
            _ => self.route_unknown(inbound),
        };

        match &outcome {
            RouteOutcome::Published { .. } | RouteOutcome::Completed { .. } => {
                self.stats.routed += 1
            }
            RouteOutcome::Rejected => self.stats.rejected += 1,
            RouteOutcome::Unrouted => self.stats.unrouted += 1,
        }
        outcome
    }

    fn route_publish(
        &mut self,
        inbound: InboundDelivery,
        links: &LinkRegistry,
        subscriptions: &SubscriptionRegistry,
        retained: &mut RetainedStore,
    ) -> RouteOutcome {
        let InboundDelivery {
            link_address: topic,
            message,
            delivery,
        } = inbound;

        let publish = match PublishMessage::from_amqp(&message) {
            Ok(publish) => publish,
            Err(e) => {
                warn!(topic = %topic, "rejecting publish: {e}");
                delivery.settle(Disposition::Rejected);
                return RouteOutcome::Rejected;
            }
        };

        if publish.retain {
            trace!(topic = %topic, "retained message stored");
            retained.put(&topic, publish);
        }

        delivery.accept();

        let mut delivered = 0;
        let mut failed = 0;
        for client_id in subscriptions.subscribers_of(&topic) {
            match links.send_to(client_id, message.clone()) {
                Ok(_) => delivered += 1,
                Err(e) => {
                    failed += 1;
                    warn!(topic = %topic, client_id = %client_id, "fan-out send failed: {e}");
                }
            }
        }
        self.stats.failed_sends += failed as u64;

        trace!(topic = %topic, delivered, failed, "publish routed");
        RouteOutcome::Published { delivered, failed }
    }

    fn route_pubrel(&mut self, inbound: InboundDelivery, links: &LinkRegistry) -> RouteOutcome {
        let InboundDelivery {
            link_address,
            message,
            delivery,
        } = inbound;

        let Some(client_id) = client_id_from_pubrel_address(&link_address).map(str::to_string)
        else {
            warn!(address = %link_address, "pubrel on a link that is not a client pubrel link");
            delivery.settle(Disposition::Rejected);
            return RouteOutcome::Rejected;
        };

        delivery.accept();

        if let Ok(pubrel) = PubrelMessage::from_amqp(&message) {
            trace!(client_id = %client_id, message_id = pubrel.message_id, "pubrel");
        }
        if let Err(e) = links.send_to(&client_id, message) {
            self.stats.failed_sends += 1;
            warn!(client_id = %client_id, "pubrel forward failed: {e}");
        }

        RouteOutcome::Completed { client_id }
    }

    fn route_unknown(&mut self, inbound: InboundDelivery) -> RouteOutcome {
        warn!(
            address = %inbound.link_address,
            subject = ?inbound.message.subject,
            policy = ?self.unrouted,
            "delivery with unroutable subject"
        );
        match self.unrouted {
            UnroutedPolicy::Ignore => {}
            UnroutedPolicy::Accept => inbound.delivery.accept(),
            UnroutedPolicy::Reject => inbound.delivery.settle(Disposition::Rejected),
        }
        RouteOutcome::Unrouted
    }
}
