//! Will registry
//!
//! Keyed by the name of the link the will was declared on, not by client id.
//! Delivering a will leaves it registered; only an explicit clear removes it.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::links::LinkRegistry;
use crate::message::WillMessage;
use crate::transport::DeliveryReceipt;
use crate::utils::Result;

/// Final result of a will delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryResult {
    Delivered,
    NotDelivered,
}

/// A will delivery as started by [`WillRegistry::deliver`].
#[derive(Debug)]
pub enum WillDelivery {
    NotDelivered,
    InFlight(DeliveryReceipt),
}

impl WillDelivery {
    /// Resolve once the transport has settled the send.
    pub async fn outcome(self) -> DeliveryResult {
        match self {
            WillDelivery::NotDelivered => DeliveryResult::NotDelivered,
            WillDelivery::InFlight(receipt) => match receipt.settled().await {
                Ok(_) => DeliveryResult::Delivered,
                Err(e) => {
                    warn!("will delivery was never settled: {e}");
                    DeliveryResult::NotDelivered
                }
            },
        }
    }
}

#[derive(Debug, Default)]
pub struct WillRegistry {
    wills: HashMap<String, WillMessage>,
}

impl WillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `will` for `connection_key`, replacing any previous one.
    pub fn add(&mut self, connection_key: &str, will: WillMessage) {
        self.wills.insert(connection_key.to_string(), will);
    }

    /// Remove the will for `connection_key`, returning it if there was one.
    pub fn clear(&mut self, connection_key: &str) -> Option<WillMessage> {
        self.wills.remove(connection_key)
    }

    pub fn contains(&self, connection_key: &str) -> bool {
        self.wills.contains_key(connection_key)
    }

    pub fn get(&self, connection_key: &str) -> Option<&WillMessage> {
        self.wills.get(connection_key)
    }

    pub fn len(&self) -> usize {
        self.wills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wills.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.wills.keys()
    }

    /// Publish the will registered for `connection_key` to its topic.
    pub fn deliver(&self, connection_key: &str, links: &mut LinkRegistry) -> Result<WillDelivery> {
        let Some(will) = self.wills.get(connection_key) else {
            debug!(connection_key, "no will to deliver");
            return Ok(WillDelivery::NotDelivered);
        };

        links.ensure_topic_sender(&will.topic)?;
        let receipt = links.send_to_topic(&will.topic, will.to_publish().to_amqp())?;
        debug!(connection_key, topic = %will.topic, "will sent");
        Ok(WillDelivery::InFlight(receipt))
    }
}
