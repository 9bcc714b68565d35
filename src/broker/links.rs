//! Link registry
//!
//! Owns every link the engine opens on the connection:
//! - one receiver per subscribed topic, feeding the shared inbound sink
//! - per client, one sender to `$mqtt.to.<id>` and one receiver on
//!   `$mqtt.<id>.pubrel`
//! - one sender per will topic
//!
//! Links are opened on first need with at-least-once semantics and are never
//! closed here; they live until the connection goes away.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error};

use crate::client::ClientSession;
use crate::message::AmqpMessage;
use crate::message::address::{client_address, pubrel_address};
use crate::transport::{Connection, DeliveryReceipt, InboundSink, LinkQos, LinkReceiver, LinkSender};
use crate::utils::{BrokerError, Result};

pub struct LinkRegistry {
    connection: Arc<dyn Connection>,
    inbound: InboundSink,
    topic_receivers: HashMap<String, Box<dyn LinkReceiver>>,
    topic_senders: HashMap<String, Box<dyn LinkSender>>,
    sessions: HashMap<String, ClientSession>,
}

impl LinkRegistry {
    pub fn new(connection: Arc<dyn Connection>, inbound: InboundSink) -> Self {
        Self {
            connection,
            inbound,
            topic_receivers: HashMap::new(),
            topic_senders: HashMap::new(),
            sessions: HashMap::new(),
        }
    }

    pub fn ensure_topic_receiver(&mut self, topic: &str) -> Result<()> {
        if self.topic_receivers.contains_key(topic) {
            return Ok(());
        }
        let receiver =
            self.connection
                .open_receiver(topic, LinkQos::AtLeastOnce, self.inbound.clone())?;
        debug!(topic, "topic receiver attached");
        self.topic_receivers.insert(topic.to_string(), receiver);
        Ok(())
    }

    pub fn ensure_client_sender(&mut self, client_id: &str) -> Result<()> {
        if self.has_client_sender(client_id) {
            return Ok(());
        }
        let address = client_address(client_id);
        let sender = self.connection.open_sender(&address, LinkQos::AtLeastOnce)?;
        debug!(client_id, address = %address, "client sender attached");
        self.session_mut(client_id).sender = Some(sender);
        Ok(())
    }

    pub fn ensure_client_pubrel_receiver(&mut self, client_id: &str) -> Result<()> {
        if self.has_client_pubrel_receiver(client_id) {
            return Ok(());
        }
        let address = pubrel_address(client_id);
        let receiver =
            self.connection
                .open_receiver(&address, LinkQos::AtLeastOnce, self.inbound.clone())?;
        debug!(client_id, address = %address, "client pubrel receiver attached");
        self.session_mut(client_id).pubrel_receiver = Some(receiver);
        Ok(())
    }

    pub fn ensure_topic_sender(&mut self, topic: &str) -> Result<()> {
        if self.topic_senders.contains_key(topic) {
            return Ok(());
        }
        let sender = self.connection.open_sender(topic, LinkQos::AtLeastOnce)?;
        debug!(topic, "topic sender attached");
        self.topic_senders.insert(topic.to_string(), sender);
        Ok(())
    }

    /// Forward `message` unchanged on the client's outbound link.
    ///
    /// Callers must have run [`Self::ensure_client_sender`] for `client_id`;
    /// a missing link is a broken invariant and asserts in debug builds.
    pub fn send_to(&self, client_id: &str, message: AmqpMessage) -> Result<DeliveryReceipt> {
        let Some(sender) = self.sessions.get(client_id).and_then(|s| s.sender.as_ref()) else {
            debug_assert!(false, "no outbound link for client {client_id}");
            error!(client_id, "send to client without outbound link");
            return Err(BrokerError::LinkClosed {
                address: client_address(client_id),
            });
        };
        sender.send(message)
    }

    /// Send `message` on the sender attached to `topic`.
    pub fn send_to_topic(&self, topic: &str, message: AmqpMessage) -> Result<DeliveryReceipt> {
        let sender = self
            .topic_senders
            .get(topic)
            .ok_or_else(|| BrokerError::LinkClosed {
                address: topic.to_string(),
            })?;
        sender.send(message)
    }

    pub fn has_topic_receiver(&self, topic: &str) -> bool {
        self.topic_receivers.contains_key(topic)
    }

    pub fn has_client_sender(&self, client_id: &str) -> bool {
        self.sessions
            .get(client_id)
            .is_some_and(|s| s.sender.is_some())
    }

    pub fn has_client_pubrel_receiver(&self, client_id: &str) -> bool {
        self.sessions
            .get(client_id)
            .is_some_and(|s| s.pubrel_receiver.is_some())
    }

    pub fn topic_receivers(&self) -> impl Iterator<Item = &String> {
        self.topic_receivers.keys()
    }

    pub fn clients(&self) -> impl Iterator<Item = &String> {
        self.sessions.keys()
    }

    /// Number of open links of every kind.
    pub fn link_count(&self) -> usize {
        self.topic_receivers.len()
            + self.topic_senders.len()
            + self.sessions.values().map(ClientSession::link_count).sum::<usize>()
    }

    fn session_mut(&mut self, client_id: &str) -> &mut ClientSession {
        self.sessions
            .entry(client_id.to_string())
            .or_insert_with(|| ClientSession::new(client_id))
    }
}

impl std::fmt::Debug for LinkRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkRegistry")
            .field("topic_receivers", &self.topic_receivers.len())
            .field("topic_senders", &self.topic_senders.len())
            .field("sessions", &self.sessions)
            .finish()
    }
}
