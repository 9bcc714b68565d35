//! In-memory connection.
//!
//! Links are recorded in a shared table instead of being negotiated with a
//! peer. Sends are settled `Accepted` immediately unless the address has been
//! marked failing. Inbound traffic is injected with [`MemoryConnection::deliver`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::trace;

use super::link::{
    Connection, Delivery, DeliveryReceipt, InboundDelivery, InboundSink, LinkQos, LinkReceiver,
    LinkSender,
};
use crate::message::{AmqpMessage, Disposition};
use crate::utils::{BrokerError, Result};

#[derive(Debug, Clone, Default)]
pub struct MemoryConnection {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    receivers: HashMap<String, Vec<AttachedReceiver>>,
    senders: HashMap<String, Vec<LinkQos>>,
    sent: Vec<(String, AmqpMessage)>,
    failing: HashSet<String>,
    refused: HashSet<String>,
    closed: bool,
}

#[derive(Debug)]
struct AttachedReceiver {
    qos: LinkQos,
    sink: InboundSink,
}

impl MemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject `message` on the receiver attached at `address`, returning the
    /// channel its settlement is reported on.
    pub fn deliver(
        &self,
        address: &str,
        message: AmqpMessage,
    ) -> Result<oneshot::Receiver<Disposition>> {
        let state = self.state.lock();
        let receiver = state
            .receivers
            .get(address)
            .and_then(|r| r.first())
            .ok_or_else(|| BrokerError::Transport(format!("no receiver attached to {address}")))?;

        let (delivery, settled) = Delivery::new();
        receiver
            .sink
            .send(InboundDelivery {
                link_address: address.to_string(),
                message,
                delivery,
            })
            .map_err(|_| BrokerError::LinkClosed {
                address: address.to_string(),
            })?;
        Ok(settled)
    }

    /// Messages sent on senders attached to `address`, oldest first.
    pub fn sent_to(&self, address: &str) -> Vec<AmqpMessage> {
        self.state
            .lock()
            .sent
            .iter()
            .filter(|(a, _)| a == address)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn sent_count(&self) -> usize {
        self.state.lock().sent.len()
    }

    /// Make every later send to `address` fail.
    pub fn fail_sends_to(&self, address: &str) {
        self.state.lock().failing.insert(address.to_string());
    }

    /// Make every later link attach to `address` fail.
    pub fn refuse_links_to(&self, address: &str) {
        self.state.lock().refused.insert(address.to_string());
    }

    pub fn receivers_attached(&self, address: &str) -> usize {
        self.state.lock().receivers.get(address).map_or(0, Vec::len)
    }

    pub fn senders_attached(&self, address: &str) -> usize {
        self.state.lock().senders.get(address).map_or(0, Vec::len)
    }

    pub fn receiver_qos(&self, address: &str) -> Option<LinkQos> {
        self.state
            .lock()
            .receivers
            .get(address)
            .and_then(|r| r.first())
            .map(|r| r.qos)
    }

    pub fn sender_qos(&self, address: &str) -> Option<LinkQos> {
        self.state
            .lock()
            .senders
            .get(address)
            .and_then(|s| s.first())
            .copied()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn check_attach(state: &MemoryState, address: &str) -> Result<()> {
        if state.closed {
            return Err(BrokerError::Transport("connection closed".to_string()));
        }
        if state.refused.contains(address) {
            return Err(BrokerError::Transport(format!(
                "peer refused link to {address}"
            )));
        }
        Ok(())
    }
}

impl Connection for MemoryConnection {
    fn open_sender(&self, address: &str, qos: LinkQos) -> Result<Box<dyn LinkSender>> {
        let mut state = self.state.lock();
        Self::check_attach(&state, address)?;
        state
            .senders
            .entry(address.to_string())
            .or_default()
            .push(qos);
        trace!(address, "sender attached");

        Ok(Box::new(MemorySender {
            address: address.to_string(),
            state: self.state.clone(),
        }))
    }

    fn open_receiver(
        &self,
        address: &str,
        qos: LinkQos,
        sink: InboundSink,
    ) -> Result<Box<dyn LinkReceiver>> {
        let mut state = self.state.lock();
        Self::check_attach(&state, address)?;
        state
            .receivers
            .entry(address.to_string())
            .or_default()
            .push(AttachedReceiver { qos, sink });
        trace!(address, "receiver attached");

        Ok(Box::new(MemoryReceiver {
            address: address.to_string(),
        }))
    }

    fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.receivers.clear();
    }
}

struct MemorySender {
    address: String,
    state: Arc<Mutex<MemoryState>>,
}

impl LinkSender for MemorySender {
    fn address(&self) -> &str {
        &self.address
    }

    fn send(&self, message: AmqpMessage) -> Result<DeliveryReceipt> {
        let mut state = self.state.lock();
        if state.closed || state.failing.contains(&self.address) {
            return Err(BrokerError::LinkClosed {
                address: self.address.clone(),
            });
        }
        state.sent.push((self.address.clone(), message));

        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Disposition::Accepted);
        Ok(DeliveryReceipt::new(self.address.clone(), rx))
    }
}

struct MemoryReceiver {
    address: String,
}

impl LinkReceiver for MemoryReceiver {
    fn address(&self) -> &str {
        &self.address
    }
}
