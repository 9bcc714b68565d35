use std::fmt;

use tokio::sync::{mpsc, oneshot};

use crate::message::{AmqpMessage, Disposition};
use crate::utils::{BrokerError, Result};

/// Where a receiver link pushes its deliveries. Every receiver the engine
/// opens shares the engine's sink, so all deliveries land on one loop.
pub type InboundSink = mpsc::UnboundedSender<InboundDelivery>;

/// Link-level delivery guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkQos {
    AtMostOnce,
    AtLeastOnce,
}

/// Settlement handle for one inbound delivery.
///
/// Dropping it without settling leaves the delivery unsettled at the peer.
pub struct Delivery {
    settle: Option<oneshot::Sender<Disposition>>,
}

impl Delivery {
    /// Create a delivery and the receiver the peer observes its settlement on.
    pub fn new() -> (Self, oneshot::Receiver<Disposition>) {
        let (tx, rx) = oneshot::channel();
        (Self { settle: Some(tx) }, rx)
    }

    pub fn settle(mut self, disposition: Disposition) {
        if let Some(tx) = self.settle.take() {
            // peer may have gone away; nothing to do about it here
            let _ = tx.send(disposition);
        }
    }

    pub fn accept(self) {
        self.settle(Disposition::Accepted);
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("settled", &self.settle.is_none())
            .finish()
    }
}

/// A message received on one of the engine's receiver links.
#[derive(Debug)]
pub struct InboundDelivery {
    /// Source address of the receiver link the message arrived on.
    pub link_address: String,
    pub message: AmqpMessage,
    pub delivery: Delivery,
}

/// Completion of an outbound send, resolved when the peer settles it.
#[derive(Debug)]
pub struct DeliveryReceipt {
    address: String,
    rx: oneshot::Receiver<Disposition>,
}

impl DeliveryReceipt {
    pub fn new(address: impl Into<String>, rx: oneshot::Receiver<Disposition>) -> Self {
        Self {
            address: address.into(),
            rx,
        }
    }

    /// Wait for the peer's disposition. Fails if the link went away first.
    pub async fn settled(self) -> Result<Disposition> {
        self.rx.await.map_err(|_| BrokerError::LinkClosed {
            address: self.address,
        })
    }
}

/// Outbound link.
pub trait LinkSender: Send {
    fn address(&self) -> &str;

    /// Hand `message` to the transport. An `Err` means it was not sent at all.
    fn send(&self, message: AmqpMessage) -> Result<DeliveryReceipt>;
}

/// Inbound link. Deliveries flow to the sink given at open time.
pub trait LinkReceiver: Send {
    fn address(&self) -> &str;
}

/// An open AMQP connection with an open session.
pub trait Connection: Send + Sync {
    fn open_sender(&self, address: &str, qos: LinkQos) -> Result<Box<dyn LinkSender>>;

    fn open_receiver(
        &self,
        address: &str,
        qos: LinkQos,
        sink: InboundSink,
    ) -> Result<Box<dyn LinkReceiver>>;

    fn close(&self);
}
