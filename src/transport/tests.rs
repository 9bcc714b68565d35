use super::*;
use crate::message::{AmqpMessage, Disposition};
use tokio::sync::mpsc;

#[tokio::test]
async fn test_deliver_reaches_receiver_sink_and_reports_settlement() {
    let conn = MemoryConnection::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let receiver = conn.open_receiver("t", LinkQos::AtLeastOnce, tx).unwrap();
    assert_eq!(receiver.address(), "t");
    assert_eq!(conn.receiver_qos("t"), Some(LinkQos::AtLeastOnce));

    let settled = conn.deliver("t", AmqpMessage::new("hi")).unwrap();
    let inbound = rx.recv().await.unwrap();
    assert_eq!(inbound.link_address, "t");
    assert_eq!(&inbound.message.body[..], b"hi");

    inbound.delivery.accept();
    assert_eq!(settled.await.unwrap(), Disposition::Accepted);
}

#[tokio::test]
async fn test_deliver_without_receiver_fails() {
    let conn = MemoryConnection::new();
    assert!(conn.deliver("nowhere", AmqpMessage::default()).is_err());
}

#[tokio::test]
async fn test_unsettled_delivery_reports_nothing() {
    let conn = MemoryConnection::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _receiver = conn.open_receiver("t", LinkQos::AtLeastOnce, tx).unwrap();

    let settled = conn.deliver("t", AmqpMessage::default()).unwrap();
    drop(rx.recv().await.unwrap());
    assert!(settled.await.is_err());
}

#[tokio::test]
async fn test_sender_records_and_settles() {
    let conn = MemoryConnection::new();
    let sender = conn.open_sender("out", LinkQos::AtLeastOnce).unwrap();
    let receipt = sender.send(AmqpMessage::new("m")).unwrap();

    assert_eq!(receipt.settled().await.unwrap(), Disposition::Accepted);
    assert_eq!(conn.sent_to("out").len(), 1);
    assert_eq!(conn.senders_attached("out"), 1);
    assert_eq!(conn.sender_qos("out"), Some(LinkQos::AtLeastOnce));
}

#[test]
fn test_failing_address_rejects_sends() {
    let conn = MemoryConnection::new();
    let sender = conn.open_sender("out", LinkQos::AtLeastOnce).unwrap();
    conn.fail_sends_to("out");
    assert!(sender.send(AmqpMessage::default()).is_err());
    assert_eq!(conn.sent_count(), 0);
}

#[test]
fn test_refused_and_closed_connections_reject_attach() {
    let conn = MemoryConnection::new();
    conn.refuse_links_to("bad");
    assert!(conn.open_sender("bad", LinkQos::AtLeastOnce).is_err());

    conn.close();
    assert!(conn.is_closed());
    let (tx, _rx) = mpsc::unbounded_channel();
    assert!(conn.open_receiver("ok", LinkQos::AtLeastOnce, tx).is_err());
}
