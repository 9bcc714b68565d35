use std::sync::Arc;

use super::bus::{
    SUBSCRIBE_ADDRESS, UNSUBSCRIBE_ADDRESS, WILL_ACTION_ADD, WILL_ACTION_CLEAR,
    WILL_ACTION_DELIVERY,
};
use super::*;
use crate::broker::{Engine, EngineHandle};
use crate::config::BrokerSettings;
use crate::message::address::client_address;
use crate::message::{PublishMessage, Qos, TopicSubscription, WillMessage};
use crate::transport::MemoryConnection;
use crate::utils::BrokerError;
use serde_json::json;

fn start(conn: &MemoryConnection) -> (EngineHandle, EventBus) {
    let handle = Engine::start(Arc::new(conn.clone()), BrokerSettings::default()).unwrap();
    let bus = EventBus::new(handle.client(), CorrelationStore::new());
    (handle, bus)
}

#[test]
fn test_correlation_store_is_single_consumption() {
    let store = CorrelationStore::new();
    let key = CorrelationStore::new_key();
    let payload = Deferred::Will(WillMessage::new("lwt", "bye", Qos::AtMostOnce));

    assert!(store.put(key.clone(), payload.clone()));
    assert!(!store.put(key.clone(), payload.clone()));
    assert_eq!(store.len(), 1);

    assert_eq!(store.take(&key), Some(payload));
    assert_eq!(store.take(&key), None);
    assert!(store.is_empty());
}

#[test]
fn test_new_keys_are_distinct() {
    assert_ne!(CorrelationStore::new_key(), CorrelationStore::new_key());
}

#[tokio::test]
async fn test_bus_subscribe_replies_granted_qos_as_json() {
    let conn = MemoryConnection::new();
    let (_handle, bus) = start(&conn);

    let key = CorrelationStore::new_key();
    bus.store().put(
        key.clone(),
        Deferred::Subscribe(SubscribeRequest {
            client_id: "c1".to_string(),
            subscriptions: vec![
                TopicSubscription::new("a", Qos::AtLeastOnce),
                TopicSubscription::new("b", Qos::ExactlyOnce),
            ],
        }),
    );

    let reply = bus
        .dispatch(BusMessage::new(SUBSCRIBE_ADDRESS, key.clone()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply.body(), json!([1, 2]));
    assert!(bus.store().is_empty());

    let BusReply::Granted(grant) = reply else {
        panic!("expected a subscribe grant");
    };
    assert_eq!(grant.acknowledge().await.unwrap(), 0);

    // key already consumed
    let err = bus
        .dispatch(BusMessage::new(SUBSCRIBE_ADDRESS, key))
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::UnknownCorrelationKey(_)));
}

#[tokio::test]
async fn test_bus_unsubscribe_replies_empty() {
    let conn = MemoryConnection::new();
    let (handle, bus) = start(&conn);
    let client = handle.client();

    let grant = client
        .subscribe("c1", vec![TopicSubscription::new("a", Qos::AtMostOnce)])
        .await
        .unwrap();
    grant.acknowledge().await.unwrap();

    bus.store().put(
        "unsub-1",
        Deferred::Unsubscribe(UnsubscribeRequest {
            client_id: "c1".to_string(),
            topics: vec!["a".to_string()],
        }),
    );
    let reply = bus
        .dispatch(BusMessage::new(UNSUBSCRIBE_ADDRESS, "unsub-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply.body(), serde_json::Value::Null);
    assert!(client.snapshot().await.unwrap().subscriptions.is_empty());
}

#[tokio::test]
async fn test_bus_rejects_payload_of_wrong_kind() {
    let conn = MemoryConnection::new();
    let (_handle, bus) = start(&conn);

    bus.store().put(
        "k",
        Deferred::Will(WillMessage::new("lwt", "bye", Qos::AtMostOnce)),
    );
    let err = bus
        .dispatch(BusMessage::new(SUBSCRIBE_ADDRESS, "k"))
        .await
        .unwrap_err();
    assert!(matches!(err, BrokerError::InvalidMessage(_)));
    assert!(bus.store().is_empty());
}

#[tokio::test]
async fn test_bus_will_lifecycle() {
    let conn = MemoryConnection::new();
    let (_handle, bus) = start(&conn);

    bus.store().put(
        "link-7",
        Deferred::Will(WillMessage::new("lwt", "bye", Qos::AtLeastOnce)),
    );
    let added = bus
        .dispatch(BusMessage::will(WILL_ACTION_ADD, "link-7"))
        .await
        .unwrap();
    assert!(matches!(added, Some(BusReply::Empty)));

    let delivered = bus
        .dispatch(BusMessage::will(WILL_ACTION_DELIVERY, "link-7"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(delivered.body(), json!(true));
    assert_eq!(conn.sent_to("lwt").len(), 1);

    let cleared = bus
        .dispatch(BusMessage::will(WILL_ACTION_CLEAR, "link-7"))
        .await
        .unwrap();
    assert!(matches!(cleared, Some(BusReply::Empty)));

    // nothing left: clear goes unanswered, delivery reports false
    let cleared = bus
        .dispatch(BusMessage::will(WILL_ACTION_CLEAR, "link-7"))
        .await
        .unwrap();
    assert!(cleared.is_none());

    let delivered = bus
        .dispatch(BusMessage::will(WILL_ACTION_DELIVERY, "link-7"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(delivered.body(), json!(false));
}

#[tokio::test]
async fn test_bus_rejects_unknown_address_and_action() {
    let conn = MemoryConnection::new();
    let (_handle, bus) = start(&conn);

    assert!(bus.dispatch(BusMessage::new("connect", "x")).await.is_err());
    assert!(bus.dispatch(BusMessage::will("will-forget", "x")).await.is_err());
    assert!(bus.dispatch(BusMessage::new("will", "x")).await.is_err());
}

#[tokio::test]
async fn test_bridge_client_after_shutdown_reports_engine_stopped() {
    let conn = MemoryConnection::new();
    let (handle, _bus) = start(&conn);
    let client = handle.client();

    client.shutdown().await.unwrap();
    handle.join().await;

    assert!(conn.is_closed());
    let err = client.snapshot().await.unwrap_err();
    assert!(matches!(err, BrokerError::EngineStopped));
}

#[tokio::test]
async fn test_grant_replays_retained_to_subscriber() {
    let conn = MemoryConnection::new();
    let (handle, _bus) = start(&conn);
    let client = handle.client();

    // "my_topic" is attached at startup
    let retained = PublishMessage::new("my_topic", "state", Qos::AtLeastOnce).retained();
    conn.deliver("my_topic", retained.to_amqp())
        .unwrap()
        .await
        .unwrap();

    let grant = client
        .subscribe("c1", vec![TopicSubscription::new("my_topic", Qos::AtLeastOnce)])
        .await
        .unwrap();
    assert_eq!(grant.granted(), [Qos::AtLeastOnce]);
    assert!(conn.sent_to(&client_address("c1")).is_empty());

    assert_eq!(grant.acknowledge().await.unwrap(), 1);
    let sent = conn.sent_to(&client_address("c1"));
    assert_eq!(sent.len(), 1);
    assert_eq!(PublishMessage::from_amqp(&sent[0]).unwrap(), retained);
}
