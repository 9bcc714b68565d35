use super::error::BrokerError;
use super::logging;

#[test]
fn logging_init_accepts_levels() {
    // Should not panic
    logging::init("info");
    logging::init("debug");
    logging::init("warning");
    logging::init("bogus");
}

#[test]
fn not_subscribed_error_names_client_and_topics() {
    let err = BrokerError::NotSubscribed {
        client_id: "c1".to_string(),
        topics: vec!["a".to_string()],
    };
    assert_eq!(err.to_string(), "client c1 is not subscribed to [\"a\"]");
}

#[test]
fn unanswered_error_names_request_kind() {
    assert_eq!(
        BrokerError::Unanswered("will-clear").to_string(),
        "will-clear request was not answered"
    );
}
