//! Error types for the broker.
//!
//! Steady-state routing never surfaces these to the event loop's caller; they
//! are logged where they happen. Startup and bridge requests return them.

/// Result type alias for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Opening a link or the connection failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// A send was attempted on a link the peer has detached.
    #[error("link {address} is closed")]
    LinkClosed { address: String },

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    /// Unsubscribe named topics the client was never subscribed to.
    #[error("client {client_id} is not subscribed to {topics:?}")]
    NotSubscribed {
        client_id: String,
        topics: Vec<String>,
    },

    /// An inbound message could not be decoded into the expected MQTT view.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A bus request referenced a correlation key with no stored payload.
    #[error("unknown correlation key: {0}")]
    UnknownCorrelationKey(String),

    /// The engine dropped the responder without replying.
    #[error("{0} request was not answered")]
    Unanswered(&'static str),

    #[error("engine stopped")]
    EngineStopped,
}
