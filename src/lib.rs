//! # amqp-mqtt-broker
//!
//! The routing and state core of an MQTT-over-AMQP gateway. Upstream
//! protocol-translation services turn MQTT packets into AMQP messages and
//! ask this engine to subscribe, unsubscribe and manage wills; the engine
//! tracks which clients listen on which topics, fans published messages out
//! to per-client links, keeps retained messages and publishes wills.
//!
//! ## Core Modules
//!
//! - `broker`: link, subscription, retained and will registries, the router
//!   and the single-task engine that owns them.
//! - `bridge`: the request/reply protocol external services use to instruct
//!   the engine, including the correlation-key event bus.
//! - `message`: decoded AMQP message model and its MQTT views.
//! - `transport`: the connection and link contracts the engine runs on, plus
//!   an in-memory implementation.
//! - `client`: per-client link state.
//! - `config`: layered settings.
//! - `utils`: error type and logging.

pub mod bridge;
pub mod broker;
pub mod client;
pub mod config;
pub mod message;
pub mod transport;
pub mod utils;

pub use bridge::BridgeClient;
pub use broker::{Engine, EngineHandle};
pub use utils::{BrokerError, Result};
