//! broker
//!
//! The session, subscription and routing core. All state lives in one
//! [`Engine`] driven by a single task, so the registries are plain maps with
//! no locking.

pub mod engine;
pub mod links;
pub mod retained;
pub mod router;
pub mod subscriptions;
pub mod wills;

pub use engine::{Engine, EngineHandle};
pub use links::LinkRegistry;
pub use retained::RetainedStore;
pub use router::{RouteOutcome, RouteStats, Router};
pub use subscriptions::{SubscriberId, SubscriptionRegistry};
pub use wills::{DeliveryResult, WillDelivery, WillRegistry};
