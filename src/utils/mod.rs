//! The `utils` module provides the shared error type and logging bootstrap
//! used across the broker.

pub mod error;
pub mod logging;

pub use error::{BrokerError, Result};

#[cfg(test)]
mod tests;
