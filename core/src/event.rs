//! Domain events emitted alongside ledger commits.
//!
//! Every business operation attaches a notification to its transaction, for
//! example:
//!
//! ```json
//! { "message": "Show booked successfully", "code": 200, "reservationId": "alice_7f3a" }
//! ```
//!
//! Events are a best-effort side channel. They are published only after the
//! transaction commits, and a failed publish never fails the operation that
//! produced the event.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Status code carried by successful business notifications.
pub const CODE_OK: u16 = 200;

/// Structured notification: `{message, code, ...context}`.
///
/// Context fields are flattened into the top-level JSON object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Human-readable summary.
    pub message: String,
    /// Status code (200 for every business outcome).
    pub code: u16,
    /// Additional fields describing the outcome.
    #[serde(flatten)]
    pub context: Map<String, Value>,
}

impl DomainEvent {
    /// Create an event with an explicit status code.
    #[must_use]
    pub fn new(message: impl Into<String>, code: u16) -> Self {
        Self {
            message: message.into(),
            code,
            context: Map::new(),
        }
    }

    /// Create a `200` event.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(message, CODE_OK)
    }

    /// Attach a context field.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Look up a context field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }
}

/// Errors that can occur while delivering an event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventPublishError {
    /// The sink refused the event.
    #[error("Event rejected: {0}")]
    Rejected(String),

    /// The sink could not be reached.
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Delivery channel for committed domain events.
pub trait EventPublisher: Send + Sync {
    /// Deliver one event.
    ///
    /// # Errors
    ///
    /// Returns [`EventPublishError`] if delivery fails. Callers log and drop it.
    fn publish(
        &self,
        event: DomainEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventPublishError>> + Send + '_>>;
}
