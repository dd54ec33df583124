//! Event publishers shipped with the runtime.
//!
//! - [`TracingEventPublisher`]: writes every event to the log
//! - [`BroadcastEventPublisher`]: fans events out to in-process subscribers

use seatledger_core::event::{DomainEvent, EventPublishError, EventPublisher};
use std::future::Future;
use std::pin::Pin;
use tokio::sync::broadcast;

/// Logs each event at `info` as its JSON form.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventPublisher;

impl EventPublisher for TracingEventPublisher {
    fn publish(
        &self,
        event: DomainEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventPublishError>> + Send + '_>> {
        Box::pin(async move {
            let payload = serde_json::to_string(&event)
                .map_err(|e| EventPublishError::Rejected(e.to_string()))?;
            tracing::info!(code = event.code, event = %payload, "Domain event");
            Ok(())
        })
    }
}

/// Broadcasts events to every live subscriber.
///
/// Slow subscribers lose the oldest events once `capacity` is exceeded.
#[derive(Debug, Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<DomainEvent>,
}

impl BroadcastEventPublisher {
    /// Create a publisher buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl EventPublisher for BroadcastEventPublisher {
    fn publish(
        &self,
        event: DomainEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventPublishError>> + Send + '_>> {
        let result = self
            .sender
            .send(event)
            .map(|_| ())
            .map_err(|_| EventPublishError::Rejected("no active subscribers".to_string()));
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_subscribers() {
        let publisher = BroadcastEventPublisher::new(8);
        let mut receiver = publisher.subscribe();

        publisher
            .publish(DomainEvent::ok("record created").with("show", "Atlas"))
            .await
            .unwrap();

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.message, "record created");
        assert_eq!(event.get("show"), Some(&serde_json::json!("Atlas")));
    }

    #[tokio::test]
    async fn broadcast_without_subscribers_is_rejected() {
        let publisher = BroadcastEventPublisher::new(8);
        let result = publisher.publish(DomainEvent::ok("record created")).await;
        assert!(matches!(result, Err(EventPublishError::Rejected(_))));
    }

    #[tokio::test]
    async fn tracing_publisher_accepts_events() {
        let result = TracingEventPublisher
            .publish(DomainEvent::ok("Show booked successfully"))
            .await;
        assert!(result.is_ok());
    }
}
