//! Broadcast-channel event bus.
//!
//! In-process publish/subscribe for payment events. Delivery is
//! best-effort: publishing with no subscribers is fine, and a lagging
//! subscriber loses the oldest events rather than blocking the publisher.
//! Subscribers must be idempotent.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use crate::application::ports::{EventPublishError, EventPublisherPort};
use crate::domain::payment::PaymentEvent;

/// Default channel capacity.
const DEFAULT_CAPACITY: usize = 64;

/// Event bus backed by a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastEventBus {
    tx: broadcast::Sender<PaymentEvent>,
}

impl BroadcastEventBus {
    /// Create a bus with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a bus with a custom capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to events published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PaymentEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisherPort for BroadcastEventBus {
    async fn publish_events(&self, events: Vec<PaymentEvent>) -> Result<(), EventPublishError> {
        for event in events {
            // SendError only means there are currently no subscribers.
            if self.tx.send(event.clone()).is_err() {
                debug!(event_type = event.event_type(), "No subscribers for event");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::{PaymentStatus, PaymentUpdated};
    use crate::domain::shared::OrderCode;
    use chrono::Utc;

    fn updated_event(code: &str) -> PaymentEvent {
        PaymentEvent::Updated(PaymentUpdated {
            order_code: OrderCode::new(code),
            old_status: PaymentStatus::Pending,
            new_status: PaymentStatus::Completed,
            occurred_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = BroadcastEventBus::new();
        let mut rx = bus.subscribe();

        bus.publish_event(updated_event("ORD-1")).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.order_code(), Some(&OrderCode::new("ORD-1")));
    }

    #[tokio::test]
    async fn publishing_without_subscribers_succeeds() {
        let bus = BroadcastEventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus.publish_event(updated_event("ORD-1")).await.is_ok());
    }

    #[tokio::test]
    async fn each_subscriber_sees_every_event() {
        let bus = BroadcastEventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish_events(vec![updated_event("ORD-1"), updated_event("ORD-2")])
            .await
            .unwrap();

        for rx in [&mut a, &mut b] {
            let first = rx.recv().await.unwrap();
            let second = rx.recv().await.unwrap();
            assert_eq!(first.order_code(), Some(&OrderCode::new("ORD-1")));
            assert_eq!(second.order_code(), Some(&OrderCode::new("ORD-2")));
        }
    }
}
