//! Event Publisher Port (Driven Port)
//!
//! Interface for publishing reconciliation events to interested observers
//! (UI, other subsystems). Delivery is best-effort; subscribers must be
//! idempotent.

use async_trait::async_trait;

use crate::domain::payment::PaymentEvent;

/// Event publishing error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EventPublishError {
    /// Publishing failed.
    #[error("event publish failed: {message}")]
    PublishFailed {
        /// Error details.
        message: String,
    },
}

/// Port for publishing payment events.
#[async_trait]
pub trait EventPublisherPort: Send + Sync {
    /// Publish payment events.
    async fn publish_events(&self, events: Vec<PaymentEvent>) -> Result<(), EventPublishError>;

    /// Publish a single payment event.
    async fn publish_event(&self, event: PaymentEvent) -> Result<(), EventPublishError> {
        self.publish_events(vec![event]).await
    }
}

/// No-op event publisher for testing.
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisherPort for NoOpEventPublisher {
    async fn publish_events(&self, _events: Vec<PaymentEvent>) -> Result<(), EventPublishError> {
        Ok(())
    }
}
