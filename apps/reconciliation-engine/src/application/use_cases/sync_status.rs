//! Status Sync Use Case
//!
//! Fetches the authoritative gateway status for one order code and
//! reconciles it into the local payment record with compare-and-swap
//! semantics. Safe to call concurrently with the webhook handler: exactly
//! one writer wins the conditional update, the other observes a no-op.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::application::ports::{
    EventPublisherPort, GatewayError, GatewayPort, PaymentStorePort, TerminalUpdate,
};
use crate::domain::payment::{PaymentEvent, PaymentStatus, PaymentUpdated};
use crate::domain::shared::OrderCode;

/// Sync failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SyncError {
    /// Gateway-reported business error (unknown order). Not retryable and
    /// not counted toward the sweep circuit breaker.
    #[error("gateway error for {order_code}: {message}")]
    Gateway {
        /// Order code being synced.
        order_code: OrderCode,
        /// Error details.
        message: String,
    },

    /// Transport-level failure (timeout, connection, store unavailable).
    /// Retryable; counts toward the sweep circuit breaker.
    #[error("network error syncing {order_code}: {message}")]
    Network {
        /// Order code being synced.
        order_code: OrderCode,
        /// Error details.
        message: String,
    },
}

impl SyncError {
    /// Whether retrying the same sync later can succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Order code the failed sync was for.
    #[must_use]
    pub const fn order_code(&self) -> &OrderCode {
        match self {
            Self::Gateway { order_code, .. } | Self::Network { order_code, .. } => order_code,
        }
    }
}

/// Outcome of one sync call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Authoritative status after the sync.
    pub status: PaymentStatus,
    /// Whether this call changed the stored record. `false` is the expected
    /// idempotent outcome for already-terminal records and lost races.
    pub changed: bool,
}

/// Use case for syncing one payment's status from the gateway.
pub struct SyncStatusUseCase<G, S, E>
where
    G: GatewayPort,
    S: PaymentStorePort,
    E: EventPublisherPort,
{
    gateway: Arc<G>,
    store: Arc<S>,
    publisher: Arc<E>,
}

impl<G, S, E> SyncStatusUseCase<G, S, E>
where
    G: GatewayPort,
    S: PaymentStorePort,
    E: EventPublisherPort,
{
    /// Create a new SyncStatusUseCase.
    pub fn new(gateway: Arc<G>, store: Arc<S>, publisher: Arc<E>) -> Self {
        Self {
            gateway,
            store,
            publisher,
        }
    }

    /// Sync `order_code` against the gateway.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Gateway`] when the gateway rejects the order
    /// code, or [`SyncError::Network`] on transport/store failures.
    pub async fn execute(&self, order_code: &OrderCode) -> Result<SyncOutcome, SyncError> {
        let report = self
            .gateway
            .get_status(order_code)
            .await
            .map_err(|e| Self::map_gateway_error(order_code, &e))?;

        if !report.status.is_terminal() {
            // Gateway has not settled the transaction yet; nothing to write.
            return Ok(SyncOutcome {
                status: report.status,
                changed: false,
            });
        }

        let update = TerminalUpdate {
            new_status: report.status,
            transaction_id: report.transaction_id,
            paid_at: if report.status == PaymentStatus::Completed {
                Some(report.paid_at.unwrap_or_else(Utc::now))
            } else {
                None
            },
        };

        let rows = self
            .store
            .complete_if_pending(order_code, &update)
            .await
            .map_err(|e| SyncError::Network {
                order_code: order_code.clone(),
                message: e.to_string(),
            })?;

        if rows == 0 {
            // Expected when the record was already terminal or a concurrent
            // writer (webhook handler) won the conditional update.
            debug!(
                order_code = %order_code,
                status = %report.status,
                "Conditional update affected no rows"
            );
            return Ok(SyncOutcome {
                status: report.status,
                changed: false,
            });
        }

        let event = PaymentEvent::Updated(PaymentUpdated {
            order_code: order_code.clone(),
            old_status: PaymentStatus::Pending,
            new_status: report.status,
            occurred_at: Utc::now(),
        });
        if let Err(e) = self.publisher.publish_event(event).await {
            // Best-effort delivery; the stored state is already correct.
            warn!(order_code = %order_code, error = %e, "Failed to publish payment update");
        }

        Ok(SyncOutcome {
            status: report.status,
            changed: true,
        })
    }

    fn map_gateway_error(order_code: &OrderCode, error: &GatewayError) -> SyncError {
        if error.is_retryable() {
            SyncError::Network {
                order_code: order_code.clone(),
                message: error.to_string(),
            }
        } else {
            SyncError::Gateway {
                order_code: order_code.clone(),
                message: error.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{EventPublishError, GatewayStatusReport, NoOpEventPublisher};
    use crate::domain::payment::{CreatePaymentCommand, PaymentRecord};
    use crate::domain::shared::TransactionId;
    use crate::infrastructure::gateway::MockGateway;
    use crate::infrastructure::persistence::InMemoryPaymentStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;

    struct CapturePublisher {
        events: Mutex<Vec<PaymentEvent>>,
    }

    impl CapturePublisher {
        fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
            }
        }

        fn events(&self) -> Vec<PaymentEvent> {
            self.events.lock().clone()
        }
    }

    #[async_trait]
    impl EventPublisherPort for CapturePublisher {
        async fn publish_events(
            &self,
            events: Vec<PaymentEvent>,
        ) -> Result<(), EventPublishError> {
            self.events.lock().extend(events);
            Ok(())
        }
    }

    fn pending_record(code: &str) -> PaymentRecord {
        PaymentRecord::new(
            CreatePaymentCommand {
                order_code: OrderCode::new(code),
                amount: dec!(150.00),
                payment_method: "card".to_string(),
                description: "Consultation fee".to_string(),
                patient_id: None,
                doctor_id: None,
                record_id: None,
            },
            Utc::now(),
        )
    }

    fn completed_report(txn: &str) -> GatewayStatusReport {
        GatewayStatusReport {
            status: PaymentStatus::Completed,
            transaction_id: Some(TransactionId::new(txn)),
            paid_at: Some(Utc::now()),
        }
    }

    async fn store_with(code: &str) -> Arc<InMemoryPaymentStore> {
        let store = Arc::new(InMemoryPaymentStore::new());
        store.insert(&pending_record(code)).await.unwrap();
        store
    }

    #[tokio::test]
    async fn sync_applies_terminal_status_once() {
        let code = OrderCode::new("ORD-1001");
        let store = store_with("ORD-1001").await;
        let gateway = Arc::new(MockGateway::new());
        gateway.set_status(&code, completed_report("TXN-77"));
        let publisher = Arc::new(CapturePublisher::new());

        let use_case = SyncStatusUseCase::new(gateway, store.clone(), publisher.clone());

        let first = use_case.execute(&code).await.unwrap();
        assert_eq!(first.status, PaymentStatus::Completed);
        assert!(first.changed);

        // Immediate second call with the same gateway answer is a no-op.
        let second = use_case.execute(&code).await.unwrap();
        assert_eq!(second.status, PaymentStatus::Completed);
        assert!(!second.changed);

        let stored = store.find_by_code(&code).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Completed);
        assert!(stored.paid_at.is_some());
        assert_eq!(stored.transaction_id, Some(TransactionId::new("TXN-77")));

        // Exactly one update event for the single effective transition.
        let events = publisher.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], PaymentEvent::Updated(e) if e.new_status == PaymentStatus::Completed));
    }

    #[tokio::test]
    async fn sync_is_noop_while_gateway_reports_pending() {
        let code = OrderCode::new("ORD-1001");
        let store = store_with("ORD-1001").await;
        let gateway = Arc::new(MockGateway::new());
        // MockGateway defaults to pending for known codes.
        gateway.set_status(
            &code,
            GatewayStatusReport {
                status: PaymentStatus::Pending,
                transaction_id: None,
                paid_at: None,
            },
        );

        let use_case = SyncStatusUseCase::new(gateway, store.clone(), Arc::new(NoOpEventPublisher));
        let outcome = use_case.execute(&code).await.unwrap();

        assert_eq!(outcome.status, PaymentStatus::Pending);
        assert!(!outcome.changed);
        let stored = store.find_by_code(&code).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn failed_status_does_not_stamp_paid_at() {
        let code = OrderCode::new("ORD-1001");
        let store = store_with("ORD-1001").await;
        let gateway = Arc::new(MockGateway::new());
        gateway.set_status(
            &code,
            GatewayStatusReport {
                status: PaymentStatus::Failed,
                transaction_id: None,
                paid_at: None,
            },
        );

        let use_case = SyncStatusUseCase::new(gateway, store.clone(), Arc::new(NoOpEventPublisher));
        let outcome = use_case.execute(&code).await.unwrap();

        assert!(outcome.changed);
        let stored = store.find_by_code(&code).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Failed);
        assert!(stored.paid_at.is_none());
    }

    #[tokio::test]
    async fn concurrent_syncs_converge_with_one_winner() {
        let code = OrderCode::new("ORD-1001");
        let store = store_with("ORD-1001").await;
        let gateway = Arc::new(MockGateway::new());
        gateway.set_status(&code, completed_report("TXN-77"));

        let use_case = Arc::new(SyncStatusUseCase::new(
            gateway,
            store.clone(),
            Arc::new(NoOpEventPublisher),
        ));

        let a = {
            let use_case = Arc::clone(&use_case);
            let code = code.clone();
            tokio::spawn(async move { use_case.execute(&code).await })
        };
        let b = {
            let use_case = Arc::clone(&use_case);
            let code = code.clone();
            tokio::spawn(async move { use_case.execute(&code).await })
        };

        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();

        // Exactly one call wins the conditional update.
        assert_eq!(u8::from(a.changed) + u8::from(b.changed), 1);
        let stored = store.find_by_code(&code).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Completed);
    }

    #[tokio::test]
    async fn unknown_order_maps_to_gateway_error() {
        let code = OrderCode::new("ORD-MISSING");
        let store = Arc::new(InMemoryPaymentStore::new());
        let gateway = Arc::new(MockGateway::new());
        gateway.set_error(
            &code,
            GatewayError::NotFound {
                order_code: code.clone(),
            },
        );

        let use_case = SyncStatusUseCase::new(gateway, store, Arc::new(NoOpEventPublisher));
        let err = use_case.execute(&code).await.unwrap_err();

        assert!(matches!(err, SyncError::Gateway { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn timeout_maps_to_retryable_network_error() {
        let code = OrderCode::new("ORD-1001");
        let store = store_with("ORD-1001").await;
        let gateway = Arc::new(MockGateway::new());
        gateway.set_error(&code, GatewayError::Timeout { timeout_secs: 10 });

        let use_case = SyncStatusUseCase::new(gateway, store, Arc::new(NoOpEventPublisher));
        let err = use_case.execute(&code).await.unwrap_err();

        assert!(matches!(err, SyncError::Network { .. }));
        assert!(err.is_retryable());
        assert_eq!(err.order_code(), &code);
    }
}
