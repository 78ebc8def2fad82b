//! Domain events for payment reconciliation.
//!
//! Delivery over the event bus is best-effort and at-least-once;
//! subscribers must be idempotent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::payment::status::PaymentStatus;
use crate::domain::shared::OrderCode;

/// All events published by the reconciliation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentEvent {
    /// A payment's stored status changed.
    Updated(PaymentUpdated),
    /// A one-off priority check failed; the watching client should be told
    /// the status is unknown and that checking continues.
    SyncFailed(SyncFailed),
    /// An orphan recovery run completed.
    RecoveryCompleted(RecoveryCompleted),
}

impl PaymentEvent {
    /// Get the event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Updated(_) => "PAYMENT_UPDATED",
            Self::SyncFailed(_) => "PAYMENT_SYNC_FAILED",
            Self::RecoveryCompleted(_) => "RECOVERY_COMPLETED",
        }
    }

    /// Get the order code for this event, if it concerns a single payment.
    #[must_use]
    pub const fn order_code(&self) -> Option<&OrderCode> {
        match self {
            Self::Updated(e) => Some(&e.order_code),
            Self::SyncFailed(e) => Some(&e.order_code),
            Self::RecoveryCompleted(_) => None,
        }
    }
}

/// Event: a payment's stored status changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentUpdated {
    /// Order code of the payment.
    pub order_code: OrderCode,
    /// Status before the update.
    pub old_status: PaymentStatus,
    /// Status after the update.
    pub new_status: PaymentStatus,
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
}

/// Event: a one-off priority check failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailed {
    /// Order code of the payment.
    pub order_code: OrderCode,
    /// Whether the failure is retryable (network) or gateway-reported.
    pub retryable: bool,
    /// Failure description.
    pub message: String,
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
}

/// Event: an orphan recovery run completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryCompleted {
    /// Orphans examined in this run.
    pub total: usize,
    /// Orphans whose linkage was restored.
    pub recovered: usize,
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
}
