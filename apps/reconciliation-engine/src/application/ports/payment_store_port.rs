//! Payment Store Port (Driven Port)
//!
//! Read/write contract against the payment store shared with the webhook
//! handler running in a separate process. Every mutation of `status` or of
//! the linkage columns is a conditional (compare-and-swap) update keyed on
//! the value being overwritten; zero rows affected is the expected
//! idempotent outcome when a concurrent writer got there first, never an
//! error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::payment::{PaymentRecord, PaymentStatus};
use crate::domain::recovery::{BookingCandidate, LinkageResolution};
use crate::domain::shared::{OrderCode, TransactionId};

/// Store access error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Connection-level failure.
    #[error("store connection error: {message}")]
    Connection {
        /// Error details.
        message: String,
    },

    /// Query execution failure.
    #[error("store query error: {message}")]
    Query {
        /// Error details.
        message: String,
    },

    /// A stored row could not be decoded.
    #[error("corrupt store row for {context}: {message}")]
    Corrupt {
        /// What was being decoded.
        context: String,
        /// Error details.
        message: String,
    },
}

/// Fields written alongside a terminal status transition.
#[derive(Debug, Clone)]
pub struct TerminalUpdate {
    /// The terminal status to apply.
    pub new_status: PaymentStatus,
    /// Gateway transaction identifier, when the gateway reported one.
    pub transaction_id: Option<TransactionId>,
    /// Payment time; persisted only for `Completed`.
    pub paid_at: Option<DateTime<Utc>>,
}

/// Port for the payment store.
#[async_trait]
pub trait PaymentStorePort: Send + Sync {
    /// Insert a new payment record (used by booking flows and tests).
    async fn insert(&self, record: &PaymentRecord) -> Result<(), StoreError>;

    /// Fetch one record by order code.
    async fn find_by_code(
        &self,
        order_code: &OrderCode,
    ) -> Result<Option<PaymentRecord>, StoreError>;

    /// Fetch a bounded page of `Pending` records, oldest first.
    async fn find_pending_page(&self, limit: usize) -> Result<Vec<PaymentRecord>, StoreError>;

    /// Conditionally apply a terminal status.
    ///
    /// Equivalent to
    /// `UPDATE payments SET ... WHERE order_code = ? AND status = 'PENDING'`;
    /// returns the number of rows affected (0 when a concurrent writer
    /// already moved the record out of `Pending`, 1 when this call won).
    async fn complete_if_pending(
        &self,
        order_code: &OrderCode,
        update: &TerminalUpdate,
    ) -> Result<u64, StoreError>;

    /// Count completed payments missing patient or record linkage.
    async fn count_orphans(&self) -> Result<u64, StoreError>;

    /// Fetch a bounded page of orphan payments, oldest first.
    async fn find_orphans(&self, limit: usize) -> Result<Vec<PaymentRecord>, StoreError>;

    /// Fetch booking candidates whose creation time falls inside the window.
    async fn find_booking_candidates(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BookingCandidate>, StoreError>;

    /// Fetch the booking candidate holding `transaction_id`, if any.
    async fn find_booking_by_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<BookingCandidate>, StoreError>;

    /// Conditionally write linkage onto an orphan payment.
    ///
    /// Keyed on `record_id IS NULL`; returns rows affected (0 when another
    /// trigger already linked the record).
    async fn link_if_unlinked(
        &self,
        order_code: &OrderCode,
        resolution: &LinkageResolution,
    ) -> Result<u64, StoreError>;
}
