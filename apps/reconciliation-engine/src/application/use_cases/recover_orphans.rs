//! Orphan Recovery Use Case
//!
//! Finds completed payments missing patient/record linkage and repairs
//! them from correlating evidence. Linking is a conditional update keyed
//! on the missing linkage, so re-running recovery (or racing a concurrent
//! trigger) never double-links a record.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use crate::application::ports::{EventPublisherPort, PaymentStorePort, StoreError};
use crate::domain::payment::{PaymentEvent, PaymentRecord, RecoveryCompleted};
use crate::domain::recovery::{BookingCandidate, LinkageMatcher, resolve_linkage};

/// Result of one recovery run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Orphans examined.
    pub total: usize,
    /// Orphans whose linkage was restored.
    pub recovered: usize,
}

impl RecoveryReport {
    /// Orphans left unresolved (reported in aggregate, never raised).
    #[must_use]
    pub const fn unresolved(&self) -> usize {
        self.total - self.recovered
    }
}

/// Configuration for orphan recovery.
#[derive(Debug, Clone)]
pub struct RecoveryOptions {
    /// Maximum orphans examined per run.
    pub batch_size: usize,
    /// Window around the payment's creation time for the amount heuristic
    /// and for candidate fetching.
    pub match_window: Duration,
}

impl Default for RecoveryOptions {
    fn default() -> Self {
        Self {
            batch_size: 50,
            match_window: Duration::minutes(15),
        }
    }
}

/// Use case for recovering orphan payments.
pub struct RecoverOrphansUseCase<S, E>
where
    S: PaymentStorePort,
    E: EventPublisherPort,
{
    store: Arc<S>,
    publisher: Arc<E>,
    matchers: Vec<Box<dyn LinkageMatcher>>,
    options: RecoveryOptions,
}

impl<S, E> RecoverOrphansUseCase<S, E>
where
    S: PaymentStorePort,
    E: EventPublisherPort,
{
    /// Create a new RecoverOrphansUseCase with the given matcher chain.
    ///
    /// Matchers are tried in order; put the strongest evidence first.
    pub fn new(
        store: Arc<S>,
        publisher: Arc<E>,
        matchers: Vec<Box<dyn LinkageMatcher>>,
        options: RecoveryOptions,
    ) -> Self {
        Self {
            store,
            publisher,
            matchers,
            options,
        }
    }

    /// Count orphan payments currently in the store.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the store is unreachable.
    pub async fn count_orphans(&self) -> Result<u64, StoreError> {
        self.store.count_orphans().await
    }

    /// Run one recovery pass.
    ///
    /// Idempotent: an immediately repeated run finds zero newly-recoverable
    /// records, because linked payments no longer match the orphan query
    /// and the conditional link update refuses already-linked rows.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] only when the orphan page itself cannot be
    /// fetched; per-orphan failures are logged and counted as unresolved.
    pub async fn execute(&self) -> Result<RecoveryReport, StoreError> {
        let orphans = self.store.find_orphans(self.options.batch_size).await?;
        let total = orphans.len();
        let mut recovered = 0;

        for orphan in &orphans {
            match self.recover_one(orphan).await {
                Ok(true) => recovered += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        order_code = %orphan.order_code,
                        error = %e,
                        "Orphan recovery step failed"
                    );
                }
            }
        }

        let report = RecoveryReport { total, recovered };
        info!(
            total = report.total,
            recovered = report.recovered,
            unresolved = report.unresolved(),
            "Orphan recovery completed"
        );

        let event = PaymentEvent::RecoveryCompleted(RecoveryCompleted {
            total: report.total,
            recovered: report.recovered,
            occurred_at: Utc::now(),
        });
        if let Err(e) = self.publisher.publish_event(event).await {
            warn!(error = %e, "Failed to publish recovery completion");
        }

        Ok(report)
    }

    /// Attempt to resolve and link one orphan. Returns whether this call
    /// performed the link.
    async fn recover_one(&self, orphan: &PaymentRecord) -> Result<bool, StoreError> {
        let candidates = self.gather_candidates(orphan).await?;

        let Some(resolution) = resolve_linkage(&self.matchers, orphan, &candidates) else {
            debug!(
                order_code = %orphan.order_code,
                candidates = candidates.len(),
                "No correlating evidence for orphan"
            );
            return Ok(false);
        };

        let rows = self
            .store
            .link_if_unlinked(&orphan.order_code, &resolution)
            .await?;

        if rows == 0 {
            // A concurrent trigger linked this record first.
            debug!(
                order_code = %orphan.order_code,
                "Orphan already linked by a concurrent writer"
            );
            return Ok(false);
        }

        info!(
            order_code = %orphan.order_code,
            record_id = %resolution.record_id,
            evidence = %resolution.evidence,
            "Orphan payment linkage restored"
        );
        Ok(true)
    }

    /// Fetch candidates for one orphan: the transaction-matched booking
    /// (when the payment carries a transaction ID) plus every booking in
    /// the creation-time window.
    async fn gather_candidates(
        &self,
        orphan: &PaymentRecord,
    ) -> Result<Vec<BookingCandidate>, StoreError> {
        let mut candidates = Vec::new();

        if let Some(txn) = &orphan.transaction_id
            && let Some(candidate) = self.store.find_booking_by_transaction(txn).await?
        {
            candidates.push(candidate);
        }

        let from = orphan.created_at - self.options.match_window;
        let to = orphan.created_at + self.options.match_window;
        for candidate in self.store.find_booking_candidates(from, to).await? {
            if !candidates
                .iter()
                .any(|c| c.booking_id == candidate.booking_id)
            {
                candidates.push(candidate);
            }
        }

        Ok(candidates)
    }
}
