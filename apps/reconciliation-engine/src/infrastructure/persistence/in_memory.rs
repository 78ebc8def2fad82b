//! In-memory payment store for testing and development.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::application::ports::{PaymentStorePort, StoreError, TerminalUpdate};
use crate::domain::payment::{PaymentRecord, PaymentStatus};
use crate::domain::recovery::{BookingCandidate, LinkageResolution};
use crate::domain::shared::{OrderCode, TransactionId};

/// In-memory implementation of [`PaymentStorePort`].
///
/// Suitable for testing and development. Conditional updates run under the
/// write lock, so the compare-and-swap semantics match the SQL store.
#[derive(Debug, Default)]
pub struct InMemoryPaymentStore {
    payments: RwLock<HashMap<String, PaymentRecord>>,
    bookings: RwLock<Vec<BookingCandidate>>,
}

impl InMemoryPaymentStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of payment records held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payments.read().len()
    }

    /// Whether the store holds no payments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payments.read().is_empty()
    }

    /// Add a booking candidate (test setup).
    pub fn insert_booking(&self, candidate: BookingCandidate) {
        self.bookings.write().push(candidate);
    }
}

#[async_trait]
impl PaymentStorePort for InMemoryPaymentStore {
    async fn insert(&self, record: &PaymentRecord) -> Result<(), StoreError> {
        self.payments
            .write()
            .insert(record.order_code.as_str().to_string(), record.clone());
        Ok(())
    }

    async fn find_by_code(
        &self,
        order_code: &OrderCode,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        Ok(self.payments.read().get(order_code.as_str()).cloned())
    }

    async fn find_pending_page(&self, limit: usize) -> Result<Vec<PaymentRecord>, StoreError> {
        let payments = self.payments.read();
        let mut pending: Vec<PaymentRecord> = payments
            .values()
            .filter(|r| r.status == PaymentStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|r| r.created_at);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn complete_if_pending(
        &self,
        order_code: &OrderCode,
        update: &TerminalUpdate,
    ) -> Result<u64, StoreError> {
        let mut payments = self.payments.write();
        let Some(record) = payments.get_mut(order_code.as_str()) else {
            return Ok(0);
        };

        let at = update.paid_at.unwrap_or_else(Utc::now);
        match record.apply_terminal(update.new_status, update.transaction_id.clone(), at) {
            Ok(()) => Ok(1),
            // Already terminal: the conditional predicate fails, no rows.
            Err(_) => Ok(0),
        }
    }

    async fn count_orphans(&self) -> Result<u64, StoreError> {
        Ok(self
            .payments
            .read()
            .values()
            .filter(|r| r.is_orphan())
            .count() as u64)
    }

    async fn find_orphans(&self, limit: usize) -> Result<Vec<PaymentRecord>, StoreError> {
        let payments = self.payments.read();
        let mut orphans: Vec<PaymentRecord> = payments
            .values()
            .filter(|r| r.is_orphan())
            .cloned()
            .collect();
        orphans.sort_by_key(|r| r.created_at);
        orphans.truncate(limit);
        Ok(orphans)
    }

    async fn find_booking_candidates(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BookingCandidate>, StoreError> {
        Ok(self
            .bookings
            .read()
            .iter()
            .filter(|b| b.created_at >= from && b.created_at <= to)
            .cloned()
            .collect())
    }

    async fn find_booking_by_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<BookingCandidate>, StoreError> {
        Ok(self
            .bookings
            .read()
            .iter()
            .find(|b| b.transaction_id.as_ref() == Some(transaction_id))
            .cloned())
    }

    async fn link_if_unlinked(
        &self,
        order_code: &OrderCode,
        resolution: &LinkageResolution,
    ) -> Result<u64, StoreError> {
        let mut payments = self.payments.write();
        let Some(record) = payments.get_mut(order_code.as_str()) else {
            return Ok(0);
        };
        if record.record_id.is_some() {
            return Ok(0);
        }

        record.patient_id = Some(resolution.patient_id.clone());
        if let Some(doctor_id) = &resolution.doctor_id {
            record.doctor_id = Some(doctor_id.clone());
        }
        record.record_id = Some(resolution.record_id.clone());
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::CreatePaymentCommand;
    use crate::domain::recovery::EvidenceKind;
    use crate::domain::shared::{PatientId, RecordId};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn record_at(code: &str, created_at: DateTime<Utc>) -> PaymentRecord {
        PaymentRecord::new(
            CreatePaymentCommand {
                order_code: OrderCode::new(code),
                amount: dec!(100.00),
                payment_method: "card".to_string(),
                description: "fee".to_string(),
                patient_id: None,
                doctor_id: None,
                record_id: None,
            },
            created_at,
        )
    }

    fn completed_update() -> TerminalUpdate {
        TerminalUpdate {
            new_status: PaymentStatus::Completed,
            transaction_id: Some(TransactionId::new("TXN-1")),
            paid_at: Some(Utc::now()),
        }
    }

    #[tokio::test]
    async fn pending_page_is_oldest_first_and_bounded() {
        let store = InMemoryPaymentStore::new();
        let now = Utc::now();
        store
            .insert(&record_at("ORD-NEW", now))
            .await
            .unwrap();
        store
            .insert(&record_at("ORD-OLD", now - Duration::minutes(10)))
            .await
            .unwrap();
        store
            .insert(&record_at("ORD-MID", now - Duration::minutes(5)))
            .await
            .unwrap();

        let page = store.find_pending_page(2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].order_code, OrderCode::new("ORD-OLD"));
        assert_eq!(page[1].order_code, OrderCode::new("ORD-MID"));
    }

    #[tokio::test]
    async fn complete_if_pending_wins_once() {
        let store = InMemoryPaymentStore::new();
        let code = OrderCode::new("ORD-1");
        store.insert(&record_at("ORD-1", Utc::now())).await.unwrap();

        let first = store
            .complete_if_pending(&code, &completed_update())
            .await
            .unwrap();
        assert_eq!(first, 1);

        let second = store
            .complete_if_pending(&code, &completed_update())
            .await
            .unwrap();
        assert_eq!(second, 0);

        let stored = store.find_by_code(&code).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Completed);
        assert!(stored.paid_at.is_some());
    }

    #[tokio::test]
    async fn complete_if_pending_missing_record_is_zero_rows() {
        let store = InMemoryPaymentStore::new();
        let rows = store
            .complete_if_pending(&OrderCode::new("ORD-NOPE"), &completed_update())
            .await
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[tokio::test]
    async fn link_if_unlinked_refuses_linked_records() {
        let store = InMemoryPaymentStore::new();
        let code = OrderCode::new("ORD-1");
        store.insert(&record_at("ORD-1", Utc::now())).await.unwrap();
        store
            .complete_if_pending(&code, &completed_update())
            .await
            .unwrap();

        let resolution = LinkageResolution {
            patient_id: PatientId::new("pat-1"),
            doctor_id: None,
            record_id: RecordId::new("rec-1"),
            evidence: EvidenceKind::TransactionId,
        };

        assert_eq!(store.link_if_unlinked(&code, &resolution).await.unwrap(), 1);
        assert_eq!(store.link_if_unlinked(&code, &resolution).await.unwrap(), 0);

        assert_eq!(store.count_orphans().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn orphan_queries_cover_only_completed_unlinked() {
        let store = InMemoryPaymentStore::new();
        store.insert(&record_at("ORD-PENDING", Utc::now())).await.unwrap();
        store.insert(&record_at("ORD-DONE", Utc::now())).await.unwrap();
        store
            .complete_if_pending(&OrderCode::new("ORD-DONE"), &completed_update())
            .await
            .unwrap();

        assert_eq!(store.count_orphans().await.unwrap(), 1);
        let orphans = store.find_orphans(10).await.unwrap();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].order_code, OrderCode::new("ORD-DONE"));
    }
}
