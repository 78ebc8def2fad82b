//! Payment record aggregate.
//!
//! The payment store is the system of record; this type carries the store's
//! view of one payment plus the transition rule the store's conditional
//! updates enforce (`pending` is the only state a terminal write may replace).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::payment::errors::PaymentError;
use crate::domain::payment::status::PaymentStatus;
use crate::domain::shared::{DoctorId, OrderCode, PatientId, RecordId, TransactionId};

/// A locally persisted payment record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Order code correlating this record with the gateway transaction.
    pub order_code: OrderCode,
    /// Current status. `Pending` until the gateway reports an outcome.
    pub status: PaymentStatus,
    /// Payment amount.
    pub amount: Decimal,
    /// Payment method chosen at creation ("card", "bank_transfer", ...).
    pub payment_method: String,
    /// Human-readable description.
    pub description: String,
    /// Linked patient, absent for orphan payments.
    pub patient_id: Option<PatientId>,
    /// Linked doctor, absent for orphan payments.
    pub doctor_id: Option<DoctorId>,
    /// Linked medical record, absent for orphan payments.
    pub record_id: Option<RecordId>,
    /// Gateway-assigned transaction identifier, once known.
    pub transaction_id: Option<TransactionId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Set only on the transition into `Completed`.
    pub paid_at: Option<DateTime<Utc>>,
}

/// Command to create a new pending payment record.
#[derive(Debug, Clone)]
pub struct CreatePaymentCommand {
    /// Order code for the new record.
    pub order_code: OrderCode,
    /// Payment amount.
    pub amount: Decimal,
    /// Payment method.
    pub payment_method: String,
    /// Description.
    pub description: String,
    /// Patient linkage, if the booking flow got that far.
    pub patient_id: Option<PatientId>,
    /// Doctor linkage, if the booking flow got that far.
    pub doctor_id: Option<DoctorId>,
    /// Record linkage, if the booking flow got that far.
    pub record_id: Option<RecordId>,
}

impl PaymentRecord {
    /// Create a new pending record.
    #[must_use]
    pub fn new(command: CreatePaymentCommand, created_at: DateTime<Utc>) -> Self {
        Self {
            order_code: command.order_code,
            status: PaymentStatus::Pending,
            amount: command.amount,
            payment_method: command.payment_method,
            description: command.description,
            patient_id: command.patient_id,
            doctor_id: command.doctor_id,
            record_id: command.record_id,
            transaction_id: None,
            created_at,
            paid_at: None,
        }
    }

    /// Returns true if this record is missing required linkage.
    ///
    /// Only `Completed` payments count as orphans; a failed booking that
    /// also failed to pay needs no repair.
    #[must_use]
    pub fn is_orphan(&self) -> bool {
        self.status == PaymentStatus::Completed
            && (self.patient_id.is_none() || self.record_id.is_none())
    }

    /// Apply a terminal status reported by the gateway.
    ///
    /// This is the in-process equivalent of the store's conditional update:
    /// it only succeeds when the record is still `Pending`. `paid_at` is set
    /// only when the new status is `Completed`.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::NotTerminal`] when `new_status` is `Pending`,
    /// or [`PaymentError::AlreadyTerminal`] when the record has already left
    /// `Pending`.
    pub fn apply_terminal(
        &mut self,
        new_status: PaymentStatus,
        transaction_id: Option<TransactionId>,
        at: DateTime<Utc>,
    ) -> Result<(), PaymentError> {
        if !new_status.is_terminal() {
            return Err(PaymentError::NotTerminal { status: new_status });
        }
        if self.status.is_terminal() {
            return Err(PaymentError::AlreadyTerminal {
                order_code: self.order_code.clone(),
                status: self.status,
            });
        }

        self.status = new_status;
        if new_status == PaymentStatus::Completed {
            self.paid_at = Some(at);
        }
        if let Some(txn) = transaction_id {
            self.transaction_id = Some(txn);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pending_record() -> PaymentRecord {
        PaymentRecord::new(
            CreatePaymentCommand {
                order_code: OrderCode::new("ORD-1001"),
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

    #[test]
    fn new_record_is_pending_without_paid_at() {
        let record = pending_record();
        assert_eq!(record.status, PaymentStatus::Pending);
        assert!(record.paid_at.is_none());
        assert!(record.transaction_id.is_none());
    }

    #[test]
    fn apply_terminal_completes_and_stamps_paid_at() {
        let mut record = pending_record();
        let at = Utc::now();

        record
            .apply_terminal(
                PaymentStatus::Completed,
                Some(TransactionId::new("TXN-77")),
                at,
            )
            .unwrap();

        assert_eq!(record.status, PaymentStatus::Completed);
        assert_eq!(record.paid_at, Some(at));
        assert_eq!(record.transaction_id, Some(TransactionId::new("TXN-77")));
    }

    #[test]
    fn apply_terminal_failed_does_not_stamp_paid_at() {
        let mut record = pending_record();

        record
            .apply_terminal(PaymentStatus::Failed, None, Utc::now())
            .unwrap();

        assert_eq!(record.status, PaymentStatus::Failed);
        assert!(record.paid_at.is_none());
    }

    #[test]
    fn terminal_state_is_monotonic() {
        let mut record = pending_record();
        record
            .apply_terminal(PaymentStatus::Completed, None, Utc::now())
            .unwrap();

        let err = record
            .apply_terminal(PaymentStatus::Failed, None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, PaymentError::AlreadyTerminal { .. }));
        assert_eq!(record.status, PaymentStatus::Completed);
    }

    #[test]
    fn apply_terminal_rejects_pending_target() {
        let mut record = pending_record();
        let err = record
            .apply_terminal(PaymentStatus::Pending, None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, PaymentError::NotTerminal { .. }));
    }

    #[test]
    fn orphan_detection_requires_completed_status() {
        let mut record = pending_record();
        assert!(!record.is_orphan());

        record
            .apply_terminal(PaymentStatus::Completed, None, Utc::now())
            .unwrap();
        assert!(record.is_orphan());

        record.patient_id = Some(PatientId::new("pat-1"));
        record.record_id = Some(RecordId::new("rec-1"));
        assert!(!record.is_orphan());
    }

    #[test]
    fn partially_linked_completed_record_is_orphan() {
        let mut record = pending_record();
        record.patient_id = Some(PatientId::new("pat-1"));
        record
            .apply_terminal(PaymentStatus::Completed, None, Utc::now())
            .unwrap();

        // record_id still missing
        assert!(record.is_orphan());
    }
}
