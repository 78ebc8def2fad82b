//! Correlating evidence for orphan payment recovery.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{BookingId, DoctorId, PatientId, RecordId, TransactionId};

/// A booking attempt that may correspond to an orphan payment.
///
/// Produced by booking flows that created their patient/record rows but
/// failed before writing the linkage back onto the payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingCandidate {
    /// Booking identifier.
    pub booking_id: BookingId,
    /// Patient the booking was made for.
    pub patient_id: PatientId,
    /// Doctor the booking was made with, when known.
    pub doctor_id: Option<DoctorId>,
    /// Medical record created by the booking flow.
    pub record_id: RecordId,
    /// Fee the booking expected to charge.
    pub amount: Decimal,
    /// Gateway transaction the booking observed, when known.
    pub transaction_id: Option<TransactionId>,
    /// When the booking attempt started.
    pub created_at: DateTime<Utc>,
}

/// Strength of the evidence that produced a linkage resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvidenceKind {
    /// Gateway transaction identifiers matched exactly.
    TransactionId,
    /// Amount matched within the creation-time window.
    AmountWindow,
}

impl std::fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TransactionId => write!(f, "TRANSACTION_ID"),
            Self::AmountWindow => write!(f, "AMOUNT_WINDOW"),
        }
    }
}

/// Linkage to write back onto an orphan payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkageResolution {
    /// Patient to link.
    pub patient_id: PatientId,
    /// Doctor to link, when the booking recorded one.
    pub doctor_id: Option<DoctorId>,
    /// Medical record to link.
    pub record_id: RecordId,
    /// Evidence that produced this resolution.
    pub evidence: EvidenceKind,
}

impl LinkageResolution {
    /// Build a resolution from a matched booking candidate.
    #[must_use]
    pub fn from_candidate(candidate: &BookingCandidate, evidence: EvidenceKind) -> Self {
        Self {
            patient_id: candidate.patient_id.clone(),
            doctor_id: candidate.doctor_id.clone(),
            record_id: candidate.record_id.clone(),
            evidence,
        }
    }
}
