//! Shared domain primitives used across bounded contexts.

mod identifiers;

pub use identifiers::{BookingId, DoctorId, OrderCode, PatientId, RecordId, TransactionId};
