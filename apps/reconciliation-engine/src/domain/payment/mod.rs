//! Payment bounded context: record aggregate, status lifecycle, events.

mod errors;
mod events;
mod record;
mod status;

pub use errors::PaymentError;
pub use events::{PaymentEvent, PaymentUpdated, RecoveryCompleted, SyncFailed};
pub use record::{CreatePaymentCommand, PaymentRecord};
pub use status::PaymentStatus;
