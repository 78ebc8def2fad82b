//! Domain errors for the payment lifecycle.

use thiserror::Error;

use crate::domain::payment::status::PaymentStatus;
use crate::domain::shared::OrderCode;

/// Errors from payment state transitions.
#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    /// The target status is not a terminal state.
    #[error("cannot transition into non-terminal status {status}")]
    NotTerminal {
        /// The rejected target status.
        status: PaymentStatus,
    },

    /// The record has already left `Pending`.
    #[error("payment {order_code} is already terminal ({status})")]
    AlreadyTerminal {
        /// Order code of the record.
        order_code: OrderCode,
        /// The terminal status the record holds.
        status: PaymentStatus,
    },
}
