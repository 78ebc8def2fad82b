//! Gateway Status Port (Driven Port)
//!
//! Interface for querying the external payment gateway for the
//! authoritative status of one order code.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::payment::PaymentStatus;
use crate::domain::shared::{OrderCode, TransactionId};

/// Gateway query error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// The gateway does not know this order code.
    #[error("gateway does not know order {order_code}")]
    NotFound {
        /// The unknown order code.
        order_code: OrderCode,
    },

    /// Transient gateway failure (5xx, connection error).
    #[error("gateway unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// The gateway did not respond within the configured timeout.
    #[error("gateway request timed out after {timeout_secs}s")]
    Timeout {
        /// The timeout that elapsed.
        timeout_secs: u64,
    },
}

impl GatewayError {
    /// Whether retrying the same call later can succeed.
    ///
    /// `NotFound` reflects gateway-reported business state and is not
    /// retryable; it does not count toward the sweep circuit breaker.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

/// Authoritative status report for one order code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayStatusReport {
    /// Status as reported by the gateway.
    pub status: PaymentStatus,
    /// Gateway-assigned transaction identifier, once the transaction is
    /// registered.
    pub transaction_id: Option<TransactionId>,
    /// When the gateway recorded payment, for completed transactions.
    pub paid_at: Option<DateTime<Utc>>,
}

/// Port for querying the payment gateway. Pure interface; no internal state.
#[async_trait]
pub trait GatewayPort: Send + Sync {
    /// Fetch the authoritative status of `order_code`.
    async fn get_status(&self, order_code: &OrderCode)
    -> Result<GatewayStatusReport, GatewayError>;
}
