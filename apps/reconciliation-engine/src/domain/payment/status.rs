//! Payment status in the reconciliation lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment status.
///
/// `Pending` is the only non-terminal state. Transitions are
/// `pending → completed`, `pending → failed`, `pending → cancelled`,
/// each exactly once; a record never leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Payment created, gateway outcome not yet known.
    Pending,
    /// Gateway confirmed the payment.
    Completed,
    /// Gateway reported the payment as failed.
    Failed,
    /// Payment was cancelled before completion.
    Cancelled,
}

impl PaymentStatus {
    /// Returns true if no further transition can occur from this state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Parse a status from its stored/wire representation.
    ///
    /// Accepts the `SCREAMING_SNAKE_CASE` form used in the store and the
    /// lowercase form used by the gateway API.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "COMPLETED" | "PAID" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            "CANCELLED" | "CANCELED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_is_the_only_non_terminal_state() {
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(PaymentStatus::Completed.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
        assert!(PaymentStatus::Cancelled.is_terminal());
    }

    use test_case::test_case;

    #[test_case("PENDING", PaymentStatus::Pending; "store pending")]
    #[test_case("completed", PaymentStatus::Completed; "gateway completed")]
    #[test_case("paid", PaymentStatus::Completed; "gateway paid alias")]
    #[test_case("FAILED", PaymentStatus::Failed; "store failed")]
    #[test_case("cancelled", PaymentStatus::Cancelled; "british spelling")]
    #[test_case("canceled", PaymentStatus::Cancelled; "american spelling")]
    fn parse_accepts_store_and_gateway_forms(input: &str, expected: PaymentStatus) {
        assert_eq!(PaymentStatus::parse(input), Some(expected));
    }

    #[test]
    fn parse_rejects_unknown_status() {
        assert_eq!(PaymentStatus::parse("refunded"), None);
    }

    #[test]
    fn display_round_trips_through_parse() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Completed,
            PaymentStatus::Failed,
            PaymentStatus::Cancelled,
        ] {
            assert_eq!(PaymentStatus::parse(&status.to_string()), Some(status));
        }
    }

    #[test]
    fn status_serde() {
        let json = serde_json::to_string(&PaymentStatus::Completed).unwrap();
        assert_eq!(json, "\"COMPLETED\"");

        let parsed: PaymentStatus = serde_json::from_str("\"CANCELLED\"").unwrap();
        assert_eq!(parsed, PaymentStatus::Cancelled);
    }
}
