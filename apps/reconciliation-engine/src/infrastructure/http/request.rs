//! HTTP request types for the operational API.

use serde::Deserialize;

/// Kind of inbound notification event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// A client started a payment.
    PaymentInitiated,
    /// A component suspects a status change.
    PaymentStatusHint,
}

/// Inbound notification event.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationRequest {
    /// Event kind.
    pub event: NotificationKind,
    /// Order code the event concerns.
    pub order_code: String,
}
