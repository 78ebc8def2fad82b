//! HTTP response types for the operational API.

use serde::Serialize;

use crate::domain::payment::PaymentStatus;

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Application version.
    pub version: String,
}

/// Response for a one-off sync.
#[derive(Debug, Clone, Serialize)]
pub struct SyncResponse {
    /// Order code that was synced.
    pub order_code: String,
    /// Authoritative status after the sync.
    pub status: PaymentStatus,
    /// Whether this call changed the stored record.
    pub changed: bool,
}

/// Response for the orphan count.
#[derive(Debug, Clone, Serialize)]
pub struct OrphanCountResponse {
    /// Completed payments missing linkage.
    pub count: u64,
}

/// Response for a recovery run.
#[derive(Debug, Clone, Serialize)]
pub struct RecoveryResponse {
    /// Orphans examined.
    pub total: usize,
    /// Orphans recovered.
    pub recovered: usize,
    /// Orphans left unresolved.
    pub unresolved: usize,
}

/// Response for an accepted notification.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationResponse {
    /// Whether the poller accepted the notification.
    pub accepted: bool,
}

/// Error response body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}
