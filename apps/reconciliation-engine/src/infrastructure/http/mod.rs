//! Operational HTTP API.

mod controller;
mod request;
mod response;

pub use controller::{AppState, create_router};
pub use request::{NotificationKind, NotificationRequest};
pub use response::{
    ErrorResponse, HealthResponse, NotificationResponse, OrphanCountResponse, RecoveryResponse,
    SyncResponse,
};
