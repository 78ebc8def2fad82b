//! HTTP Controller (Driver Adapter)
//!
//! Axum-based JSON API that delegates to application use cases: one-off
//! sync for a watched payment, orphan counting/recovery, and inbound
//! notification events forwarded to the poller.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::application::ports::{EventPublisherPort, GatewayPort, PaymentStorePort};
use crate::application::services::{Notification, PollerHandle};
use crate::application::use_cases::{RecoverOrphansUseCase, SyncError, SyncStatusUseCase};
use crate::domain::shared::OrderCode;

use super::request::{NotificationKind, NotificationRequest};
use super::response::{
    ErrorResponse, HealthResponse, NotificationResponse, OrphanCountResponse, RecoveryResponse,
    SyncResponse,
};

/// Application state shared across handlers.
pub struct AppState<G, S, E>
where
    G: GatewayPort,
    S: PaymentStorePort,
    E: EventPublisherPort,
{
    /// Use case for one-off syncs.
    pub sync: Arc<SyncStatusUseCase<G, S, E>>,
    /// Use case for orphan recovery.
    pub recovery: Arc<RecoverOrphansUseCase<S, E>>,
    /// Handle for delivering notifications to the poller.
    pub poller: PollerHandle,
    /// Application version.
    pub version: String,
}

impl<G, S, E> Clone for AppState<G, S, E>
where
    G: GatewayPort,
    S: PaymentStorePort,
    E: EventPublisherPort,
{
    fn clone(&self) -> Self {
        Self {
            sync: Arc::clone(&self.sync),
            recovery: Arc::clone(&self.recovery),
            poller: self.poller.clone(),
            version: self.version.clone(),
        }
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router<G, S, E>(state: AppState<G, S, E>) -> Router
where
    G: GatewayPort + 'static,
    S: PaymentStorePort + 'static,
    E: EventPublisherPort + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/payments/{order_code}/sync", post(sync_payment))
        .route("/api/v1/orphans/count", get(count_orphans))
        .route("/api/v1/orphans/recover", post(recover_orphans))
        .route("/api/v1/notifications", post(accept_notification))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check<G, S, E>(State(state): State<AppState<G, S, E>>) -> impl IntoResponse
where
    G: GatewayPort,
    S: PaymentStorePort,
    E: EventPublisherPort,
{
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
    })
}

/// Run one sync for an order code the client is watching.
async fn sync_payment<G, S, E>(
    State(state): State<AppState<G, S, E>>,
    Path(order_code): Path<String>,
) -> impl IntoResponse
where
    G: GatewayPort,
    S: PaymentStorePort,
    E: EventPublisherPort,
{
    let order_code = OrderCode::new(order_code);
    match state.sync.execute(&order_code).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(SyncResponse {
                order_code: order_code.into_inner(),
                status: outcome.status,
                changed: outcome.changed,
            }),
        )
            .into_response(),
        Err(e @ SyncError::Gateway { .. }) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                code: "ORDER_UNKNOWN".to_string(),
                message: e.to_string(),
            }),
        )
            .into_response(),
        Err(e @ SyncError::Network { .. }) => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse {
                code: "GATEWAY_UNAVAILABLE".to_string(),
                message: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// Report the current orphan count.
async fn count_orphans<G, S, E>(State(state): State<AppState<G, S, E>>) -> impl IntoResponse
where
    G: GatewayPort,
    S: PaymentStorePort,
    E: EventPublisherPort,
{
    match state.recovery.count_orphans().await {
        Ok(count) => (StatusCode::OK, Json(OrphanCountResponse { count })).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                code: "STORE_ERROR".to_string(),
                message: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// Run one orphan recovery pass.
async fn recover_orphans<G, S, E>(State(state): State<AppState<G, S, E>>) -> impl IntoResponse
where
    G: GatewayPort,
    S: PaymentStorePort,
    E: EventPublisherPort,
{
    match state.recovery.execute().await {
        Ok(report) => (
            StatusCode::OK,
            Json(RecoveryResponse {
                total: report.total,
                recovered: report.recovered,
                unresolved: report.unresolved(),
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                code: "STORE_ERROR".to_string(),
                message: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// Accept an inbound notification event and forward it to the poller.
async fn accept_notification<G, S, E>(
    State(state): State<AppState<G, S, E>>,
    Json(request): Json<NotificationRequest>,
) -> impl IntoResponse
where
    G: GatewayPort,
    S: PaymentStorePort,
    E: EventPublisherPort,
{
    let order_code = OrderCode::new(request.order_code);
    let notification = match request.event {
        NotificationKind::PaymentInitiated => Notification::PaymentInitiated { order_code },
        NotificationKind::PaymentStatusHint => Notification::StatusHint { order_code },
    };

    if state.poller.notify(notification) {
        (
            StatusCode::ACCEPTED,
            Json(NotificationResponse { accepted: true }),
        )
            .into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                code: "POLLER_UNAVAILABLE".to_string(),
                message: "notification queue is full or the poller has stopped".to_string(),
            }),
        )
            .into_response()
    }
}
