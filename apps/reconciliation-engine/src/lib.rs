// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! Reconciliation Engine - Rust Core Library
//!
//! Keeps locally persisted payment records consistent with the external,
//! asynchronous payment gateway in the presence of unreliable webhooks,
//! client-initiated polling, concurrent writers, and partially-linked
//! records produced by failed booking flows.
//!
//! # Architecture (Clean Architecture + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic (record aggregate, status lifecycle,
//!   recovery evidence matching)
//!   - `payment`: `PaymentRecord`, `PaymentStatus`, domain events
//!   - `recovery`: linkage matchers (transaction ID, amount/time window)
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: Interfaces for external systems (`GatewayPort`,
//!     `PaymentStorePort`, `EventPublisherPort`)
//!   - `use_cases`: `SyncStatus`, `RecoverOrphans`
//!   - `services`: `ReconciliationPoller`, `PrioritySet`
//!
//! - **Infrastructure**: Adapters (implementations)
//!   - `gateway`: HTTP gateway status client (+ scripted mock)
//!   - `persistence`: Payment store (in-memory, Turso)
//!   - `events`: Broadcast event bus
//!   - `http`: Operational JSON API
//!
//! The `resilience` module carries the sweep circuit breaker and the
//! injectable clock that keeps its transitions unit-testable.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases, services, and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

/// Resilience primitives - circuit breaker, injectable clock.
pub mod resilience;

/// Configuration loading.
pub mod config;

// =============================================================================
// Re-exports
// =============================================================================

// Domain re-exports
pub use domain::payment::{PaymentEvent, PaymentRecord, PaymentStatus};
pub use domain::recovery::{
    AmountWindowMatcher, BookingCandidate, LinkageMatcher, TransactionIdMatcher,
};
pub use domain::shared::{OrderCode, TransactionId};

// Application re-exports
pub use application::ports::{
    EventPublisherPort, GatewayError, GatewayPort, GatewayStatusReport, NoOpEventPublisher,
    PaymentStorePort, StoreError, TerminalUpdate,
};
pub use application::services::{
    Notification, PollerConfig, PollerHandle, PrioritySet, ReconciliationPoller,
};
pub use application::use_cases::{
    RecoverOrphansUseCase, RecoveryReport, SyncError, SyncOutcome, SyncStatusUseCase,
};

// Resilience re-exports
pub use resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerState};

// Infrastructure re-exports
pub use infrastructure::events::BroadcastEventBus;
pub use infrastructure::gateway::{GatewayClientConfig, HttpGatewayClient, MockGateway};
pub use infrastructure::http::{AppState, create_router};
pub use infrastructure::persistence::{InMemoryPaymentStore, TursoPaymentStore};
