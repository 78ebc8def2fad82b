//! Infrastructure layer - Adapters and external integrations.

/// Event bus adapters.
pub mod events;

/// Payment gateway adapters.
pub mod gateway;

/// Operational HTTP API.
pub mod http;

/// Payment store adapters.
pub mod persistence;
