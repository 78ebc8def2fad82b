//! Domain layer - Core business logic with no external dependencies.

/// Payment record, status lifecycle, and domain events.
pub mod payment;

/// Orphan recovery evidence and matching strategies.
pub mod recovery;

/// Shared identifiers.
pub mod shared;
