//! Application use cases.

mod recover_orphans;
mod sync_status;

pub use recover_orphans::{RecoverOrphansUseCase, RecoveryOptions, RecoveryReport};
pub use sync_status::{SyncError, SyncOutcome, SyncStatusUseCase};
