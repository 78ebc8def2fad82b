//! Orphan recovery configuration.

use serde::{Deserialize, Serialize};

use crate::application::use_cases::RecoveryOptions;

/// Recovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoverySettings {
    /// Maximum orphans examined per run.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Window around the payment's creation time for the amount heuristic,
    /// in seconds.
    #[serde(default = "default_match_window_secs")]
    pub match_window_secs: u64,
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            match_window_secs: default_match_window_secs(),
        }
    }
}

impl RecoverySettings {
    /// Convert to the recovery use case's options type.
    #[must_use]
    pub fn to_recovery_options(&self) -> RecoveryOptions {
        RecoveryOptions {
            batch_size: self.batch_size,
            match_window: chrono::Duration::seconds(self.match_window_secs as i64),
        }
    }

    /// Matching window as a chrono duration.
    #[must_use]
    pub fn match_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.match_window_secs as i64)
    }
}

const fn default_batch_size() -> usize {
    50
}

const fn default_match_window_secs() -> u64 {
    900 // 15 minutes
}
