//! Reconciliation poller configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::services::PollerConfig;

/// Poller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerSettings {
    /// Base sweep cadence in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Random extra added to the cadence at startup, in seconds.
    #[serde(default = "default_sweep_jitter_secs")]
    pub sweep_jitter_secs: u64,
    /// Maximum pending records checked per sweep.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Delay before a notification-triggered check, in milliseconds.
    #[serde(default = "default_priority_check_delay_ms")]
    pub priority_check_delay_ms: u64,
    /// Minimum spacing between checks for the same order code, in seconds.
    #[serde(default = "default_notification_cooldown_secs")]
    pub notification_cooldown_secs: u64,
    /// Orphan recovery cadence in seconds.
    #[serde(default = "default_recovery_interval_secs")]
    pub recovery_interval_secs: u64,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
            sweep_jitter_secs: default_sweep_jitter_secs(),
            page_size: default_page_size(),
            priority_check_delay_ms: default_priority_check_delay_ms(),
            notification_cooldown_secs: default_notification_cooldown_secs(),
            recovery_interval_secs: default_recovery_interval_secs(),
        }
    }
}

impl PollerSettings {
    /// Convert to the poller's config type.
    #[must_use]
    pub const fn to_poller_config(&self) -> PollerConfig {
        PollerConfig {
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
            sweep_jitter: Duration::from_secs(self.sweep_jitter_secs),
            page_size: self.page_size,
            priority_check_delay: Duration::from_millis(self.priority_check_delay_ms),
            notification_cooldown: Duration::from_secs(self.notification_cooldown_secs),
            recovery_interval: Duration::from_secs(self.recovery_interval_secs),
        }
    }
}

const fn default_sweep_interval_secs() -> u64 {
    6
}

const fn default_sweep_jitter_secs() -> u64 {
    2
}

const fn default_page_size() -> usize {
    25
}

const fn default_priority_check_delay_ms() -> u64 {
    1500
}

const fn default_notification_cooldown_secs() -> u64 {
    10
}

const fn default_recovery_interval_secs() -> u64 {
    300 // 5 minutes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = PollerSettings::default();
        assert_eq!(settings.sweep_interval_secs, 6);
        assert_eq!(settings.page_size, 25);
        assert_eq!(settings.recovery_interval_secs, 300);
    }

    #[test]
    fn converts_to_poller_config() {
        let config = PollerSettings::default().to_poller_config();
        assert_eq!(config.sweep_interval, Duration::from_secs(6));
        assert_eq!(config.priority_check_delay, Duration::from_millis(1500));
        assert_eq!(config.notification_cooldown, Duration::from_secs(10));
    }
}
