//! Sweep circuit breaker configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::CircuitBreakerConfig;

/// Circuit breaker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerSettings {
    /// Consecutive sweep failures that open the circuit.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Seconds to stay open before permitting a trial sweep.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

impl BreakerSettings {
    /// Convert to the resilience module's config type.
    #[must_use]
    pub const fn to_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            cooldown: Duration::from_secs(self.cooldown_secs),
        }
    }
}

const fn default_failure_threshold() -> u32 {
    5
}

const fn default_cooldown_secs() -> u64 {
    30
}
