//! Circuit breaker for the reconciliation sweep.
//!
//! Suppresses the timer-driven sweep after repeated failures so the engine
//! does not hammer a failing gateway or network path. Priority checks for
//! payments a client is actively watching bypass the breaker and are
//! rate-limited separately by the poller.
//!
//! # State Machine
//!
//! ```text
//! CLOSED → OPEN (consecutive failures >= threshold)
//! OPEN → HALF_OPEN (cooldown elapsed; one trial sweep permitted)
//! HALF_OPEN → CLOSED (trial sweep succeeds)
//! HALF_OPEN → OPEN (trial sweep fails; cooldown restarts)
//! ```
//!
//! The breaker is owned by a single poller instance and is not shared, so
//! it takes `&mut self` rather than using interior mutability. Time is read
//! through an injectable [`Clock`] for deterministic tests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::resilience::clock::Clock;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitBreakerState {
    /// Circuit is closed, sweeps run normally.
    Closed,
    /// Circuit is open, sweeps are skipped.
    Open,
    /// Circuit permits a single trial sweep.
    HalfOpen,
}

impl std::fmt::Display for CircuitBreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "CLOSED"),
            Self::Open => write!(f, "OPEN"),
            Self::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive sweep failures that open the circuit.
    pub failure_threshold: u32,
    /// Duration to stay in `OPEN` before permitting a trial sweep.
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
        }
    }
}

/// Consecutive-failure circuit breaker with an injectable clock.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: CircuitBreakerState,
    failure_count: u32,
    opened_at: Option<Instant>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("state", &self.state)
            .field("failure_count", &self.failure_count)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CircuitBreaker {
    /// Create a new breaker in the `CLOSED` state.
    #[must_use]
    pub fn new(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            state: CircuitBreakerState::Closed,
            failure_count: 0,
            opened_at: None,
            clock,
        }
    }

    /// Current state, applying the time-based `OPEN → HALF_OPEN` transition.
    pub fn state(&mut self) -> CircuitBreakerState {
        self.check_cooldown();
        self.state
    }

    /// Consecutive failures recorded since the last success.
    #[must_use]
    pub const fn failure_count(&self) -> u32 {
        self.failure_count
    }

    /// Whether a sweep is permitted right now.
    ///
    /// `CLOSED` permits every sweep; `HALF_OPEN` permits the single trial
    /// sweep whose outcome decides the next state; `OPEN` permits none.
    pub fn call_permitted(&mut self) -> bool {
        self.check_cooldown();
        match self.state {
            CircuitBreakerState::Closed | CircuitBreakerState::HalfOpen => true,
            CircuitBreakerState::Open => false,
        }
    }

    /// Record a successful sweep.
    ///
    /// Any success resets the consecutive-failure counter to zero and
    /// closes the circuit.
    pub fn record_success(&mut self) {
        self.failure_count = 0;
        if self.state != CircuitBreakerState::Closed {
            tracing::info!(from = %self.state, to = "CLOSED", "Sweep circuit breaker closed");
        }
        self.state = CircuitBreakerState::Closed;
        self.opened_at = None;
    }

    /// Record a failed sweep.
    pub fn record_failure(&mut self) {
        match self.state {
            CircuitBreakerState::Closed => {
                self.failure_count += 1;
                if self.failure_count >= self.config.failure_threshold {
                    self.open();
                }
            }
            CircuitBreakerState::HalfOpen => {
                // Trial sweep failed; cooldown restarts.
                self.open();
            }
            CircuitBreakerState::Open => {
                // Sweeps are skipped while open; a failure here can only
                // come from a caller ignoring call_permitted().
                tracing::warn!("Sweep failure recorded while circuit is OPEN");
            }
        }
    }

    /// Transition to `OPEN`, resetting the failure counter.
    fn open(&mut self) {
        let previous = self.state;
        self.state = CircuitBreakerState::Open;
        self.failure_count = 0;
        self.opened_at = Some(self.clock.now());
        tracing::warn!(
            from = %previous,
            to = "OPEN",
            cooldown_secs = self.config.cooldown.as_secs(),
            "Sweep circuit breaker opened"
        );
    }

    /// Apply `OPEN → HALF_OPEN` once the cooldown has elapsed.
    fn check_cooldown(&mut self) {
        if self.state == CircuitBreakerState::Open
            && let Some(opened) = self.opened_at
            && self.clock.now().duration_since(opened) >= self.config.cooldown
        {
            self.state = CircuitBreakerState::HalfOpen;
            tracing::info!(from = "OPEN", to = "HALF_OPEN", "Sweep circuit breaker testing");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::clock::ManualClock;

    fn breaker_with_clock() -> (CircuitBreaker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let breaker = CircuitBreaker::new(CircuitBreakerConfig::default(), clock.clone());
        (breaker, clock)
    }

    #[test]
    fn initial_state_is_closed() {
        let (mut breaker, _clock) = breaker_with_clock();
        assert_eq!(breaker.state(), CircuitBreakerState::Closed);
        assert!(breaker.call_permitted());
    }

    #[test]
    fn opens_after_exactly_five_consecutive_failures() {
        let (mut breaker, _clock) = breaker_with_clock();

        for _ in 0..4 {
            breaker.record_failure();
            assert_eq!(breaker.state(), CircuitBreakerState::Closed);
        }

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitBreakerState::Open);
        assert!(!breaker.call_permitted());
    }

    #[test]
    fn success_resets_the_failure_counter() {
        let (mut breaker, _clock) = breaker_with_clock();

        for _ in 0..4 {
            breaker.record_failure();
        }
        breaker.record_success();
        assert_eq!(breaker.failure_count(), 0);

        // Four more failures still stay under the threshold.
        for _ in 0..4 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), CircuitBreakerState::Closed);
    }

    #[test]
    fn cooldown_elapses_into_half_open() {
        let (mut breaker, clock) = breaker_with_clock();

        for _ in 0..5 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), CircuitBreakerState::Open);

        clock.advance(Duration::from_secs(29));
        assert_eq!(breaker.state(), CircuitBreakerState::Open);
        assert!(!breaker.call_permitted());

        clock.advance(Duration::from_secs(1));
        assert_eq!(breaker.state(), CircuitBreakerState::HalfOpen);
        assert!(breaker.call_permitted());
    }

    #[test]
    fn half_open_success_closes() {
        let (mut breaker, clock) = breaker_with_clock();

        for _ in 0..5 {
            breaker.record_failure();
        }
        clock.advance(Duration::from_secs(30));
        assert_eq!(breaker.state(), CircuitBreakerState::HalfOpen);

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitBreakerState::Closed);
        assert_eq!(breaker.failure_count(), 0);
    }

    #[test]
    fn half_open_failure_reopens_and_restarts_cooldown() {
        let (mut breaker, clock) = breaker_with_clock();

        for _ in 0..5 {
            breaker.record_failure();
        }
        clock.advance(Duration::from_secs(30));
        assert_eq!(breaker.state(), CircuitBreakerState::HalfOpen);

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitBreakerState::Open);

        // Cooldown restarted from the trial failure.
        clock.advance(Duration::from_secs(29));
        assert_eq!(breaker.state(), CircuitBreakerState::Open);
        clock.advance(Duration::from_secs(1));
        assert_eq!(breaker.state(), CircuitBreakerState::HalfOpen);
    }

    #[test]
    fn counter_resets_when_circuit_opens() {
        let (mut breaker, clock) = breaker_with_clock();

        for _ in 0..5 {
            breaker.record_failure();
        }
        assert_eq!(breaker.failure_count(), 0);

        // After recovery the threshold applies in full again.
        clock.advance(Duration::from_secs(30));
        breaker.record_success();
        for _ in 0..4 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), CircuitBreakerState::Closed);
    }
}
