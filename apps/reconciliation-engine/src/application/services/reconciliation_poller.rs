//! Reconciliation Poller Service
//!
//! The scheduling loop of the engine: runs a full sweep on a fixed cadence,
//! runs priority checks shortly after notification events, and periodically
//! invokes orphan recovery. All sweep-class work runs on one logical task,
//! serialized through the loop itself; overlapping timer ticks are dropped,
//! not queued.
//!
//! The sweep is guarded by the circuit breaker; notification checks bypass
//! the breaker (rate-limited per order code) so a paused sweep never blocks
//! feedback for the payment a user is actively watching.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::ports::{EventPublisherPort, GatewayPort, PaymentStorePort};
use crate::application::services::priority_set::PrioritySet;
use crate::application::use_cases::{RecoverOrphansUseCase, SyncStatusUseCase};
use crate::domain::payment::{PaymentEvent, SyncFailed};
use crate::domain::shared::OrderCode;
use crate::resilience::{CircuitBreaker, Clock};

/// Inbound notification events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A client started a payment for this order code.
    PaymentInitiated {
        /// Order code of the new payment.
        order_code: OrderCode,
    },
    /// Some component suspects this payment's status changed
    /// (e.g. redirect return from the gateway).
    StatusHint {
        /// Order code of the suspected payment.
        order_code: OrderCode,
    },
}

impl Notification {
    /// Order code this notification concerns.
    #[must_use]
    pub const fn order_code(&self) -> &OrderCode {
        match self {
            Self::PaymentInitiated { order_code } | Self::StatusHint { order_code } => order_code,
        }
    }
}

/// Poller configuration.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Base sweep cadence.
    pub sweep_interval: Duration,
    /// Random extra added to the cadence once at startup, so multiple
    /// engine instances do not sweep in lockstep.
    pub sweep_jitter: Duration,
    /// Maximum pending records checked per sweep.
    pub page_size: usize,
    /// Delay before a notification-triggered check, giving the gateway
    /// time to register the transaction.
    pub priority_check_delay: Duration,
    /// Minimum spacing between notification-triggered checks for the same
    /// order code.
    pub notification_cooldown: Duration,
    /// Cadence of orphan recovery runs.
    pub recovery_interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(6),
            sweep_jitter: Duration::from_secs(2),
            page_size: 25,
            priority_check_delay: Duration::from_millis(1500),
            notification_cooldown: Duration::from_secs(10),
            recovery_interval: Duration::from_secs(300),
        }
    }
}

/// Handle for delivering notifications to a running poller.
#[derive(Debug, Clone)]
pub struct PollerHandle {
    tx: mpsc::Sender<Notification>,
}

impl PollerHandle {
    /// Deliver a notification. Returns `false` when the poller has stopped
    /// or its queue is full (the next sweep will still catch the record).
    pub fn notify(&self, notification: Notification) -> bool {
        match self.tx.try_send(notification) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Dropped poller notification");
                false
            }
        }
    }
}

/// Poller sweep phase. One in-flight sweep at a time; a tick that fires
/// while a sweep is running is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SweepPhase {
    Idle,
    Sweeping,
}

/// A one-off check scheduled by a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScheduledCheck {
    due_at: Instant,
    order_code: OrderCode,
}

impl Ord for ScheduledCheck {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.due_at
            .cmp(&other.due_at)
            .then_with(|| self.order_code.as_str().cmp(other.order_code.as_str()))
    }
}

impl PartialOrd for ScheduledCheck {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// The reconciliation poller.
pub struct ReconciliationPoller<G, S, E>
where
    G: GatewayPort,
    S: PaymentStorePort,
    E: EventPublisherPort,
{
    config: PollerConfig,
    sync: Arc<SyncStatusUseCase<G, S, E>>,
    recovery: Arc<RecoverOrphansUseCase<S, E>>,
    store: Arc<S>,
    publisher: Arc<E>,
    breaker: CircuitBreaker,
    priority: PrioritySet,
    recent_checks: HashMap<OrderCode, std::time::Instant>,
    scheduled: BinaryHeap<Reverse<ScheduledCheck>>,
    phase: SweepPhase,
    clock: Arc<dyn Clock>,
    rx: mpsc::Receiver<Notification>,
    shutdown: CancellationToken,
}

/// Capacity of the notification queue.
const NOTIFICATION_QUEUE_CAPACITY: usize = 64;

impl<G, S, E> ReconciliationPoller<G, S, E>
where
    G: GatewayPort + 'static,
    S: PaymentStorePort + 'static,
    E: EventPublisherPort + 'static,
{
    /// Create a poller and the handle used to notify it.
    #[must_use]
    pub fn new(
        config: PollerConfig,
        sync: Arc<SyncStatusUseCase<G, S, E>>,
        recovery: Arc<RecoverOrphansUseCase<S, E>>,
        store: Arc<S>,
        publisher: Arc<E>,
        breaker: CircuitBreaker,
        clock: Arc<dyn Clock>,
        shutdown: CancellationToken,
    ) -> (Self, PollerHandle) {
        let (tx, rx) = mpsc::channel(NOTIFICATION_QUEUE_CAPACITY);
        let poller = Self {
            config,
            sync,
            recovery,
            store,
            publisher,
            breaker,
            priority: PrioritySet::new(),
            recent_checks: HashMap::new(),
            scheduled: BinaryHeap::new(),
            phase: SweepPhase::Idle,
            clock,
            rx,
            shutdown,
        };
        (poller, PollerHandle { tx })
    }

    /// Spawn the poller loop onto the runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run the poller loop until the cancellation token fires.
    ///
    /// Teardown cancels the timers and discards any scheduled one-off
    /// checks; nothing outlives this task.
    pub async fn run(mut self) {
        let period = self.jittered_period();
        info!(
            sweep_interval_ms = period.as_millis() as u64,
            page_size = self.config.page_size,
            "Reconciliation poller started"
        );

        // First ticks fire one full period after startup.
        let start = Instant::now();
        let mut sweep_timer = time::interval_at(start + period, period);
        sweep_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut recovery_timer = time::interval_at(
            start + self.config.recovery_interval,
            self.config.recovery_interval,
        );
        recovery_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let next_due = self.scheduled.peek().map(|Reverse(c)| c.due_at);
            let due_sleep = next_due.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

            tokio::select! {
                () = self.shutdown.cancelled() => {
                    info!(
                        pending_checks = self.scheduled.len(),
                        "Reconciliation poller shutting down"
                    );
                    break;
                }
                _ = sweep_timer.tick() => {
                    self.run_sweep().await;
                }
                _ = recovery_timer.tick() => {
                    self.run_recovery().await;
                }
                Some(notification) = self.rx.recv() => {
                    self.handle_notification(&notification);
                }
                () = time::sleep_until(due_sleep), if next_due.is_some() => {
                    self.run_due_checks().await;
                }
            }
        }
    }

    /// Sweep cadence with startup jitter applied.
    fn jittered_period(&self) -> Duration {
        let jitter_ms = self.config.sweep_jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.config.sweep_interval;
        }
        let extra = rand::rng().random_range(0..=jitter_ms);
        self.config.sweep_interval + Duration::from_millis(extra)
    }

    /// Handle one inbound notification: promote the order code in the
    /// priority set and schedule a rate-limited one-off check.
    fn handle_notification(&mut self, notification: &Notification) {
        let order_code = notification.order_code().clone();
        debug!(order_code = %order_code, ?notification, "Notification received");
        self.priority.touch(order_code.clone());

        if !self.should_schedule_check(&order_code) {
            debug!(order_code = %order_code, "Notification check rate-limited");
            return;
        }

        let due_at = Instant::now() + self.config.priority_check_delay;
        self.scheduled.push(Reverse(ScheduledCheck {
            due_at,
            order_code,
        }));
    }

    /// Rate limit: at most one scheduled check per order code per cooldown
    /// window.
    fn should_schedule_check(&mut self, order_code: &OrderCode) -> bool {
        let now = self.clock.now();
        let cooldown = self.config.notification_cooldown;
        self.recent_checks
            .retain(|_, at| now.duration_since(*at) < cooldown);

        if self.recent_checks.contains_key(order_code) {
            return false;
        }
        self.recent_checks.insert(order_code.clone(), now);
        true
    }

    /// Run every scheduled check whose delay has elapsed.
    async fn run_due_checks(&mut self) {
        let now = Instant::now();
        while let Some(Reverse(check)) = self.scheduled.peek() {
            if check.due_at > now {
                break;
            }
            let Some(Reverse(check)) = self.scheduled.pop() else {
                break;
            };
            self.run_priority_check(check.order_code).await;
        }
    }

    /// One notification-triggered check. Always permitted, independent of
    /// the breaker; failures surface on the event bus instead of crashing
    /// the poller.
    async fn run_priority_check(&self, order_code: OrderCode) {
        match self.sync.execute(&order_code).await {
            Ok(outcome) => {
                debug!(
                    order_code = %order_code,
                    status = %outcome.status,
                    changed = outcome.changed,
                    "Priority check completed"
                );
            }
            Err(e) => {
                warn!(order_code = %order_code, error = %e, "Priority check failed");
                let event = PaymentEvent::SyncFailed(SyncFailed {
                    order_code,
                    retryable: e.is_retryable(),
                    message: e.to_string(),
                    occurred_at: Utc::now(),
                });
                if let Err(publish_err) = self.publisher.publish_event(event).await {
                    warn!(error = %publish_err, "Failed to publish sync failure");
                }
            }
        }
    }

    /// One full sweep: drain and sync the priority set, then a bounded page
    /// of remaining pending records, oldest first.
    async fn run_sweep(&mut self) {
        if self.phase == SweepPhase::Sweeping {
            debug!("Overlapping sweep tick dropped");
            return;
        }
        if !self.breaker.call_permitted() {
            debug!(breaker = %self.breaker.state(), "Sweep suppressed by circuit breaker");
            return;
        }
        self.phase = SweepPhase::Sweeping;

        // Priority entries first. Their failures surface through the
        // notification path and do not feed the breaker.
        for order_code in self.priority.drain() {
            if let Err(e) = self.sync.execute(&order_code).await {
                debug!(order_code = %order_code, error = %e, "Priority sweep entry failed");
            }
        }

        // Bounded page of remaining pending records. Only retryable
        // (network-class) failures count toward the breaker; gateway-reported
        // business errors do not.
        let mut network_failure = false;
        match self.store.find_pending_page(self.config.page_size).await {
            Ok(page) => {
                let mut changed = 0usize;
                for record in &page {
                    match self.sync.execute(&record.order_code).await {
                        Ok(outcome) if outcome.changed => changed += 1,
                        Ok(_) => {}
                        Err(e) if e.is_retryable() => {
                            network_failure = true;
                            warn!(order_code = %record.order_code, error = %e, "Sweep sync failed");
                        }
                        Err(e) => {
                            debug!(order_code = %record.order_code, error = %e, "Gateway rejected sweep entry");
                        }
                    }
                }
                debug!(page = page.len(), changed, "Sweep page processed");
            }
            Err(e) => {
                network_failure = true;
                warn!(error = %e, "Failed to load pending page");
            }
        }

        if network_failure {
            self.breaker.record_failure();
        } else {
            self.breaker.record_success();
        }
        self.phase = SweepPhase::Idle;
    }

    /// One orphan recovery run.
    async fn run_recovery(&self) {
        if let Err(e) = self.recovery.execute().await {
            warn!(error = %e, "Orphan recovery run failed");
        }
    }
}
