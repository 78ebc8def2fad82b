//! Linkage matching strategies for orphan recovery.
//!
//! Matchers are pure: they correlate one orphan payment against a set of
//! booking candidates and either produce a resolution or decline. The
//! recovery use case tries matchers in order, strongest evidence first, so
//! a returned transaction ID always beats the amount/time-window heuristic.

use chrono::Duration;

use crate::domain::payment::PaymentRecord;
use crate::domain::recovery::evidence::{BookingCandidate, EvidenceKind, LinkageResolution};

/// A strategy that correlates an orphan payment with a booking candidate.
pub trait LinkageMatcher: Send + Sync {
    /// Strategy name for logging.
    fn name(&self) -> &'static str;

    /// Attempt to resolve linkage for `payment` from `candidates`.
    ///
    /// Returns `None` when the strategy finds no unambiguous match.
    fn correlate(
        &self,
        payment: &PaymentRecord,
        candidates: &[BookingCandidate],
    ) -> Option<LinkageResolution>;
}

/// Matches on the gateway-assigned transaction identifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionIdMatcher;

impl LinkageMatcher for TransactionIdMatcher {
    fn name(&self) -> &'static str {
        "transaction_id"
    }

    fn correlate(
        &self,
        payment: &PaymentRecord,
        candidates: &[BookingCandidate],
    ) -> Option<LinkageResolution> {
        let txn = payment.transaction_id.as_ref()?;
        candidates
            .iter()
            .find(|c| c.transaction_id.as_ref() == Some(txn))
            .map(|c| LinkageResolution::from_candidate(c, EvidenceKind::TransactionId))
    }
}

/// Matches on exact amount within a creation-time window.
///
/// Best-effort fallback. Requires exactly one candidate in the window with
/// the payment's amount; two or more matches resolve to nothing rather than
/// guessing.
#[derive(Debug, Clone, Copy)]
pub struct AmountWindowMatcher {
    window: Duration,
}

impl AmountWindowMatcher {
    /// Create a matcher with the given window around the payment's
    /// creation time.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self { window }
    }

    /// The configured matching window.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }
}

impl Default for AmountWindowMatcher {
    fn default() -> Self {
        Self::new(Duration::minutes(15))
    }
}

impl LinkageMatcher for AmountWindowMatcher {
    fn name(&self) -> &'static str {
        "amount_window"
    }

    fn correlate(
        &self,
        payment: &PaymentRecord,
        candidates: &[BookingCandidate],
    ) -> Option<LinkageResolution> {
        let mut matches = candidates.iter().filter(|c| {
            c.amount == payment.amount
                && (c.created_at - payment.created_at).abs() <= self.window
        });

        let first = matches.next()?;
        if matches.next().is_some() {
            // Ambiguous: leave the orphan for stronger evidence.
            return None;
        }
        Some(LinkageResolution::from_candidate(
            first,
            EvidenceKind::AmountWindow,
        ))
    }
}

/// Run matchers in order and return the first resolution.
#[must_use]
pub fn resolve_linkage(
    matchers: &[Box<dyn LinkageMatcher>],
    payment: &PaymentRecord,
    candidates: &[BookingCandidate],
) -> Option<LinkageResolution> {
    matchers
        .iter()
        .find_map(|m| m.correlate(payment, candidates))
}

/// Default matcher chain: transaction ID first, amount window second.
#[must_use]
pub fn default_matchers(window: Duration) -> Vec<Box<dyn LinkageMatcher>> {
    vec![
        Box::new(TransactionIdMatcher),
        Box::new(AmountWindowMatcher::new(window)),
    ]
}
