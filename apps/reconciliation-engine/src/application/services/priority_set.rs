//! Priority set of order codes to check ahead of the general sweep.
//!
//! Recently-initiated or recently-hinted payments are far more likely to
//! have a pending-to-terminal transition available than the average record
//! in a full sweep; prioritizing them gives low-latency feedback without
//! increasing sweep frequency.

use std::collections::VecDeque;

use crate::domain::shared::OrderCode;

/// Default capacity of the priority set.
pub const DEFAULT_CAPACITY: usize = 5;

/// Bounded, deduplicated, recency-ordered set of order codes.
///
/// Most-recently-touched first. Re-touching an existing code promotes it to
/// the front rather than duplicating it; the oldest entry is evicted past
/// capacity. Owned by a single poller instance; no locking required.
#[derive(Debug)]
pub struct PrioritySet {
    entries: VecDeque<OrderCode>,
    capacity: usize,
}

impl PrioritySet {
    /// Create a set with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a set with a custom capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert or promote `order_code` to the front, evicting the oldest
    /// entry past capacity.
    pub fn touch(&mut self, order_code: OrderCode) {
        if let Some(pos) = self.entries.iter().position(|c| c == &order_code) {
            self.entries.remove(pos);
        }
        self.entries.push_front(order_code);
        while self.entries.len() > self.capacity {
            self.entries.pop_back();
        }
    }

    /// Return and clear the current contents, most-recent first.
    pub fn drain(&mut self) -> Vec<OrderCode> {
        self.entries.drain(..).collect()
    }

    /// Number of entries currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PrioritySet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn touch_orders_most_recent_first() {
        let mut set = PrioritySet::new();
        set.touch(OrderCode::new("a"));
        set.touch(OrderCode::new("b"));
        set.touch(OrderCode::new("c"));

        assert_eq!(
            set.drain(),
            vec![
                OrderCode::new("c"),
                OrderCode::new("b"),
                OrderCode::new("a")
            ]
        );
    }

    #[test]
    fn re_touch_promotes_without_duplicating() {
        let mut set = PrioritySet::new();
        set.touch(OrderCode::new("a"));
        set.touch(OrderCode::new("b"));
        set.touch(OrderCode::new("a"));

        assert_eq!(set.len(), 2);
        assert_eq!(
            set.drain(),
            vec![OrderCode::new("a"), OrderCode::new("b")]
        );
    }

    #[test]
    fn seven_touches_keep_the_five_most_recent() {
        let mut set = PrioritySet::new();
        for code in ["a", "b", "c", "d", "e", "f", "g"] {
            set.touch(OrderCode::new(code));
        }

        assert_eq!(
            set.drain(),
            vec![
                OrderCode::new("g"),
                OrderCode::new("f"),
                OrderCode::new("e"),
                OrderCode::new("d"),
                OrderCode::new("c"),
            ]
        );
    }

    #[test]
    fn drain_clears_the_set() {
        let mut set = PrioritySet::new();
        set.touch(OrderCode::new("a"));

        assert_eq!(set.drain().len(), 1);
        assert!(set.is_empty());
        assert!(set.drain().is_empty());
    }

    proptest! {
        #[test]
        fn bound_and_order_hold_for_any_touch_sequence(codes in proptest::collection::vec("[a-z]{1,4}", 0..40)) {
            let mut set = PrioritySet::new();
            for code in &codes {
                set.touch(OrderCode::new(code.clone()));
            }

            let drained = set.drain();
            prop_assert!(drained.len() <= DEFAULT_CAPACITY);

            // No duplicates.
            let mut unique: Vec<_> = drained.clone();
            unique.dedup();
            prop_assert_eq!(unique.len(), drained.len());

            // Drained order matches the last-touch order of distinct codes.
            let mut expected: Vec<OrderCode> = Vec::new();
            for code in codes.iter().rev() {
                let code = OrderCode::new(code.clone());
                if !expected.contains(&code) {
                    expected.push(code);
                }
            }
            expected.truncate(DEFAULT_CAPACITY);
            prop_assert_eq!(drained, expected);
        }
    }
}
