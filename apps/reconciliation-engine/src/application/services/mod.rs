//! Application services: the poller loop and its priority set.

mod priority_set;
mod reconciliation_poller;

pub use priority_set::{DEFAULT_CAPACITY, PrioritySet};
pub use reconciliation_poller::{
    Notification, PollerConfig, PollerHandle, ReconciliationPoller,
};
