//! Orphan recovery bounded context: correlating evidence and matching
//! strategies for restoring payment linkage.

mod evidence;
mod matcher;

pub use evidence::{BookingCandidate, EvidenceKind, LinkageResolution};
pub use matcher::{
    AmountWindowMatcher, LinkageMatcher, TransactionIdMatcher, default_matchers, resolve_linkage,
};
