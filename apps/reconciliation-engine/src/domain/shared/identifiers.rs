//! Strongly-typed identifiers for domain entities.
//!
//! These prevent mixing up IDs from different contexts.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier from a string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Generate a new unique identifier using UUID v4.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Get the inner string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

define_id!(
    OrderCode,
    "Externally-visible code correlating a local payment with a gateway transaction."
);
define_id!(
    TransactionId,
    "Gateway-assigned transaction identifier, used as recovery evidence."
);
define_id!(PatientId, "Unique identifier for a patient.");
define_id!(DoctorId, "Unique identifier for a doctor.");
define_id!(
    RecordId,
    "Unique identifier for a medical record created by a booking flow."
);
define_id!(BookingId, "Unique identifier for a booking attempt.");
