//! Payment store configuration.

use serde::{Deserialize, Serialize};

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceSettings {
    /// Path of the Turso database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "data/payments.db".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        assert_eq!(
            PersistenceSettings::default().database_path,
            "data/payments.db"
        );
    }
}
