//! Configuration module for the reconciliation engine.
//!
//! Provides configuration loading with defaulted fields. All cadences and
//! thresholds are process-level settings; a YAML file is optional and every
//! field falls back to its default.
//!
//! # Usage
//!
//! ```rust,ignore
//! use reconciliation_engine::config::{Config, load_config};
//!
//! // Defaults only
//! let config = load_config(None)?;
//!
//! // From a YAML file
//! let config = load_config(Some("config.yaml"))?;
//! ```

mod breaker;
mod gateway;
mod persistence;
mod poller;
mod recovery;
mod server;

pub use breaker::BreakerSettings;
pub use gateway::GatewaySettings;
pub use persistence::PersistenceSettings;
pub use poller::PollerSettings;
pub use recovery::RecoverySettings;
pub use server::ServerConfig;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Gateway client configuration.
    #[serde(default)]
    pub gateway: GatewaySettings,
    /// Poller configuration.
    #[serde(default)]
    pub poller: PollerSettings,
    /// Sweep circuit breaker configuration.
    #[serde(default)]
    pub breaker: BreakerSettings,
    /// Orphan recovery configuration.
    #[serde(default)]
    pub recovery: RecoverySettings,
    /// Payment store configuration.
    #[serde(default)]
    pub persistence: PersistenceSettings,
}

/// Load configuration, falling back to defaults when no path is given.
///
/// # Errors
///
/// Returns a [`ConfigError`] when the file cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_string(),
        source,
    })?;
    Ok(serde_yaml_bw::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_no_path() {
        let config = load_config(None).unwrap();
        assert_eq!(config.server.http_port, 8086);
        assert_eq!(config.poller.sweep_interval_secs, 6);
        assert_eq!(config.breaker.failure_threshold, 5);
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let config: Config = serde_yaml_bw::from_str(
            "poller:\n  sweep_interval_secs: 4\nbreaker:\n  cooldown_secs: 60\n",
        )
        .unwrap();

        assert_eq!(config.poller.sweep_interval_secs, 4);
        assert_eq!(config.poller.page_size, 25);
        assert_eq!(config.breaker.cooldown_secs, 60);
        assert_eq!(config.breaker.failure_threshold, 5);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_config(Some("does/not/exist.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }
}
