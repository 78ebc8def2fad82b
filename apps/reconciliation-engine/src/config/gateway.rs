//! Payment gateway client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::infrastructure::gateway::GatewayClientConfig;

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    /// Base URL of the gateway API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token for the gateway API.
    #[serde(default)]
    pub api_token: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GatewaySettings {
    /// Convert to the gateway client's config type.
    #[must_use]
    pub fn to_client_config(&self) -> GatewayClientConfig {
        GatewayClientConfig {
            base_url: self.base_url.clone(),
            api_token: self.api_token.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:9470".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = GatewaySettings::default();
        assert_eq!(settings.timeout_secs, 10);
        assert!(settings.api_token.is_none());

        let client = settings.to_client_config();
        assert_eq!(client.timeout, Duration::from_secs(10));
    }
}
