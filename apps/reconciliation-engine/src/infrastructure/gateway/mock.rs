//! Scripted mock gateway for tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::application::ports::{GatewayError, GatewayPort, GatewayStatusReport};
use crate::domain::shared::OrderCode;

/// Mock gateway with per-order scripted responses.
///
/// Unknown order codes answer `NotFound`, matching the real gateway.
#[derive(Debug, Default)]
pub struct MockGateway {
    responses: Mutex<HashMap<String, Result<GatewayStatusReport, GatewayError>>>,
    calls: Mutex<HashMap<String, u32>>,
}

impl MockGateway {
    /// Create an empty mock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a status report for `order_code`.
    pub fn set_status(&self, order_code: &OrderCode, report: GatewayStatusReport) {
        self.responses
            .lock()
            .insert(order_code.as_str().to_string(), Ok(report));
    }

    /// Script an error for `order_code`.
    pub fn set_error(&self, order_code: &OrderCode, error: GatewayError) {
        self.responses
            .lock()
            .insert(order_code.as_str().to_string(), Err(error));
    }

    /// Number of `get_status` calls made for `order_code`.
    #[must_use]
    pub fn call_count(&self, order_code: &OrderCode) -> u32 {
        self.calls
            .lock()
            .get(order_code.as_str())
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl GatewayPort for MockGateway {
    async fn get_status(
        &self,
        order_code: &OrderCode,
    ) -> Result<GatewayStatusReport, GatewayError> {
        *self
            .calls
            .lock()
            .entry(order_code.as_str().to_string())
            .or_insert(0) += 1;

        self.responses
            .lock()
            .get(order_code.as_str())
            .cloned()
            .unwrap_or_else(|| {
                Err(GatewayError::NotFound {
                    order_code: order_code.clone(),
                })
            })
    }
}
