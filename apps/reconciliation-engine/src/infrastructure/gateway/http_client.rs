//! HTTP gateway status client.
//!
//! Queries the payment gateway's transaction API for the authoritative
//! status of one order code. Stateless apart from the connection pool.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::application::ports::{GatewayError, GatewayPort, GatewayStatusReport};
use crate::domain::payment::PaymentStatus;
use crate::domain::shared::{OrderCode, TransactionId};

/// Gateway client configuration.
#[derive(Debug, Clone)]
pub struct GatewayClientConfig {
    /// Base URL of the gateway API.
    pub base_url: String,
    /// Bearer token for the gateway API, when required.
    pub api_token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for GatewayClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9470".to_string(),
            api_token: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Wire format of the gateway's transaction status response.
#[derive(Debug, Deserialize)]
struct TransactionResponse {
    status: String,
    #[serde(rename = "transactionId")]
    transaction_id: Option<String>,
    #[serde(rename = "paidAt")]
    paid_at: Option<DateTime<Utc>>,
}

/// HTTP implementation of [`GatewayPort`].
#[derive(Debug, Clone)]
pub struct HttpGatewayClient {
    client: Client,
    base_url: String,
    api_token: Option<String>,
    timeout_secs: u64,
}

impl HttpGatewayClient {
    /// Create a new client from config.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unavailable`] when the underlying HTTP
    /// client cannot be constructed.
    pub fn new(config: &GatewayClientConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Unavailable {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            timeout_secs: config.timeout.as_secs(),
        })
    }

    fn map_body(
        order_code: &OrderCode,
        body: &TransactionResponse,
    ) -> Result<GatewayStatusReport, GatewayError> {
        let status = PaymentStatus::parse(&body.status).ok_or_else(|| {
            GatewayError::Unavailable {
                message: format!("unrecognized gateway status '{}'", body.status),
            }
        })?;

        debug!(
            order_code = %order_code,
            status = %status,
            "Gateway status fetched"
        );

        Ok(GatewayStatusReport {
            status,
            transaction_id: body.transaction_id.clone().map(TransactionId::new),
            paid_at: body.paid_at,
        })
    }
}

#[async_trait]
impl GatewayPort for HttpGatewayClient {
    async fn get_status(
        &self,
        order_code: &OrderCode,
    ) -> Result<GatewayStatusReport, GatewayError> {
        let url = format!("{}/api/v1/transactions/{}", self.base_url, order_code);

        let mut request = self.client.get(&url);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout {
                    timeout_secs: self.timeout_secs,
                }
            } else {
                GatewayError::Unavailable {
                    message: e.to_string(),
                }
            }
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(GatewayError::NotFound {
                order_code: order_code.clone(),
            }),
            status if status.is_success() => {
                let body: TransactionResponse =
                    response.json().await.map_err(|e| GatewayError::Unavailable {
                        message: format!("invalid gateway response: {e}"),
                    })?;
                Self::map_body(order_code, &body)
            }
            status => Err(GatewayError::Unavailable {
                message: format!("gateway returned HTTP {status}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HttpGatewayClient {
        HttpGatewayClient::new(&GatewayClientConfig {
            base_url: server.uri(),
            api_token: None,
            timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn parses_completed_transaction() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/transactions/ORD-1001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "paid",
                "transactionId": "TXN-77",
                "paidAt": "2025-06-01T12:00:00Z"
            })))
            .mount(&server)
            .await;

        let report = client_for(&server)
            .get_status(&OrderCode::new("ORD-1001"))
            .await
            .unwrap();

        assert_eq!(report.status, PaymentStatus::Completed);
        assert_eq!(report.transaction_id, Some(TransactionId::new("TXN-77")));
        assert!(report.paid_at.is_some());
    }

    #[tokio::test]
    async fn pending_transaction_has_no_paid_at() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/transactions/ORD-1001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "pending",
                "transactionId": null,
                "paidAt": null
            })))
            .mount(&server)
            .await;

        let report = client_for(&server)
            .get_status(&OrderCode::new("ORD-1001"))
            .await
            .unwrap();

        assert_eq!(report.status, PaymentStatus::Pending);
        assert!(report.transaction_id.is_none());
    }

    #[tokio::test]
    async fn unknown_order_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/transactions/ORD-NOPE"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_status(&OrderCode::new("ORD-NOPE"))
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::NotFound { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn server_error_maps_to_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/transactions/ORD-1001"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_status(&OrderCode::new("ORD-1001"))
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Unavailable { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn unrecognized_status_maps_to_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/transactions/ORD-1001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "chargeback",
                "transactionId": null,
                "paidAt": null
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_status(&OrderCode::new("ORD-1001"))
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Unavailable { .. }));
    }
}
