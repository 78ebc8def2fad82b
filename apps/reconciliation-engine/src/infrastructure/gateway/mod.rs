//! Gateway adapters: HTTP client and scripted mock.

mod http_client;
mod mock;

pub use http_client::{GatewayClientConfig, HttpGatewayClient};
pub use mock::MockGateway;
