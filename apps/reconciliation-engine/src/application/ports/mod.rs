//! Ports (interfaces) for external systems.

mod event_publisher_port;
mod gateway_port;
mod payment_store_port;

pub use event_publisher_port::{EventPublishError, EventPublisherPort, NoOpEventPublisher};
pub use gateway_port::{GatewayError, GatewayPort, GatewayStatusReport};
pub use payment_store_port::{PaymentStorePort, StoreError, TerminalUpdate};
