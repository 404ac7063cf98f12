//! Event Feed Adapters - Streaming Transport and Endpoints
//!
//! Provides:
//! - `WsTransport`: tokio-tungstenite WebSocket transport
//! - `StaticEndpoint` / `SharedEndpoint`: base event URL sources

pub mod endpoint;
pub mod ws_transport;

pub use endpoint::{SharedEndpoint, StaticEndpoint};
pub use ws_transport::WsTransport;
