//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (WebSockets, Prometheus, HTTP).
//!
//! Adapter categories:
//! - `feeds`: WebSocket transport and endpoint providers
//! - `metrics`: Prometheus metrics export and health checks

pub mod feeds;
pub mod metrics;
