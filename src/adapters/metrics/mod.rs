//! Metrics and Monitoring Adapters
//!
//! Provides Prometheus feed metrics and the health/metrics endpoints
//! (/live, /ready, /metrics) via axum 0.7.

pub mod health;
pub mod prometheus;

pub use self::health::HealthServer;
pub use self::prometheus::FeedMetrics;
