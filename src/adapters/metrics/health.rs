//! Health Check Server - Liveness, Readiness and Metrics Endpoints
//!
//! Exposes /live, /ready and /metrics via axum 0.7. Readiness depends
//! on event stream connectivity and flips to unavailable once shutdown
//! starts.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use super::prometheus::FeedMetrics;

#[derive(Clone)]
struct AppState {
    metrics: Arc<FeedMetrics>,
    shutdown: watch::Receiver<bool>,
}

/// Axum-based health and metrics HTTP server.
pub struct HealthServer {
    metrics: Arc<FeedMetrics>,
    bind_address: String,
}

impl HealthServer {
    pub fn new(metrics: Arc<FeedMetrics>, bind_address: impl Into<String>) -> Self {
        Self {
            metrics,
            bind_address: bind_address.into(),
        }
    }

    fn router(&self, shutdown: watch::Receiver<bool>) -> Router {
        Router::new()
            .route("/live", get(Self::liveness))
            .route("/ready", get(Self::readiness))
            .route("/metrics", get(Self::metrics))
            .with_state(AppState {
                metrics: Arc::clone(&self.metrics),
                shutdown,
            })
    }

    /// Serve until `shutdown` turns true.
    #[instrument(skip(self, shutdown))]
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let app = self.router(shutdown.clone());
        let listener = tokio::net::TcpListener::bind(&self.bind_address).await?;

        info!(address = %self.bind_address, "Health and metrics server started");

        let mut shutdown = shutdown;
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|stopping| *stopping).await;
            })
            .await?;

        Ok(())
    }

    /// Liveness probe: always returns 200 if the process is running.
    async fn liveness() -> impl IntoResponse {
        (StatusCode::OK, "OK")
    }

    /// Readiness probe: 200 only while connected and not shutting down.
    async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
        if state.metrics.is_connected() && !*state.shutdown.borrow() {
            (StatusCode::OK, "READY")
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
        }
    }

    async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
        match state.metrics.render() {
            Ok(body) => (StatusCode::OK, body),
            Err(e) => {
                warn!(error = %e, "Failed to encode metrics");
                (StatusCode::INTERNAL_SERVER_ERROR, String::new())
            }
        }
    }
}
