//! Prometheus Metrics Registry - Feed Observability
//!
//! Counts delivered events per command, decode failures and
//! reconnects, and tracks connectivity plus the resume watermark.
//! Implements `FeedObserver` so the connection manager reports into it
//! without depending on prometheus.

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::ports::event_feed::FeedObserver;

/// Centralized Prometheus metrics for the event feed.
///
/// All metrics follow the naming convention `kabu_feed_*`.
pub struct FeedMetrics {
    /// Prometheus registry.
    registry: Registry,
    /// Delivered events by command tag.
    pub events_total: IntCounterVec,
    /// Payloads that failed to decode.
    pub decode_errors_total: IntCounter,
    /// Successful connects after the first.
    pub reconnects_total: IntCounter,
    /// Highest notice number delivered.
    pub last_event_no: IntGauge,
    /// Connection status (1 = connected, 0 = disconnected).
    pub connected: IntGauge,
}

impl FeedMetrics {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let events_total = IntCounterVec::new(
            Opts::new("kabu_feed_events_total", "Events delivered by command"),
            &["command"],
        )?;

        let decode_errors_total = IntCounter::new(
            "kabu_feed_decode_errors_total",
            "Event payloads that failed to decode",
        )?;

        let reconnects_total = IntCounter::new(
            "kabu_feed_reconnects_total",
            "Event stream reconnects",
        )?;

        let last_event_no = IntGauge::new(
            "kabu_feed_last_event_no",
            "Highest event notice number (p_ENO) delivered",
        )?;

        let connected = IntGauge::new(
            "kabu_feed_connected",
            "Event stream connection status (1=connected, 0=disconnected)",
        )?;

        // Register all metrics
        registry.register(Box::new(events_total.clone()))?;
        registry.register(Box::new(decode_errors_total.clone()))?;
        registry.register(Box::new(reconnects_total.clone()))?;
        registry.register(Box::new(last_event_no.clone()))?;
        registry.register(Box::new(connected.clone()))?;

        Ok(Self {
            registry,
            events_total,
            decode_errors_total,
            reconnects_total,
            last_event_no,
            connected,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connected.get() > 0
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl FeedObserver for FeedMetrics {
    fn on_connected(&self, reconnect: bool) {
        self.connected.set(1);
        if reconnect {
            self.reconnects_total.inc();
        }
    }

    fn on_disconnected(&self) {
        self.connected.set(0);
    }

    fn on_event(&self, kind: &str, event_no: Option<i64>) {
        self.events_total.with_label_values(&[kind]).inc();
        if let Some(eno) = event_no {
            if eno > self.last_event_no.get() {
                self.last_event_no.set(eno);
            }
        }
    }

    fn on_decode_error(&self) {
        self.decode_errors_total.inc();
    }
}
