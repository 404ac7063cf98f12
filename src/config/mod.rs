//! Configuration Module - TOML-based Feed Configuration
//!
//! Loads and validates configuration from `config.toml` with
//! environment variable overrides via `.env` files.
//! Endpoint, subscription and output settings are externalized here;
//! nothing is hardcoded in the usecases layer.

pub mod loader;

use std::time::Duration;

use serde::Deserialize;

use crate::domain::params::SubscriptionParams;

/// Top-level feed configuration.
///
/// Loaded from `config.toml` at startup. Every section except `[api]`
/// may be omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Client identity and logging.
  #[serde(default)]
  pub client: ClientConfig,
  /// Streaming endpoint and timeouts.
  pub api: ApiConfig,
  /// Reconnect backoff.
  #[serde(default)]
  pub reconnect: ReconnectConfig,
  /// What to subscribe to.
  #[serde(default)]
  pub subscription: SubscriptionConfig,
  /// How to print events.
  #[serde(default)]
  pub output: OutputConfig,
  /// Metrics and health endpoints.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

/// Client identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
  /// Name used in logs.
  #[serde(default = "default_client_name")]
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Emit JSON log lines.
  #[serde(default)]
  pub json_logs: bool,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      name: default_client_name(),
      log_level: default_log_level(),
      json_logs: false,
    }
  }
}

/// Streaming endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base WebSocket URL of the event stream.
  #[serde(default)]
  pub event_url: String,
  /// WebSocket handshake timeout (ms).
  #[serde(default = "default_handshake_timeout")]
  pub handshake_timeout_ms: u64,
  /// Idle read timeout before the socket is recycled (ms).
  #[serde(default = "default_read_timeout")]
  pub read_timeout_ms: u64,
}

impl ApiConfig {
  pub const fn handshake_timeout(&self) -> Duration {
    Duration::from_millis(self.handshake_timeout_ms)
  }

  pub const fn read_timeout(&self) -> Duration {
    Duration::from_millis(self.read_timeout_ms)
  }
}

/// Reconnect backoff configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
  /// First retry delay (ms).
  #[serde(default = "default_initial_delay")]
  pub initial_delay_ms: u64,
  /// Upper bound of the retry delay (ms).
  #[serde(default = "default_max_delay")]
  pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
  fn default() -> Self {
    Self {
      initial_delay_ms: default_initial_delay(),
      max_delay_ms: default_max_delay(),
    }
  }
}

/// Subscription configuration.
///
/// Market codes default to `"00"` for every issue code when omitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionConfig {
  /// Board topology (`p_rid`).
  #[serde(default)]
  pub rid: i32,
  /// Board number (`p_board_no`).
  #[serde(default)]
  pub board_no: i32,
  /// Board rows; defaults to 1..=n when issue codes are given.
  #[serde(default)]
  pub rows: Vec<i32>,
  /// Issue codes.
  #[serde(default)]
  pub issue_codes: Vec<String>,
  /// Market codes.
  #[serde(default)]
  pub market_codes: Vec<String>,
  /// Resume position.
  #[serde(default)]
  pub eno: i64,
  /// Command tags (ST, KP, FD, EC, NS, SS, US).
  #[serde(default)]
  pub commands: Vec<String>,
}

impl SubscriptionConfig {
  /// Convert into request parameters, filling default rows and markets.
  pub fn to_params(&self) -> SubscriptionParams {
    let mut rows = self.rows.clone();
    if rows.is_empty() && !self.issue_codes.is_empty() {
      rows = (1..=i32::try_from(self.issue_codes.len()).unwrap_or(i32::MAX)).collect();
    }
    let mut market_codes = self.market_codes.clone();
    if market_codes.is_empty() {
      market_codes = vec![DEFAULT_MARKET_CODE.to_string(); self.issue_codes.len()];
    }
    SubscriptionParams {
      rid: self.rid,
      board_no: self.board_no,
      rows,
      issue_codes: self.issue_codes.clone(),
      market_codes,
      eno: self.eno,
      commands: Vec::new(),
    }
    .with_commands(&self.commands)
  }
}

/// Market code used when none is configured.
pub const DEFAULT_MARKET_CODE: &str = "00";

/// Output mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
  /// One line per event.
  #[default]
  Events,
  /// Periodically redrawn quote board.
  Board,
}

/// Event line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

/// Output configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
  #[serde(default)]
  pub mode: OutputMode,
  #[serde(default)]
  pub format: OutputFormat,
  /// Depth levels per side in board mode (1..=10).
  #[serde(default = "default_board_levels")]
  pub board_levels: usize,
  /// Board redraw interval (ms).
  #[serde(default = "default_refresh")]
  pub refresh_ms: u64,
}

impl Default for OutputConfig {
  fn default() -> Self {
    Self {
      mode: OutputMode::default(),
      format: OutputFormat::default(),
      board_levels: default_board_levels(),
      refresh_ms: default_refresh(),
    }
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Enable Prometheus metrics export.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Metrics and health server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      bind_address: default_metrics_addr(),
    }
  }
}

// Default value functions for serde

fn default_client_name() -> String {
  "kabu-event-feed".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_handshake_timeout() -> u64 {
  30_000
}

fn default_read_timeout() -> u64 {
  60_000
}

fn default_initial_delay() -> u64 {
  1_000
}

fn default_max_delay() -> u64 {
  30_000
}

fn default_board_levels() -> usize {
  5
}

fn default_refresh() -> u64 {
  1_000
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}
