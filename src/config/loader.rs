//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, applying environment overrides,
//! validating all parameters, and providing clear error messages for
//! misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::AppConfig;
use crate::domain::quote::MAX_DEPTH;

/// Overrides `api.event_url`.
pub const ENV_EVENT_URL: &str = "KABU_EVENT_URL";
/// Overrides `subscription.eno`.
pub const ENV_EVENT_ENO: &str = "KABU_EVENT_ENO";

/// Load and validate configuration from a TOML file.
///
/// A `.env` file in the working directory is loaded first, so its
/// variables count as environment overrides.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - An override is malformed
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  if let Err(e) = dotenvy::dotenv() {
    if !e.not_found() {
      warn!(error = %e, "Failed to load .env file");
    }
  }

  let path = Path::new(path);
  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let mut config = parse_config(&content)?;
  apply_overrides(&mut config, |key| std::env::var(key).ok())?;
  validate_config(&config)?;

  info!(
    client = %config.client.name,
    rid = config.subscription.rid,
    symbols = config.subscription.issue_codes.len(),
    mode = ?config.output.mode,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse TOML text without overrides or validation.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  toml::from_str(content).with_context(|| "Failed to parse config.toml")
}

/// Apply `KABU_EVENT_URL` / `KABU_EVENT_ENO` from `lookup`.
pub fn apply_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<()>
where
  F: Fn(&str) -> Option<String>,
{
  if let Some(url) = lookup(ENV_EVENT_URL).filter(|v| !v.trim().is_empty()) {
    config.api.event_url = url.trim().to_string();
  }
  if let Some(eno) = lookup(ENV_EVENT_ENO).filter(|v| !v.trim().is_empty()) {
    config.subscription.eno = eno
      .trim()
      .parse()
      .with_context(|| format!("{ENV_EVENT_ENO} must be an integer, got {eno:?}"))?;
  }
  Ok(())
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - A parseable event URL
/// - Positive timeouts and a sane backoff range
/// - A subscription the gateway accepts
/// - Board depth within the published levels
fn validate_config(config: &AppConfig) -> Result<()> {
  // API validation
  anyhow::ensure!(
    !config.api.event_url.trim().is_empty(),
    "Event URL must not be empty (set api.event_url or {ENV_EVENT_URL})"
  );
  url::Url::parse(config.api.event_url.trim())
    .with_context(|| format!("Invalid event URL: {}", config.api.event_url))?;
  anyhow::ensure!(
    config.api.handshake_timeout_ms > 0,
    "handshake_timeout_ms must be positive"
  );
  anyhow::ensure!(
    config.api.read_timeout_ms > 0,
    "read_timeout_ms must be positive"
  );

  // Reconnect validation
  anyhow::ensure!(
    config.reconnect.initial_delay_ms > 0,
    "initial_delay_ms must be positive"
  );
  anyhow::ensure!(
    config.reconnect.max_delay_ms >= config.reconnect.initial_delay_ms,
    "max_delay_ms ({}) must be >= initial_delay_ms ({})",
    config.reconnect.max_delay_ms,
    config.reconnect.initial_delay_ms
  );

  // Subscription validation
  config
    .subscription
    .to_params()
    .validate()
    .context("Invalid subscription")?;

  // Output validation
  anyhow::ensure!(
    (1..=MAX_DEPTH).contains(&config.output.board_levels),
    "board_levels must be in [1, {MAX_DEPTH}], got {}",
    config.output.board_levels
  );
  anyhow::ensure!(config.output.refresh_ms > 0, "refresh_ms must be positive");

  Ok(())
}
