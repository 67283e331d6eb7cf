//! Telemetry initialization and configuration

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static OUTCOME: OnceLock<Result<(), TelemetryError>> = OnceLock::new();

/// Errors raised while installing the global subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TelemetryError {
    /// Neither `RUST_LOG` nor the configured default produced a usable filter.
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    /// Another global subscriber was installed first.
    #[error("Failed to install subscriber: {0}")]
    Install(String),
}

/// Console logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Name attached to the startup event.
    pub service_name: String,
    /// Filter used when `RUST_LOG` is unset, e.g. `"info,rtvi_livekit=debug"`.
    pub default_filter: String,
    /// Emit newline-delimited JSON instead of human-readable lines.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "rtvi-livekit".to_string(),
            default_filter: "info".to_string(),
            json: false,
        }
    }
}

impl TelemetryConfig {
    /// Create a config for the given service with default settings.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into(), ..Default::default() }
    }

    /// Set the fallback filter directives.
    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }

    /// Switch to JSON output.
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    fn env_filter(&self) -> Result<EnvFilter, TelemetryError> {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.default_filter))
            .map_err(|e| TelemetryError::InvalidFilter(e.to_string()))
    }
}

/// Initialize console logging with default settings.
///
/// # Example
/// ```
/// use rtvi_telemetry::init_telemetry;
/// init_telemetry("my-voice-client").expect("Failed to initialize telemetry");
/// ```
pub fn init_telemetry(service_name: &str) -> Result<(), TelemetryError> {
    init_with_config(&TelemetryConfig::new(service_name))
}

/// Initialize console logging from an explicit config.
///
/// Only the first call that gets as far as installing a subscriber does so.
/// Its result is kept: later calls return the same `Ok(())` or
/// [`TelemetryError::Install`] without touching the global state. An invalid
/// filter is reported before anything is installed and is not remembered.
pub fn init_with_config(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    if let Some(outcome) = OUTCOME.get() {
        return outcome.clone();
    }
    let filter = config.env_filter()?;

    OUTCOME.get_or_init(|| install(config, filter)).clone()
}

fn install(config: &TelemetryConfig, filter: EnvFilter) -> Result<(), TelemetryError> {
    let registry = tracing_subscriber::registry().with(filter);
    let installed = if config.json {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(true).with_line_number(true))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_thread_ids(true).with_line_number(true))
            .try_init()
    };

    installed.map_err(|e| TelemetryError::Install(e.to_string()))?;
    tracing::info!(service.name = %config.service_name, json = config.json, "Telemetry initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "rtvi-livekit");
        assert_eq!(config.default_filter, "info");
        assert!(!config.json);
    }

    #[test]
    fn test_builder() {
        let config = TelemetryConfig::new("bot-client")
            .with_default_filter("debug,rtvi_livekit=trace")
            .with_json(true);
        assert_eq!(config.service_name, "bot-client");
        assert_eq!(config.default_filter, "debug,rtvi_livekit=trace");
        assert!(config.json);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: TelemetryConfig = serde_json::from_str(r#"{"json": true}"#).unwrap();
        assert!(config.json);
        assert_eq!(config.default_filter, "info");
    }

    #[test]
    fn test_init_is_idempotent() {
        init_telemetry("first").unwrap();
        init_telemetry("second").unwrap();
    }

    #[test]
    fn test_repeated_init_replays_first_outcome() {
        let first = init_with_config(&TelemetryConfig::new("first"));
        let second = init_with_config(&TelemetryConfig::new("second").with_json(true));
        assert_eq!(first, second);
        assert_eq!(OUTCOME.get(), Some(&first));
    }
}
