//! Tracing setup for binaries and tests that host a coordinator.
//!
//! # Usage
//!
//! ```ignore
//! use redline_passes::telemetry::{self, TelemetryConfig};
//!
//! telemetry::init(TelemetryConfig::from_env("redline-review"));
//! tracing::info!("ready");
//! ```
//!
//! `RUST_LOG` overrides the default level, e.g. `RUST_LOG=redline::map=debug`
//! to see why issues were dropped.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer};

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name, logged once at startup.
    pub service_name: String,
    /// Console log level (default: INFO, DEBUG in debug builds)
    pub console_level: Level,
}

impl TelemetryConfig {
    /// Defaults for `service_name`. `RUST_LOG` is read at init time.
    pub fn from_env(service_name: impl Into<String>) -> Self {
        let console_level = if cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::INFO
        };

        Self {
            service_name: service_name.into(),
            console_level,
        }
    }
}

/// Install the console subscriber. Call once at startup.
///
/// Does nothing if a global subscriber is already set.
pub fn init(config: TelemetryConfig) {
    if let Err(e) = try_init(config) {
        tracing::debug!(error = %e, "tracing already initialized");
    }
}

/// Install the console subscriber, failing if one is already set.
pub fn try_init(config: TelemetryConfig) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.console_level.as_str().to_lowercase()));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_filter(env_filter);

    tracing_subscriber::registry().with(console_layer).try_init()?;

    tracing::debug!(service = %config.service_name, "telemetry initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_level() {
        let config = TelemetryConfig::from_env("test");
        assert_eq!(config.service_name, "test");
        if cfg!(debug_assertions) {
            assert_eq!(config.console_level, Level::DEBUG);
        }
    }

    #[test]
    fn test_second_init_is_harmless() {
        init(TelemetryConfig::from_env("first"));
        init(TelemetryConfig::from_env("second"));
        assert!(try_init(TelemetryConfig::from_env("third")).is_err());
    }
}
