//! HostSight Common Library
//!
//! This crate provides shared types and utilities for the HostSight collector:
//!
//! - [`telemetry`] - Data model shared by the builder and the registry (`LabelSet`, `MetricPoint`, `CycleUpdate`)
//! - [`catalog`] - Declared metric names, help text and label schemas
//! - [`config`] - Logging settings shared by the binaries
//! - [`error`] - Error types

pub mod catalog;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at the crate root
pub use catalog::HostMetric;
pub use config::{LogFormat, LoggingConfig};
pub use error::{Error, Result};
pub use telemetry::{CycleUpdate, FamilyUpdate, LabelSet, MetricPoint, SeriesUpdate};

/// Initialize tracing with the given configuration.
///
/// Supports two output formats:
/// - `LogFormat::Text` (default): Human-readable text format
/// - `LogFormat::Json`: Structured JSON format for log aggregation systems
///
/// `RUST_LOG` takes precedence over the configured level.
///
/// # Example
///
/// ```ignore
/// use hostsight_common::{LoggingConfig, LogFormat, init_tracing};
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     format: LogFormat::Json,
/// };
/// init_tracing(&config)?;
/// ```
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
    }

    Ok(())
}
