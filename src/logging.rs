//! Tracing Infrastructure
//!
//! Initializes `tracing-subscriber` for the binary and for procedures run from
//! library code. The property layer emits:
//! - `info` when a session is opened or closed
//! - `debug` for every command sent to an instrument
//! - `trace` for every raw reply
//!
//! `RUST_LOG` overrides the configured level, e.g.
//! `RUST_LOG=scpi_core=trace` to see the wire traffic.
//!
//! # Example
//! ```no_run
//! use scpi_daq::{config::ScpiConfig, logging};
//! use tracing::info;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScpiConfig::load()?;
//! logging::init_from_config(&config)?;
//!
//! info!(instruments = config.instruments.len(), "Configuration loaded");
//! # Ok(())
//! # }
//! ```

use crate::config::ScpiConfig;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Output format for tracing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Pretty-printed format with colors (for development)
    #[default]
    Pretty,
    /// Compact single-line format without colors
    Compact,
    /// JSON format for structured logging
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(OutputFormat::Pretty),
            "compact" => Ok(OutputFormat::Compact),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!(
                "Invalid log format '{}'. Must be one of: pretty, compact, json",
                s
            )),
        }
    }
}

/// Tracing configuration options
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: Level,
    /// Output format
    pub format: OutputFormat,
    /// Whether to include file and line numbers
    pub with_file_and_line: bool,
    /// Whether to enable ANSI colors (only for Pretty format)
    pub with_ansi: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: OutputFormat::Pretty,
            with_file_and_line: false,
            with_ansi: true,
        }
    }
}

impl TracingConfig {
    /// Create tracing config from the application configuration
    pub fn from_config(config: &ScpiConfig) -> Result<Self, String> {
        Ok(Self {
            level: parse_log_level(&config.application.log_level)?,
            format: config.application.log_format.parse()?,
            ..Default::default()
        })
    }

    pub fn new(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.with_ansi = enabled;
        self
    }
}

/// Initialize tracing from the application configuration
pub fn init_from_config(config: &ScpiConfig) -> Result<(), String> {
    init(TracingConfig::from_config(config)?)
}

/// Initialize tracing with custom configuration
///
/// This function is idempotent - if tracing is already initialized, it
/// returns Ok(()) without error, so tests and libraries may call it freely.
pub fn init(config: TracingConfig) -> Result<(), String> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str().to_lowercase()));

    let layer = match config.format {
        OutputFormat::Pretty => fmt::layer()
            .pretty()
            .with_file(config.with_file_and_line)
            .with_line_number(config.with_file_and_line)
            .with_ansi(config.with_ansi)
            .with_filter(env_filter)
            .boxed(),
        OutputFormat::Compact => fmt::layer()
            .compact()
            .with_file(config.with_file_and_line)
            .with_line_number(config.with_file_and_line)
            .with_ansi(false)
            .with_filter(env_filter)
            .boxed(),
        OutputFormat::Json => fmt::layer()
            .json()
            .with_file(config.with_file_and_line)
            .with_line_number(config.with_file_and_line)
            .with_filter(env_filter)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .or_else(|e| {
            // Already initialized is expected in tests and when embedding
            if e.to_string().contains("a global default trace dispatcher has already been set") {
                Ok(())
            } else {
                Err(format!("Failed to initialize tracing: {}", e))
            }
        })
}

/// Parse log level string into tracing Level
pub fn parse_log_level(level: &str) -> Result<Level, String> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(format!(
            "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
            level
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert!(matches!(parse_log_level("trace"), Ok(Level::TRACE)));
        assert!(matches!(parse_log_level("warn"), Ok(Level::WARN)));

        // Case insensitive
        assert!(matches!(parse_log_level("INFO"), Ok(Level::INFO)));
        assert!(matches!(parse_log_level("Debug"), Ok(Level::DEBUG)));

        assert!(parse_log_level("verbose").is_err());
    }

    #[test]
    fn test_parse_output_format() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("compact".parse::<OutputFormat>(), Ok(OutputFormat::Compact));
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_tracing_config_from_config() {
        let mut config = ScpiConfig::default();
        config.application.log_level = "debug".to_string();
        config.application.log_format = "json".to_string();

        let tracing_config = TracingConfig::from_config(&config).unwrap();
        assert_eq!(tracing_config.level, Level::DEBUG);
        assert_eq!(tracing_config.format, OutputFormat::Json);
    }

    #[test]
    fn test_init_is_idempotent() {
        let config = TracingConfig::new(Level::WARN).with_format(OutputFormat::Compact);
        assert!(init(config.clone()).is_ok());
        assert!(init(config).is_ok());
    }
}
