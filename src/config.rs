//! Configuration System using Figment
//!
//! Configuration is loaded from:
//! 1. `config/scpi.toml` (base configuration)
//! 2. Environment variables prefixed with `SCPI_DAQ_`, nested keys split on `__`
//!
//! Every section has defaults, so an empty file is a valid configuration.
//!
//! # Example
//! ```no_run
//! use scpi_daq::config::ScpiConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScpiConfig::load()?;
//! config.validate()?;
//! for instrument in config.enabled_instruments() {
//!     println!("{} -> {}", instrument.id, instrument.resource);
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{AppError, AppResult};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/scpi.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "SCPI_DAQ_";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScpiConfig {
    /// Application settings
    pub application: ApplicationConfig,
    /// Transport settings shared by all instruments
    pub transport: TransportSettings,
    /// Frequency sweep parameters
    pub sweep: SweepSettings,
    /// Instrument definitions
    pub instruments: Vec<InstrumentDefinition>,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    pub log_format: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "scpi-daq".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

/// Transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Read/write timeout in milliseconds
    pub timeout_ms: u64,
    /// Terminator that ends every reply
    pub read_termination: String,
    /// Terminator appended to every command
    pub write_termination: String,
    /// Baud rate for serial resources
    pub baud_rate: u32,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 2000,
            read_termination: "\n".to_string(),
            write_termination: "\n".to_string(),
            baud_rate: 9600,
        }
    }
}

impl TransportSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Frequency sweep parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepSettings {
    /// Generator channel driving the device under test
    pub generator_channel: usize,
    /// Scope channel on the input of the device under test
    pub input_channel: usize,
    /// Scope channel on the output of the device under test
    pub output_channel: usize,
    /// Generator load in ohms
    pub load_ohms: u32,
    /// RMS drive below `band_edge_hz`
    pub low_band_vrms: f64,
    /// RMS drive at and above `band_edge_hz`
    pub high_band_vrms: f64,
    /// Frequency where the drive level drops
    pub band_edge_hz: f64,
    /// Wait after reprogramming the generator
    pub settle_ms: u64,
    /// Wait for statistics to accumulate
    pub measure_ms: u64,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            generator_channel: 1,
            input_channel: 1,
            output_channel: 2,
            load_ohms: 50,
            low_band_vrms: 3.535,
            high_band_vrms: 1.767,
            band_edge_hz: 20e6,
            settle_ms: 100,
            measure_ms: 8000,
        }
    }
}

impl SweepSettings {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn measure(&self) -> Duration {
        Duration::from_millis(self.measure_ms)
    }

    /// RMS drive target at `frequency`.
    pub fn target_vrms(&self, frequency: f64) -> f64 {
        if frequency < self.band_edge_hz {
            self.low_band_vrms
        } else {
            self.high_band_vrms
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        for (name, channel) in [
            ("generator_channel", self.generator_channel),
            ("input_channel", self.input_channel),
            ("output_channel", self.output_channel),
        ] {
            if channel == 0 {
                return Err(AppError::Configuration(format!(
                    "sweep.{} is 1-based, got 0",
                    name
                )));
            }
        }
        if self.input_channel == self.output_channel {
            return Err(AppError::Configuration(
                "sweep input and output channels must differ".to_string(),
            ));
        }
        if !(self.low_band_vrms > 0.0 && self.high_band_vrms > 0.0) {
            return Err(AppError::Configuration(
                "sweep drive levels must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Instrument dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    /// Rigol MSO5000 series oscilloscope
    RigolMso5,
    /// Siglent SDG series signal generator
    SiglentSdg,
}

/// Instrument definition in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentDefinition {
    /// Unique instrument identifier
    pub id: String,
    /// Instrument dialect
    pub driver: DriverKind,
    /// Resource string, e.g. `TCPIP0::192.168.1.10::5555::SOCKET`
    pub resource: String,
    /// Whether this instrument is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ScpiConfig {
    /// Load configuration from `config/scpi.toml` and environment variables
    ///
    /// Example override: `SCPI_DAQ_APPLICATION__LOG_LEVEL=debug`
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config: ScpiConfig = Figment::from(Serialized::defaults(ScpiConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        crate::logging::parse_log_level(&self.application.log_level)
            .map_err(AppError::Configuration)?;
        self.application
            .log_format
            .parse::<crate::logging::OutputFormat>()
            .map_err(AppError::Configuration)?;

        if self.transport.timeout_ms == 0 {
            return Err(AppError::Configuration(
                "transport.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.transport.read_termination.is_empty() || self.transport.write_termination.is_empty() {
            return Err(AppError::Configuration(
                "transport terminations must not be empty".to_string(),
            ));
        }

        self.sweep.validate()?;

        let mut ids = HashSet::new();
        for instrument in &self.instruments {
            if !ids.insert(&instrument.id) {
                return Err(AppError::Configuration(format!(
                    "Duplicate instrument ID: {}",
                    instrument.id
                )));
            }
            if instrument.resource.trim().is_empty() {
                return Err(AppError::Configuration(format!(
                    "Instrument '{}' has an empty resource",
                    instrument.id
                )));
            }
        }

        Ok(())
    }

    /// Get all enabled instruments
    pub fn enabled_instruments(&self) -> Vec<&InstrumentDefinition> {
        self.instruments.iter().filter(|inst| inst.enabled).collect()
    }

    /// Look up an instrument by id
    pub fn instrument(&self, id: &str) -> AppResult<&InstrumentDefinition> {
        self.instruments
            .iter()
            .find(|inst| inst.id == id)
            .ok_or_else(|| AppError::UnknownInstrument(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(id: &str, driver: DriverKind) -> InstrumentDefinition {
        InstrumentDefinition {
            id: id.to_string(),
            driver,
            resource: "TCPIP0::192.168.1.10::5555::SOCKET".to_string(),
            enabled: true,
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ScpiConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.transport.timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = ScpiConfig::default();
        config.application.log_level = "loud".to_string();
        assert!(matches!(config.validate(), Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = ScpiConfig::default();
        config.transport.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_instrument_ids() {
        let config = ScpiConfig {
            instruments: vec![
                definition("scope", DriverKind::RigolMso5),
                definition("scope", DriverKind::SiglentSdg),
            ],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_enabled_and_lookup() {
        let mut disabled = definition("siggen", DriverKind::SiglentSdg);
        disabled.enabled = false;
        let config = ScpiConfig {
            instruments: vec![definition("scope", DriverKind::RigolMso5), disabled],
            ..Default::default()
        };

        let enabled: Vec<&str> = config
            .enabled_instruments()
            .iter()
            .map(|inst| inst.id.as_str())
            .collect();
        assert_eq!(enabled, vec!["scope"]);
        assert_eq!(config.instrument("siggen").unwrap().driver, DriverKind::SiglentSdg);
        assert!(matches!(
            config.instrument("dmm"),
            Err(AppError::UnknownInstrument(_))
        ));
    }

    #[test]
    fn test_sweep_target_drops_at_band_edge() {
        let sweep = SweepSettings::default();
        assert_eq!(sweep.target_vrms(1e3), 3.535);
        assert_eq!(sweep.target_vrms(19.9e6), 3.535);
        assert_eq!(sweep.target_vrms(20e6), 1.767);
    }

    #[test]
    fn test_sweep_channels_must_differ() {
        let mut config = ScpiConfig::default();
        config.sweep.output_channel = config.sweep.input_channel;
        assert!(matches!(config.validate(), Err(AppError::Configuration(_))));

        config.sweep.output_channel = 0;
        assert!(config.validate().is_err());
    }
}
