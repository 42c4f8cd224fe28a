//! Instrument dialects and capability traits.
//!
//! Concrete instruments compose a [`Session`] with a [`ChannelSet`] and
//! implement the capability traits that describe what they can do. Procedures
//! are written against the traits, never against a concrete dialect.
//!
//! [`ChannelSet`]: scpi_core::ChannelSet

/// Typed getter/setter pairs forwarding to declared property statics.
macro_rules! accessors {
    ($( $(#[$meta:meta])* $get:ident / $set:ident : $ty:ty => $prop:ident; )*) => {$(
        $(#[$meta])*
        pub fn $get(&self) -> scpi_core::ScpiResult<$ty> {
            $prop.get(self)
        }

        $(#[$meta])*
        pub fn $set(&self, value: $ty) -> scpi_core::ScpiResult<()> {
            $prop.set(self, value)
        }
    )*};
}

pub mod rigol;
pub mod siglent;

pub use rigol::RigolMso5;
pub use siglent::SiglentSdg;

use crate::config::{DriverKind, InstrumentDefinition, TransportSettings};
use crate::error::AppResult;
use scpi_core::{Channelled, Node, ScpiError, ScpiResult, Session};
use std::fmt;
use std::str::FromStr;

/// A measurement whose running statistics the instrument maintains.
pub trait Statistic {
    /// Add the measurement to the instrument's active list.
    fn enable(&self) -> ScpiResult<()>;

    /// Average over all samples since the statistics were last reset.
    fn average(&self) -> ScpiResult<f64>;
}

/// Oscilloscope capabilities used by procedures.
pub trait Oscilloscope: Channelled {
    type Statistic<'a>: Statistic
    where
        Self: 'a;

    /// Per-period RMS voltage of `channel`.
    fn rms(&self, channel: usize) -> ScpiResult<Self::Statistic<'_>>;

    /// Phase of `channel_b` relative to `channel_a`, rising edges.
    fn phase(&self, channel_a: usize, channel_b: usize) -> ScpiResult<Self::Statistic<'_>>;

    fn set_statistics(&self, enabled: bool) -> ScpiResult<()>;
    fn reset_statistics(&self) -> ScpiResult<()>;
    fn clear_measurements(&self) -> ScpiResult<()>;
    fn autoscale(&self) -> ScpiResult<()>;
}

/// Output termination of a generator channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Load {
    /// Terminated into the given resistance in ohms.
    Ohms(u32),
    /// High impedance.
    HighZ,
}

impl fmt::Display for Load {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Load::Ohms(ohms) => write!(f, "{}", ohms),
            Load::HighZ => write!(f, "HZ"),
        }
    }
}

impl FromStr for Load {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("HZ") {
            return Ok(Load::HighZ);
        }
        s.parse::<u32>()
            .map(Load::Ohms)
            .map_err(|_| format!("'{}' is not a load (ohms or HZ)", s))
    }
}

/// Signal generator capabilities used by procedures.
pub trait SignalGenerator: Channelled {
    fn set_output(&self, channel: usize, enabled: bool) -> ScpiResult<()>;
    fn set_frequency(&self, channel: usize, hertz: f64) -> ScpiResult<()>;
    fn set_load(&self, channel: usize, load: Load) -> ScpiResult<()>;
    fn set_rms_amplitude(&self, channel: usize, volts: f64) -> ScpiResult<()>;
}

/// Error for a channel index outside `1..=count`.
pub(crate) fn no_such_channel(index: usize, count: usize) -> ScpiError {
    ScpiError::Validation(format!(
        "channel {} does not exist (valid: 1..={})",
        index, count
    ))
}

/// Any configured instrument.
pub enum AnyInstrument {
    Scope(RigolMso5),
    Generator(SiglentSdg),
}

impl AnyInstrument {
    /// Open the transport named by `definition` and build the instrument.
    pub fn connect(definition: &InstrumentDefinition, settings: &TransportSettings) -> AppResult<Self> {
        let transport = crate::transport::open(&definition.resource, settings)?;
        let session = Session::from_boxed(definition.resource.clone(), transport);
        Ok(match definition.driver {
            DriverKind::RigolMso5 => AnyInstrument::Scope(RigolMso5::new(session)),
            DriverKind::SiglentSdg => AnyInstrument::Generator(SiglentSdg::new(session)),
        })
    }

    pub fn channel_count(&self) -> usize {
        match self {
            AnyInstrument::Scope(_) => RigolMso5::CHANNEL_COUNT,
            AnyInstrument::Generator(_) => SiglentSdg::CHANNEL_COUNT,
        }
    }
}

impl Node for AnyInstrument {
    fn session(&self) -> &Session {
        match self {
            AnyInstrument::Scope(scope) => scope.session(),
            AnyInstrument::Generator(generator) => generator.session(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_tokens() {
        assert_eq!("50".parse::<Load>(), Ok(Load::Ohms(50)));
        assert_eq!("hz".parse::<Load>(), Ok(Load::HighZ));
        assert_eq!(Load::HighZ.to_string(), "HZ");
        assert_eq!(Load::Ohms(50).to_string(), "50");
        assert!("fifty".parse::<Load>().is_err());
    }

    #[test]
    fn test_connect_rejects_bad_resource() {
        let definition = InstrumentDefinition {
            id: "scope".to_string(),
            driver: DriverKind::RigolMso5,
            resource: "GPIB0::7::INSTR".to_string(),
            enabled: true,
        };
        let result = AnyInstrument::connect(&definition, &TransportSettings::default());
        assert!(matches!(
            result,
            Err(crate::error::AppError::Instrument(ScpiError::Connection { .. }))
        ));
    }
}
