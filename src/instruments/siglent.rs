//! Siglent SDG-series function generator.
//!
//! Waveform settings live in one combined command per channel:
//!
//! ```text
//! C1:BSWV? -> C1:BSWV WVTP,SINE,FRQ,1000HZ,PERI,0.001S,AMP,2V,AMPVRMS,0.707Vrms,OFST,0V,...
//! C1:OUTP? -> C1:OUTP ON,LOAD,HZ,PLRT,NOR
//! ```
//!
//! Every field is a [`BoundProperty`]; writes carry one field each.

use super::{no_such_channel, Load, SignalGenerator};
use once_cell::sync::Lazy;
use scpi_core::{
    AddressVars, BoundProperty, Channel, ChannelSet, Channelled, CombinedReply, Node, ScpiResult,
    Session, ValueCodec,
};
use strum::{Display, EnumString};
use tracing::debug;

const BASIC_WAVE: &str = "C{n}:BSWV";
const OUTPUT: &str = "C{n}:OUTP";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Waveform {
    Sine,
    Square,
    Ramp,
    Pulse,
    Noise,
    Arb,
    Dc,
    Prbs,
    Iq,
}

fn bswv_field<T>(name: &'static str, field: &'static str, codec: ValueCodec<T>) -> BoundProperty<T> {
    BoundProperty::named(name, BASIC_WAVE, field, codec)
}

fn volts() -> ValueCodec<f64> {
    ValueCodec::fixed_with_unit("V")
}

static WAVEFORM: Lazy<BoundProperty<Waveform>> =
    Lazy::new(|| bswv_field("waveform", "WVTP", ValueCodec::noop()));

static FREQUENCY: Lazy<BoundProperty<f64>> = Lazy::new(|| {
    bswv_field(
        "frequency",
        "FRQ",
        ValueCodec::fixed_with_unit("HZ").non_negative(),
    )
});

static AMPLITUDE: Lazy<BoundProperty<f64>> =
    Lazy::new(|| bswv_field("amplitude", "AMP", volts().non_negative()));

static RMS_AMPLITUDE: Lazy<BoundProperty<f64>> = Lazy::new(|| {
    bswv_field(
        "rms_amplitude",
        "AMPVRMS",
        ValueCodec::fixed_with_unit("Vrms").non_negative(),
    )
});

static PHASE: Lazy<BoundProperty<f64>> =
    Lazy::new(|| bswv_field("phase", "PHSE", ValueCodec::fixed()));

static OFFSET: Lazy<BoundProperty<f64>> = Lazy::new(|| bswv_field("offset", "OFST", volts()));

static LOW_LEVEL: Lazy<BoundProperty<f64>> =
    Lazy::new(|| bswv_field("low_level", "LLEV", volts()));

static HIGH_LEVEL: Lazy<BoundProperty<f64>> =
    Lazy::new(|| bswv_field("high_level", "HLEV", volts()));

static OUTPUT_ENABLED: Lazy<BoundProperty<bool>> =
    Lazy::new(|| BoundProperty::positional("output", OUTPUT, 0, ValueCodec::onoff()));

static LOAD: Lazy<BoundProperty<Load>> = Lazy::new(|| {
    BoundProperty::named("load", OUTPUT, "LOAD", ValueCodec::noop()).at_offset(1)
});

static INVERTED: Lazy<BoundProperty<bool>> = Lazy::new(|| {
    BoundProperty::named(
        "inverted",
        OUTPUT,
        "PLRT",
        ValueCodec::toggle(&["INVT"], &["NOR"], "INVT", "NOR"),
    )
    .at_offset(1)
});

/// Basic wave settings decoded from a single `BSWV?` reply.
///
/// Fields the current waveform does not report (a DC wave has no frequency)
/// are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicWave {
    pub waveform: Waveform,
    pub frequency: Option<f64>,
    pub amplitude: Option<f64>,
    pub rms_amplitude: Option<f64>,
    pub offset: Option<f64>,
    pub phase: Option<f64>,
}

/// Siglent SDG function generator.
pub struct SiglentSdg {
    session: Session,
    channels: ChannelSet,
}

impl SiglentSdg {
    pub fn new(session: Session) -> Self {
        debug!(resource = session.resource(), "Siglent SDG channels declared");
        Self {
            session,
            channels: ChannelSet::new(Self::CHANNEL_COUNT, |_| ()),
        }
    }

    /// Channel `index`, or a validation error when out of range.
    pub fn ch(&self, index: usize) -> ScpiResult<GeneratorChannel<'_>> {
        self.channel(index)
            .ok_or_else(|| no_such_channel(index, Self::CHANNEL_COUNT))
    }

    pub fn identity(&self) -> ScpiResult<String> {
        self.session.identity()
    }
}

impl Node for SiglentSdg {
    fn session(&self) -> &Session {
        &self.session
    }
}

impl Channelled for SiglentSdg {
    const CHANNEL_COUNT: usize = 2;
    type Channel<'a> = GeneratorChannel<'a>;

    fn channel(&self, index: usize) -> Option<GeneratorChannel<'_>> {
        self.channels
            .get(index)
            .map(|slot| GeneratorChannel(Channel::new(self, slot)))
    }
}

impl SignalGenerator for SiglentSdg {
    fn set_output(&self, channel: usize, enabled: bool) -> ScpiResult<()> {
        self.ch(channel)?.set_output(enabled)
    }

    fn set_frequency(&self, channel: usize, hertz: f64) -> ScpiResult<()> {
        self.ch(channel)?.set_frequency(hertz)
    }

    fn set_load(&self, channel: usize, load: Load) -> ScpiResult<()> {
        self.ch(channel)?.set_load(load)
    }

    fn set_rms_amplitude(&self, channel: usize, volts: f64) -> ScpiResult<()> {
        self.ch(channel)?.set_rms_amplitude(volts)
    }
}

/// One output channel of the generator.
#[derive(Clone, Copy)]
pub struct GeneratorChannel<'a>(Channel<'a, SiglentSdg>);

impl GeneratorChannel<'_> {
    pub fn index(&self) -> usize {
        self.0.index()
    }

    accessors! {
        waveform / set_waveform: Waveform => WAVEFORM;
        /// Frequency in hertz.
        frequency / set_frequency: f64 => FREQUENCY;
        /// Peak-to-peak amplitude in volts.
        amplitude / set_amplitude: f64 => AMPLITUDE;
        /// RMS amplitude in volts.
        rms_amplitude / set_rms_amplitude: f64 => RMS_AMPLITUDE;
        /// Phase in degrees.
        phase / set_phase: f64 => PHASE;
        offset / set_offset: f64 => OFFSET;
        low_level / set_low_level: f64 => LOW_LEVEL;
        high_level / set_high_level: f64 => HIGH_LEVEL;
        output / set_output: bool => OUTPUT_ENABLED;
        load / set_load: Load => LOAD;
        /// Output polarity.
        inverted / set_inverted: bool => INVERTED;
    }

    /// Read the basic wave settings with one query.
    pub fn basic_wave(&self) -> ScpiResult<BasicWave> {
        let reply = WAVEFORM.fetch(self)?;
        Ok(BasicWave {
            waveform: WAVEFORM.extract(&reply)?,
            frequency: reported(&FREQUENCY, &reply)?,
            amplitude: reported(&AMPLITUDE, &reply)?,
            rms_amplitude: reported(&RMS_AMPLITUDE, &reply)?,
            offset: reported(&OFFSET, &reply)?,
            phase: reported(&PHASE, &reply)?,
        })
    }
}

fn reported(property: &BoundProperty<f64>, reply: &CombinedReply) -> ScpiResult<Option<f64>> {
    match property.field() {
        Some(field) if reply.named(field, 0).is_some() => property.extract(reply).map(Some),
        _ => Ok(None),
    }
}

impl Node for GeneratorChannel<'_> {
    fn session(&self) -> &Session {
        self.0.session()
    }

    fn address_vars(&self) -> AddressVars {
        self.0.address_vars()
    }
}
