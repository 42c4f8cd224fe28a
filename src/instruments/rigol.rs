//! Rigol MSO5000-series oscilloscope.
//!
//! Four analog channels, each carrying the full list of automatic
//! measurements over its own trace (`CHAN1`..`CHAN4`). Those measurements
//! hang off their channel; two-source measurements (phase, delay) span
//! channels and are built on demand from the instrument.
//!
//! Statistics are read with `MEASURE:STATISTIC:ITEM? <kind>,<descriptor>`
//! and only accumulate while the measurement is enabled and statistics are
//! switched on.

use super::{no_such_channel, Oscilloscope, Statistic};
use once_cell::sync::Lazy;
use scpi_core::{
    AddressVars, Channel, ChannelSet, Channelled, CommandAddress, InstrumentProperty,
    Measurement, MeasurementSpec, Node, ScpiError, ScpiResult, Segment, Session, ValueCodec,
};
use strum::{Display, EnumString};
use tracing::debug;

/// Automatic measurement items available on every channel.
pub const MEASUREMENT_ITEMS: [&str; 33] = [
    "VMAX", "VMIN", "VPP", "VTOP", "VBASE", "VAMP", "VAVG", "VRMS", "OVERSHOOT", "PRESHOOT",
    "MAREA", "MPAREA", "PERIOD", "FREQUENCY", "RTIME", "FTIME", "PWIDTH", "NWIDTH", "PDUTY",
    "NDUTY", "TVMAX", "TVMIN", "PSLEWRATE", "NSLEWRATE", "VUPPER", "VMID", "VLOWER", "VARIANCE",
    "PVRMS", "PPULSES", "NPULSES", "PEDGES", "NEDGES",
];

/// Horizontal divisions on screen.
pub const TIMEBASE_DIVISIONS: u32 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Coupling {
    #[strum(serialize = "AC")]
    Ac,
    #[strum(serialize = "DC")]
    Dc,
    #[strum(serialize = "GND")]
    Ground,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum BandwidthLimit {
    #[strum(serialize = "OFF")]
    Off,
    #[strum(serialize = "20M")]
    Mhz20,
    #[strum(serialize = "100M")]
    Mhz100,
    #[strum(serialize = "200M")]
    Mhz200,
}

/// Vertical unit of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ChannelUnits {
    #[strum(serialize = "VOLT")]
    Volt,
    #[strum(serialize = "WATT")]
    Watt,
    #[strum(serialize = "AMP")]
    Ampere,
    #[strum(serialize = "UNKN")]
    Unknown,
}

/// Statistic kinds kept per enabled measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum StatisticKind {
    #[strum(serialize = "CURR")]
    Current,
    #[strum(serialize = "MAX")]
    Maximum,
    #[strum(serialize = "MIN")]
    Minimum,
    #[strum(serialize = "AVER")]
    Average,
}

fn channel_command(leaf: &str) -> CommandAddress {
    CommandAddress::template(format!("CHANNEL{{n}}:{}", leaf))
}

static BWLIMIT: Lazy<InstrumentProperty<BandwidthLimit>> =
    Lazy::new(|| InstrumentProperty::new("bwlimit", channel_command("BWLIMIT"), ValueCodec::noop()));

static COUPLING: Lazy<InstrumentProperty<Coupling>> =
    Lazy::new(|| InstrumentProperty::new("coupling", channel_command("COUPLING"), ValueCodec::noop()));

static DISPLAY: Lazy<InstrumentProperty<bool>> =
    Lazy::new(|| InstrumentProperty::new("display", channel_command("DISPLAY"), ValueCodec::onoff()));

static INVERT: Lazy<InstrumentProperty<bool>> =
    Lazy::new(|| InstrumentProperty::new("invert", channel_command("INVERT"), ValueCodec::onoff()));

static OFFSET: Lazy<InstrumentProperty<f64>> =
    Lazy::new(|| InstrumentProperty::new("offset", channel_command("OFFSET"), ValueCodec::real()));

static TCALIBRATE: Lazy<InstrumentProperty<f64>> = Lazy::new(|| {
    InstrumentProperty::new("tcalibrate", channel_command("TCALIBRATE"), ValueCodec::real())
});

static SCALE: Lazy<InstrumentProperty<f64>> = Lazy::new(|| {
    InstrumentProperty::new(
        "scale",
        channel_command("SCALE"),
        ValueCodec::real().with_range(500e-6, 10.0),
    )
});

static PROBE: Lazy<InstrumentProperty<f64>> = Lazy::new(|| {
    InstrumentProperty::new(
        "probe",
        channel_command("PROBE"),
        ValueCodec::real().with_range(0.0001, 50_000.0),
    )
});

static UNITS: Lazy<InstrumentProperty<ChannelUnits>> =
    Lazy::new(|| InstrumentProperty::new("units", channel_command("UNITS"), ValueCodec::noop()));

static VERNIER: Lazy<InstrumentProperty<bool>> =
    Lazy::new(|| InstrumentProperty::new("vernier", channel_command("VERNIER"), ValueCodec::onoff()));

static POSITION: Lazy<InstrumentProperty<f64>> =
    Lazy::new(|| InstrumentProperty::new("position", channel_command("POSITION"), ValueCodec::real()));

static TIMEBASE: Lazy<InstrumentProperty<f64>> = Lazy::new(|| {
    InstrumentProperty::new(
        "timebase",
        "TIMEBASE:SCALE",
        ValueCodec::real().with_range(1e-9, 1e3),
    )
});

static STATISTICS: Lazy<InstrumentProperty<bool>> = Lazy::new(|| {
    InstrumentProperty::new("statistics", "MEASURE:STATISTIC:DISPLAY", ValueCodec::onoff())
});

// Written with the measurement's own descriptor as the value.
static ENABLE_ITEM: Lazy<InstrumentProperty<String>> = Lazy::new(|| {
    InstrumentProperty::new("enable", "MEASURE:ITEM", ValueCodec::text()).write_only()
});

fn statistic(kind: StatisticKind) -> InstrumentProperty<f64> {
    InstrumentProperty::new(
        kind.to_string(),
        CommandAddress::new("MEASURE:STATISTIC:ITEM")
            .with_suffix(Segment::template(format!("{},{{descriptor}}", kind))),
        ValueCodec::real(),
    )
    .read_only()
}

static STAT_CURRENT: Lazy<InstrumentProperty<f64>> =
    Lazy::new(|| statistic(StatisticKind::Current));
static STAT_MAXIMUM: Lazy<InstrumentProperty<f64>> =
    Lazy::new(|| statistic(StatisticKind::Maximum));
static STAT_MINIMUM: Lazy<InstrumentProperty<f64>> =
    Lazy::new(|| statistic(StatisticKind::Minimum));
static STAT_AVERAGE: Lazy<InstrumentProperty<f64>> =
    Lazy::new(|| statistic(StatisticKind::Average));

/// Which edge a two-source measurement triggers on, per source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

impl Edge {
    fn letter(self) -> char {
        match self {
            Edge::Rising => 'R',
            Edge::Falling => 'F',
        }
    }
}

/// Rigol MSO5000 oscilloscope.
pub struct RigolMso5 {
    session: Session,
    channels: ChannelSet<Vec<MeasurementSpec>>,
}

impl RigolMso5 {
    pub fn new(session: Session) -> Self {
        let channels = ChannelSet::new(Self::CHANNEL_COUNT, |index| {
            let source = format!("CHAN{}", index);
            MEASUREMENT_ITEMS
                .iter()
                .map(|item| MeasurementSpec::new(*item, source.as_str()))
                .collect()
        });
        debug!(resource = session.resource(), "Rigol MSO5 channels declared");
        Self { session, channels }
    }

    /// Channel `index`, or a validation error when out of range.
    pub fn ch(&self, index: usize) -> ScpiResult<ScopeChannel<'_>> {
        self.channel(index)
            .ok_or_else(|| no_such_channel(index, Self::CHANNEL_COUNT))
    }

    pub fn identity(&self) -> ScpiResult<String> {
        self.session.identity()
    }

    accessors! {
        /// Horizontal scale in seconds per division.
        timebase / set_timebase: f64 => TIMEBASE;
        /// Statistics display; statistics only accumulate while it is on.
        statistics / set_statistics: bool => STATISTICS;
    }

    pub fn reset_statistics(&self) -> ScpiResult<()> {
        self.session.write("MEASURE:STATISTIC:RESET")
    }

    /// Remove every enabled measurement.
    pub fn clear_measurements(&self) -> ScpiResult<()> {
        self.session.write("MEASURE:CLEAR")
    }

    pub fn autoscale(&self) -> ScpiResult<()> {
        self.session.write("AUTOSCALE")
    }

    /// Clear all waveforms on screen.
    pub fn clear(&self) -> ScpiResult<()> {
        self.session.write("CLEAR")
    }

    /// Phase of channel `b` relative to channel `a`.
    pub fn measure_phase(
        &self,
        a: usize,
        b: usize,
        edge_a: Edge,
        edge_b: Edge,
    ) -> ScpiResult<ScopeMeasurement<'_>> {
        self.two_source(a, b, edge_a, edge_b, "PHASE")
    }

    /// Delay of channel `b` relative to channel `a`.
    pub fn measure_delay(
        &self,
        a: usize,
        b: usize,
        edge_a: Edge,
        edge_b: Edge,
    ) -> ScpiResult<ScopeMeasurement<'_>> {
        self.two_source(a, b, edge_a, edge_b, "DELAY")
    }

    fn two_source(
        &self,
        a: usize,
        b: usize,
        edge_a: Edge,
        edge_b: Edge,
        quantity: &str,
    ) -> ScpiResult<ScopeMeasurement<'_>> {
        for index in [a, b] {
            if self.channels.get(index).is_none() {
                return Err(no_such_channel(index, Self::CHANNEL_COUNT));
            }
        }
        let name = format!("{}{}{}", edge_a.letter(), edge_b.letter(), quantity);
        let spec = MeasurementSpec::new(name, vec![format!("CHAN{}", a), format!("CHAN{}", b)]);
        Ok(ScopeMeasurement(Measurement::owned(
            MeasurementParent::Scope(self),
            spec,
        )))
    }
}

impl Node for RigolMso5 {
    fn session(&self) -> &Session {
        &self.session
    }
}

impl Channelled for RigolMso5 {
    const CHANNEL_COUNT: usize = 4;
    type Channel<'a> = ScopeChannel<'a>;

    fn channel(&self, index: usize) -> Option<ScopeChannel<'_>> {
        self.channels
            .get(index)
            .map(|slot| ScopeChannel(Channel::new(self, slot)))
    }
}

impl Oscilloscope for RigolMso5 {
    type Statistic<'a> = ScopeMeasurement<'a>;

    fn rms(&self, channel: usize) -> ScpiResult<ScopeMeasurement<'_>> {
        self.ch(channel)?.measurement("PVRMS")
    }

    fn phase(&self, channel_a: usize, channel_b: usize) -> ScpiResult<ScopeMeasurement<'_>> {
        self.measure_phase(channel_a, channel_b, Edge::Rising, Edge::Rising)
    }

    fn set_statistics(&self, enabled: bool) -> ScpiResult<()> {
        STATISTICS.set(self, enabled)
    }

    fn reset_statistics(&self) -> ScpiResult<()> {
        RigolMso5::reset_statistics(self)
    }

    fn clear_measurements(&self) -> ScpiResult<()> {
        RigolMso5::clear_measurements(self)
    }

    fn autoscale(&self) -> ScpiResult<()> {
        RigolMso5::autoscale(self)
    }
}

/// One analog channel of the scope.
#[derive(Clone, Copy)]
pub struct ScopeChannel<'a>(Channel<'a, RigolMso5, Vec<MeasurementSpec>>);

impl<'a> ScopeChannel<'a> {
    pub fn index(&self) -> usize {
        self.0.index()
    }

    accessors! {
        bwlimit / set_bwlimit: BandwidthLimit => BWLIMIT;
        coupling / set_coupling: Coupling => COUPLING;
        display / set_display: bool => DISPLAY;
        invert / set_invert: bool => INVERT;
        /// Vertical offset in volts.
        offset / set_offset: f64 => OFFSET;
        /// Probe delay calibration in seconds.
        tcalibrate / set_tcalibrate: f64 => TCALIBRATE;
        /// Vertical scale in volts per division.
        scale / set_scale: f64 => SCALE;
        /// Probe attenuation ratio.
        probe / set_probe: f64 => PROBE;
        units / set_units: ChannelUnits => UNITS;
        /// Fine vertical scale adjustment.
        vernier / set_vernier: bool => VERNIER;
        position / set_position: f64 => POSITION;
    }

    /// Declared measurement `name` on this channel (case-insensitive).
    pub fn measurement(&self, name: &str) -> ScpiResult<ScopeMeasurement<'a>> {
        self.0
            .data()
            .iter()
            .find(|spec| spec.name().eq_ignore_ascii_case(name))
            .map(|spec| ScopeMeasurement::on_channel(*self, spec))
            .ok_or_else(|| {
                ScpiError::Validation(format!(
                    "no measurement '{}' on channel {}",
                    name,
                    self.index()
                ))
            })
    }

    pub fn measurements(&self) -> impl Iterator<Item = ScopeMeasurement<'a>> + 'a {
        let channel = *self;
        self.0
            .data()
            .iter()
            .map(move |spec| ScopeMeasurement::on_channel(channel, spec))
    }
}

impl Node for ScopeChannel<'_> {
    fn session(&self) -> &Session {
        self.0.session()
    }

    fn address_vars(&self) -> AddressVars {
        self.0.address_vars()
    }
}

#[derive(Clone, Copy)]
enum MeasurementParent<'a> {
    Channel(ScopeChannel<'a>),
    Scope(&'a RigolMso5),
}

impl Node for MeasurementParent<'_> {
    fn session(&self) -> &Session {
        match self {
            MeasurementParent::Channel(channel) => channel.session(),
            MeasurementParent::Scope(scope) => scope.session(),
        }
    }

    fn address_vars(&self) -> AddressVars {
        match self {
            MeasurementParent::Channel(channel) => channel.address_vars(),
            MeasurementParent::Scope(scope) => scope.address_vars(),
        }
    }
}

/// An automatic measurement and its statistics.
pub struct ScopeMeasurement<'a>(Measurement<'a, MeasurementParent<'a>>);

impl<'a> ScopeMeasurement<'a> {
    fn on_channel(channel: ScopeChannel<'a>, spec: &'a MeasurementSpec) -> Self {
        ScopeMeasurement(Measurement::borrowed(MeasurementParent::Channel(channel), spec))
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    /// Index of the channel this measurement belongs to; `None` for
    /// measurements spanning two channels.
    pub fn channel(&self) -> Option<usize> {
        match self.0.parent() {
            MeasurementParent::Channel(channel) => Some(channel.index()),
            MeasurementParent::Scope(_) => None,
        }
    }

    /// `NAME,SRC1[,SRC2]` as sent to the instrument.
    pub fn descriptor(&self) -> String {
        self.0.spec().descriptor()
    }

    /// Add this measurement to the active list.
    pub fn enable(&self) -> ScpiResult<()> {
        ENABLE_ITEM.set(self, self.descriptor())
    }

    pub fn current(&self) -> ScpiResult<f64> {
        STAT_CURRENT.get(self)
    }

    pub fn max(&self) -> ScpiResult<f64> {
        STAT_MAXIMUM.get(self)
    }

    pub fn min(&self) -> ScpiResult<f64> {
        STAT_MINIMUM.get(self)
    }

    pub fn avg(&self) -> ScpiResult<f64> {
        STAT_AVERAGE.get(self)
    }
}

impl Node for ScopeMeasurement<'_> {
    fn session(&self) -> &Session {
        self.0.session()
    }

    fn address_vars(&self) -> AddressVars {
        self.0.address_vars()
    }
}

impl Statistic for ScopeMeasurement<'_> {
    fn enable(&self) -> ScpiResult<()> {
        ScopeMeasurement::enable(self)
    }

    fn average(&self) -> ScpiResult<f64> {
        self.avg()
    }
}
