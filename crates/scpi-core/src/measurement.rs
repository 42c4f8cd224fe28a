//! Measurement nodes.
//!
//! A measurement is a named quantity computed by the instrument over one or
//! more sources, e.g. `VRMS` of `CHAN1` or `RRPHASE` between `CHAN1` and
//! `CHAN2`. Its descriptor `NAME,SRC1,SRC2` is spliced into command suffixes
//! through the `name`, `sources` and `descriptor` address variables.

use crate::node::{AddressVars, Node};
use crate::session::Session;
use std::borrow::Cow;
use std::fmt;

/// Ordered measurement sources. A single bare source becomes a one-element list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sources(Vec<String>);

impl Sources {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Sources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(","))
    }
}

impl From<&str> for Sources {
    fn from(source: &str) -> Self {
        Sources(vec![source.to_string()])
    }
}

impl From<String> for Sources {
    fn from(source: String) -> Self {
        Sources(vec![source])
    }
}

impl From<Vec<String>> for Sources {
    fn from(sources: Vec<String>) -> Self {
        Sources(sources)
    }
}

impl<const N: usize> From<[&str; N]> for Sources {
    fn from(sources: [&str; N]) -> Self {
        Sources(sources.iter().map(|s| s.to_string()).collect())
    }
}

/// Declared measurement: name plus sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementSpec {
    name: String,
    sources: Sources,
}

impl MeasurementSpec {
    pub fn new(name: impl Into<String>, sources: impl Into<Sources>) -> Self {
        Self {
            name: name.into(),
            sources: sources.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sources(&self) -> &Sources {
        &self.sources
    }

    /// `NAME,SRC1,SRC2,...`
    pub fn descriptor(&self) -> String {
        if self.sources.is_empty() {
            self.name.clone()
        } else {
            format!("{},{}", self.name, self.sources)
        }
    }
}

/// Measurement node under `parent`.
///
/// The parent is held by value: a reference to an instrument, or a channel
/// view, so per-channel measurements resolve through their channel.
pub struct Measurement<'a, P> {
    parent: P,
    spec: Cow<'a, MeasurementSpec>,
}

impl<'a, P> Measurement<'a, P> {
    /// Node for a measurement declared by the parent (eager, per-channel lists).
    pub fn borrowed(parent: P, spec: &'a MeasurementSpec) -> Self {
        Self {
            parent,
            spec: Cow::Borrowed(spec),
        }
    }

    /// Node for a measurement built on demand.
    pub fn owned(parent: P, spec: MeasurementSpec) -> Self {
        Self {
            parent,
            spec: Cow::Owned(spec),
        }
    }

    pub fn spec(&self) -> &MeasurementSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        self.spec.name()
    }

    pub fn parent(&self) -> &P {
        &self.parent
    }
}

impl<P: Node> Node for Measurement<'_, P> {
    fn session(&self) -> &Session {
        self.parent.session()
    }

    fn address_vars(&self) -> AddressVars {
        self.parent
            .address_vars()
            .with("name", self.spec.name())
            .with("sources", &self.spec.sources)
            .with("descriptor", self.spec.descriptor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Channel, ChannelSet};
    use crate::mock::MockTransport;

    #[test]
    fn bare_source_is_normalized() {
        let spec = MeasurementSpec::new("VRMS", "CHAN1");
        assert_eq!(spec.sources().as_slice(), ["CHAN1".to_string()]);
        assert_eq!(spec.descriptor(), "VRMS,CHAN1");
    }

    #[test]
    fn several_sources_keep_their_order() {
        let spec = MeasurementSpec::new("RRPHASE", ["CHAN2", "CHAN1"]);
        assert_eq!(spec.descriptor(), "RRPHASE,CHAN2,CHAN1");
    }

    #[test]
    fn measurement_inherits_parent_variables() {
        let session = Session::new("mock", MockTransport::new());
        let spec = MeasurementSpec::new("VPP", "CHAN3");
        let measurement = Measurement::borrowed(&session, &spec);

        let vars = measurement.address_vars();
        assert_eq!(vars.get("name"), Some("VPP"));
        assert_eq!(vars.get("sources"), Some("CHAN3"));
        assert_eq!(vars.get("descriptor"), Some("VPP,CHAN3"));
        assert!(std::ptr::eq(measurement.session(), &session));
    }

    #[test]
    fn measurement_under_channel_resolves_through_it() {
        let session = Session::new("mock", MockTransport::new());
        let channels = ChannelSet::new(2, |_| ());
        let second = Channel::new(&session, channels.get(2).unwrap());
        let spec = MeasurementSpec::new("VRMS", "CHAN2");
        let measurement = Measurement::borrowed(second, &spec);

        assert_eq!(measurement.parent().index(), 2);
        assert_eq!(measurement.address_vars().index(), Some(2));
        assert!(std::ptr::eq(measurement.session(), &session));
    }
}
