//! Instrument properties.
//!
//! An [`InstrumentProperty`] is a declarative accessor: a command address, a
//! codec, permission flags, an optional settle delay and an optional memo.
//! Properties are declared once per instrument class (typically as
//! `once_cell::sync::Lazy` statics) and applied to any node with
//! [`get`](InstrumentProperty::get) and [`set`](InstrumentProperty::set).
//!
//! ```
//! use scpi_core::{CommandAddress, InstrumentProperty, MockTransport, Session, ValueCodec};
//!
//! let scale = InstrumentProperty::new(
//!     "timebase",
//!     CommandAddress::from("TIMEBASE:SCALE"),
//!     ValueCodec::real(),
//! );
//!
//! let transport = MockTransport::new().with_reply("TIMEBASE:SCALE?", "1.000000E-03");
//! let session = Session::new("mock", transport.clone());
//!
//! assert_eq!(scale.get(&session).unwrap(), 1e-3);
//! scale.set(&session, 2e-3).unwrap();
//! assert_eq!(transport.writes(), vec!["TIMEBASE:SCALE 2.000000e-03"]);
//! ```

use crate::address::CommandAddress;
use crate::codec::ValueCodec;
use crate::error::{Access, ScpiError, ScpiResult};
use crate::node::Node;
use once_cell::sync::OnceCell;
use std::borrow::Cow;
use std::fmt;
use std::thread;
use std::time::Duration;
use tracing::trace;

/// Declarative accessor for one instrument setting.
pub struct InstrumentProperty<T> {
    name: Cow<'static, str>,
    address: CommandAddress,
    codec: ValueCodec<T>,
    readable: bool,
    writable: bool,
    delay: Option<Duration>,
    memoized: bool,
    memo: OnceCell<T>,
}

impl<T> InstrumentProperty<T> {
    /// A readable and writable property without delay or memo.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        address: impl Into<CommandAddress>,
        codec: ValueCodec<T>,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            codec,
            readable: true,
            writable: true,
            delay: None,
            memoized: false,
            memo: OnceCell::new(),
        }
    }

    /// Reject writes before any I/O.
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Reject reads before any I/O.
    pub fn write_only(mut self) -> Self {
        self.readable = false;
        self
    }

    /// Settle delay passed to queries and slept after writes.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Cache the first observed value and never query again.
    pub fn memoized(mut self) -> Self {
        self.memoized = true;
        self
    }

    /// Name used in permission errors and logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_readable(&self) -> bool {
        self.readable
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn codec(&self) -> &ValueCodec<T> {
        &self.codec
    }

    /// The memoized value, if one has been observed.
    pub fn cached(&self) -> Option<&T> {
        self.memo.get()
    }

    /// Read the property on `node`.
    ///
    /// # Errors
    ///
    /// - [`ScpiError::Permission`] for write-only properties, before any I/O
    /// - [`ScpiError::Parse`] when the reply does not match the codec
    /// - [`ScpiError::Transport`] unchanged from the transport
    pub fn get<N: Node + ?Sized>(&self, node: &N) -> ScpiResult<T>
    where
        T: Clone,
    {
        if !self.readable {
            return Err(ScpiError::permission(&self.name, Access::Read));
        }
        if !self.memoized {
            return self.query(node);
        }
        if let Some(value) = self.memo.get() {
            trace!(property = %self.name, "memoized value");
            return Ok(value.clone());
        }
        self.memo.get_or_try_init(|| self.query(node)).cloned()
    }

    /// Write `value` to the property on `node`.
    ///
    /// Validation and permission failures are raised before any I/O. A memoized
    /// property is seeded with `value` only if the write succeeded and nothing
    /// was cached yet.
    pub fn set<N: Node + ?Sized>(&self, node: &N, value: T) -> ScpiResult<()> {
        if !self.writable {
            return Err(ScpiError::permission(&self.name, Access::Write));
        }
        let formatted = self.codec.format(&value)?;
        let command = self
            .address
            .resolve(&node.address_vars())?
            .write_command(&formatted);

        node.session().write(&command)?;
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        if self.memoized {
            let _ = self.memo.set(value);
        }
        Ok(())
    }

    fn query<N: Node + ?Sized>(&self, node: &N) -> ScpiResult<T> {
        let command = self.address.resolve(&node.address_vars())?.query_command();
        let raw = node.session().query(&command, self.delay)?;
        self.codec.parse(&raw)
    }
}

impl<T> fmt::Debug for InstrumentProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentProperty")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("codec", &self.codec)
            .field("readable", &self.readable)
            .field("writable", &self.writable)
            .field("delay", &self.delay)
            .field("memoized", &self.memoized)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::mock::MockTransport;
    use crate::session::Session;

    fn session_with(transport: &MockTransport) -> Session {
        Session::new("mock", transport.clone())
    }

    #[test]
    fn delay_is_passed_to_query() {
        let transport = MockTransport::new().with_reply("ACQUIRE:SRATE?", "1.000000E+09");
        let session = session_with(&transport);
        let rate = InstrumentProperty::new("srate", "ACQUIRE:SRATE", ValueCodec::real())
            .read_only()
            .with_delay(Duration::from_millis(1));

        assert_eq!(rate.get(&session).unwrap(), 1e9);
        assert_eq!(
            transport.calls(),
            vec![crate::mock::MockCall::Query {
                command: "ACQUIRE:SRATE?".to_string(),
                delay: Some(Duration::from_millis(1)),
            }]
        );
    }

    #[test]
    fn validation_failure_sends_nothing() {
        let transport = MockTransport::new();
        let session = session_with(&transport);
        let scale = InstrumentProperty::new(
            "timebase",
            "TIMEBASE:SCALE",
            ValueCodec::real().with_range(1e-9, 1e3),
        );

        assert!(matches!(
            scale.set(&session, 1e6),
            Err(ScpiError::Validation(_))
        ));
        assert!(transport.calls().is_empty());
    }

    #[test]
    fn failed_write_does_not_seed_memo() {
        let transport = MockTransport::new();
        let session = session_with(&transport);
        let label = InstrumentProperty::new("label", "DISPLAY:LABEL", ValueCodec::text()).memoized();

        transport.trigger_failure();
        assert!(matches!(
            label.set(&session, "first".to_string()),
            Err(ScpiError::Transport(TransportError::Other(_)))
        ));
        assert!(label.cached().is_none());

        label.set(&session, "second".to_string()).unwrap();
        assert_eq!(label.cached().map(String::as_str), Some("second"));
        assert_eq!(label.get(&session).unwrap(), "second");
        assert_eq!(transport.query_count(), 0);
    }

    #[test]
    fn failed_read_leaves_memo_empty_and_property_usable() {
        let transport = MockTransport::new();
        let session = session_with(&transport);
        let model = InstrumentProperty::new("model", "SYSTEM:MODEL", ValueCodec::text())
            .read_only()
            .memoized();

        assert!(model.get(&session).is_err());
        assert!(model.cached().is_none());

        transport.set_reply("SYSTEM:MODEL?", "MSO5074");
        assert_eq!(model.get(&session).unwrap(), "MSO5074");
        assert_eq!(transport.query_count(), 2);
    }
}
