//! `scpi-core`
//!
//! Typed property layer for SCPI instrument control.
//!
//! An instrument is a tree of [`Node`]s rooted at a [`Session`] that owns the
//! transport. Settings are declared once per instrument class as
//! [`InstrumentProperty`] or [`BoundProperty`] accessors and applied to any
//! node of the tree; the node supplies the variables its command address is
//! resolved against (channel index, measurement name and sources).
//!
//! ## Key Types
//!
//! - [`ValueCodec`]: wire text to typed value and back (NoOp, Pattern, Function)
//! - [`CommandAddress`]: mnemonic plus optional suffix, static or computed
//! - [`InstrumentProperty`]: one setting with permissions, settle delay and memo
//! - [`BoundProperty`]: one field of a combined command
//! - [`ChannelSet`] / [`Channel`]: fixed channel composition
//! - [`ScpiError`]: the single error type of every access
//!
//! ## Example
//!
//! ```rust
//! use scpi_core::{CommandAddress, InstrumentProperty, MockTransport, Session, ValueCodec};
//! # fn main() -> scpi_core::ScpiResult<()> {
//! let display = InstrumentProperty::new(
//!     "display",
//!     CommandAddress::template("CHANNEL{n}:DISPLAY"),
//!     ValueCodec::onoff(),
//! );
//!
//! let transport = MockTransport::new();
//! let session = Session::new("mock", transport.clone());
//! let channels = scpi_core::ChannelSet::new(2, |_| ());
//! let first = scpi_core::Channel::new(&session, channels.get(1).ok_or_else(|| {
//!     scpi_core::ScpiError::Validation("no channel 1".into())
//! })?);
//!
//! display.set(&first, true)?;
//! assert_eq!(transport.writes(), vec!["CHANNEL1:DISPLAY ON"]);
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod bound;
pub mod channel;
pub mod codec;
pub mod error;
pub mod measurement;
pub mod mock;
pub mod node;
pub mod pattern;
pub mod property;
pub mod session;
pub mod transport;

pub use address::{CommandAddress, ResolvedAddress, Segment};
pub use bound::{BoundProperty, CombinedReply};
pub use channel::{Channel, ChannelSet, ChannelSlot, Channelled};
pub use codec::ValueCodec;
pub use error::{Access, ScpiError, ScpiResult, TransportError};
pub use measurement::{Measurement, MeasurementSpec, Sources};
pub use mock::{MockCall, MockTransport};
pub use node::{AddressVars, Node};
pub use pattern::{Field, FieldValue, Parsed, PatternValue, ReplyPattern};
pub use property::InstrumentProperty;
pub use session::Session;
pub use transport::Transport;
