//! Bound properties.
//!
//! Some instruments pack several logical settings into one combined command.
//! The Siglent SDG family answers `C1:BSWV?` with
//!
//! ```text
//! C1:BSWV WVTP,SINE,FRQ,1000HZ,PERI,0.001S,AMP,2V,...
//! ```
//!
//! A [`BoundProperty`] addresses one field of such a reply, either by name
//! (alternating name/value pairs from an offset) or by position. Writes carry
//! only that field; the instrument keeps the others.

use crate::address::Segment;
use crate::codec::ValueCodec;
use crate::error::{Access, ScpiError, ScpiResult};
use crate::node::Node;
use std::borrow::Cow;
use std::fmt;

const COMBINED_SHAPE: &str = "<header> <field>,<value>,...";

/// A combined reply split into header and comma separated tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedReply {
    raw: String,
    header: String,
    tokens: Vec<String>,
}

impl CombinedReply {
    /// Split `raw` at the first space into header and body.
    pub fn parse(raw: &str) -> ScpiResult<Self> {
        let (header, body) = raw
            .trim()
            .split_once(' ')
            .ok_or_else(|| ScpiError::parse(raw, COMBINED_SHAPE, "reply has no header"))?;
        Ok(Self {
            raw: raw.to_string(),
            header: header.to_string(),
            tokens: body.split(',').map(|token| token.trim().to_string()).collect(),
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn positional(&self, offset: usize) -> Option<&str> {
        self.tokens.get(offset).map(String::as_str)
    }

    /// Value following `field` among the name/value pairs starting at `offset`.
    pub fn named(&self, field: &str, offset: usize) -> Option<&str> {
        self.tokens
            .get(offset..)?
            .chunks(2)
            .find(|pair| pair[0].eq_ignore_ascii_case(field))
            .and_then(|pair| pair.get(1))
            .map(String::as_str)
    }
}

/// One field of a combined command.
pub struct BoundProperty<T> {
    name: Cow<'static, str>,
    command: Segment,
    field: Option<Cow<'static, str>>,
    offset: usize,
    codec: ValueCodec<T>,
    readable: bool,
    writable: bool,
}

impl<T> BoundProperty<T> {
    /// Field looked up by `field` name among the name/value pairs.
    pub fn named(
        name: impl Into<Cow<'static, str>>,
        command: impl Into<Segment>,
        field: impl Into<Cow<'static, str>>,
        codec: ValueCodec<T>,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            field: Some(field.into()),
            offset: 0,
            codec,
            readable: true,
            writable: true,
        }
    }

    /// Field at a fixed token position; writes carry the bare value.
    pub fn positional(
        name: impl Into<Cow<'static, str>>,
        command: impl Into<Segment>,
        offset: usize,
        codec: ValueCodec<T>,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            field: None,
            offset,
            codec,
            readable: true,
            writable: true,
        }
    }

    /// Start the name/value pairs at token `offset`.
    pub fn at_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Reject writes.
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Reject reads, including [`fetch`](Self::fetch).
    pub fn write_only(mut self) -> Self {
        self.readable = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field name, or `None` for a positional field.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Read this field with one combined query.
    pub fn get<N: Node + ?Sized>(&self, node: &N) -> ScpiResult<T> {
        let reply = self.fetch(node)?;
        self.extract(&reply)
    }

    /// Issue the combined query once. Several properties sharing the command
    /// can then [`extract`](Self::extract) from the same reply.
    ///
    /// A write-only field fails with [`ScpiError::Permission`] before any I/O.
    pub fn fetch<N: Node + ?Sized>(&self, node: &N) -> ScpiResult<CombinedReply> {
        if !self.readable {
            return Err(ScpiError::permission(&self.name, Access::Read));
        }
        let command = self.command.resolve(&node.address_vars())?;
        let raw = node.session().query(&format!("{}?", command), None)?;
        CombinedReply::parse(&raw)
    }

    /// Decode this field from an already fetched reply.
    pub fn extract(&self, reply: &CombinedReply) -> ScpiResult<T> {
        if !self.readable {
            return Err(ScpiError::permission(&self.name, Access::Read));
        }
        let token = match &self.field {
            Some(field) => reply.named(field, self.offset).ok_or_else(|| {
                ScpiError::parse(
                    reply.raw(),
                    COMBINED_SHAPE,
                    format!("field '{}' not present", field),
                )
            })?,
            None => reply.positional(self.offset).ok_or_else(|| {
                ScpiError::parse(
                    reply.raw(),
                    COMBINED_SHAPE,
                    format!("no token at position {}", self.offset),
                )
            })?,
        };
        self.codec.parse(token)
    }

    /// Write this field alone: `CMD FIELD, VALUE` or `CMD VALUE`.
    pub fn set<N: Node + ?Sized>(&self, node: &N, value: T) -> ScpiResult<()> {
        if !self.writable {
            return Err(ScpiError::permission(&self.name, Access::Write));
        }
        let formatted = self.codec.format(&value)?;
        let command = self.command.resolve(&node.address_vars())?;
        let command = match &self.field {
            Some(field) => format!("{} {}, {}", command, field, formatted),
            None => format!("{} {}", command, formatted),
        };
        node.session().write(&command)
    }
}

impl<T> fmt::Debug for BoundProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundProperty")
            .field("name", &self.name)
            .field("command", &self.command)
            .field("field", &self.field)
            .field("offset", &self.offset)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use crate::session::Session;

    #[test]
    fn combined_reply_splits_header_and_tokens() {
        let reply = CombinedReply::parse("C1:OUTP ON,LOAD,HZ,PLRT,NOR\n").unwrap();
        assert_eq!(reply.header(), "C1:OUTP");
        assert_eq!(reply.positional(0), Some("ON"));
        assert_eq!(reply.named("LOAD", 1), Some("HZ"));
        assert_eq!(reply.named("PLRT", 1), Some("NOR"));
        assert_eq!(reply.named("PLRT", 0), None);
    }

    #[test]
    fn reply_without_header_is_parse_error() {
        assert!(matches!(
            CombinedReply::parse("WVTP,SINE"),
            Err(ScpiError::Parse { .. })
        ));
    }

    #[test]
    fn dangling_name_has_no_value() {
        let reply = CombinedReply::parse("C1:BSWV WVTP,SINE,FRQ").unwrap();
        assert_eq!(reply.named("FRQ", 0), None);
        assert_eq!(reply.named("wvtp", 0), Some("SINE"));
    }

    #[test]
    fn missing_field_is_parse_error() {
        let reply = CombinedReply::parse("C1:BSWV WVTP,DC,OFST,1V").unwrap();
        let amplitude = BoundProperty::named("amplitude", "C1:BSWV", "AMP", ValueCodec::fixed_with_unit("V"));
        match amplitude.extract(&reply) {
            Err(ScpiError::Parse { raw, reason, .. }) => {
                assert_eq!(raw, "C1:BSWV WVTP,DC,OFST,1V");
                assert!(reason.contains("AMP"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn write_only_field_is_never_queried() {
        let transport = MockTransport::new().with_reply("C1:BSWV?", "C1:BSWV WVTP,SINE");
        let session = Session::new("mock", transport.clone());
        let wave = BoundProperty::named("wave", "C1:BSWV", "WVTP", ValueCodec::text()).write_only();

        assert!(matches!(
            wave.fetch(&session),
            Err(ScpiError::Permission { access: Access::Read, .. })
        ));
        assert!(matches!(
            wave.get(&session),
            Err(ScpiError::Permission { access: Access::Read, .. })
        ));
        assert!(transport.calls().is_empty());

        wave.set(&session, "SQUARE".to_string()).unwrap();
        assert_eq!(transport.writes(), vec!["C1:BSWV WVTP, SQUARE"]);
    }

    #[test]
    fn read_only_field_is_never_written() {
        let transport = MockTransport::new();
        let session = Session::new("mock", transport.clone());
        let output = BoundProperty::positional("output", "C1:OUTP", 0, ValueCodec::onoff()).read_only();

        assert!(matches!(
            output.set(&session, true),
            Err(ScpiError::Permission { access: Access::Write, .. })
        ));
        assert!(transport.calls().is_empty());
    }
}
