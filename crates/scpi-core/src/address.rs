//! Command addresses.
//!
//! A [`CommandAddress`] is a mnemonic plus an optional suffix. Each part is a
//! [`Segment`]: fixed text, a template filled from the node's
//! [`AddressVars`] (`"CHANNEL{n}:SCALE"`), or a pure function of those
//! variables.

use crate::error::{ScpiError, ScpiResult};
use crate::node::AddressVars;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use strfmt::strfmt;

/// Pure function of a node's identity variables.
pub type SegmentFn = Arc<dyn Fn(&AddressVars) -> String + Send + Sync>;

/// One part of a command address.
#[derive(Clone)]
pub enum Segment {
    /// Fixed text.
    Static(Cow<'static, str>),
    /// `strfmt` template over the node's variables, e.g. `"C{n}:BSWV"`.
    Template(String),
    /// Computed from the node's variables.
    Function(SegmentFn),
}

impl Segment {
    pub fn template(template: impl Into<String>) -> Self {
        Segment::Template(template.into())
    }

    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&AddressVars) -> String + Send + Sync + 'static,
    {
        Segment::Function(Arc::new(f))
    }

    /// Resolve against `vars`. A template naming a variable the node does not
    /// expose is a declaration error.
    pub fn resolve(&self, vars: &AddressVars) -> ScpiResult<String> {
        match self {
            Segment::Static(text) => Ok(text.to_string()),
            Segment::Template(template) => strfmt(template, vars.as_map())
                .map_err(|e| ScpiError::declaration(template, e.to_string())),
            Segment::Function(f) => Ok(f(vars)),
        }
    }
}

impl From<&'static str> for Segment {
    fn from(text: &'static str) -> Self {
        Segment::Static(Cow::Borrowed(text))
    }
}

impl From<String> for Segment {
    fn from(text: String) -> Self {
        Segment::Static(Cow::Owned(text))
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Static(text) => write!(f, "Static({:?})", text),
            Segment::Template(template) => write!(f, "Template({:?})", template),
            Segment::Function(_) => write!(f, "Function(..)"),
        }
    }
}

/// Mnemonic plus optional suffix.
#[derive(Debug, Clone)]
pub struct CommandAddress {
    mnemonic: Segment,
    suffix: Option<Segment>,
}

impl CommandAddress {
    pub fn new(mnemonic: impl Into<Segment>) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            suffix: None,
        }
    }

    /// Mnemonic given as a template, e.g. `"CHANNEL{n}:SCALE"`.
    pub fn template(template: impl Into<String>) -> Self {
        Self::new(Segment::template(template))
    }

    pub fn with_suffix(mut self, suffix: impl Into<Segment>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn resolve(&self, vars: &AddressVars) -> ScpiResult<ResolvedAddress> {
        let mnemonic = self.mnemonic.resolve(vars)?;
        let suffix = self
            .suffix
            .as_ref()
            .map(|suffix| suffix.resolve(vars))
            .transpose()?;
        Ok(ResolvedAddress { mnemonic, suffix })
    }
}

impl From<&'static str> for CommandAddress {
    fn from(mnemonic: &'static str) -> Self {
        Self::new(mnemonic)
    }
}

/// A command address resolved for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress {
    pub mnemonic: String,
    pub suffix: Option<String>,
}

impl ResolvedAddress {
    /// `MNEMONIC?` followed by ` SUFFIX` when present.
    pub fn query_command(&self) -> String {
        match &self.suffix {
            Some(suffix) => format!("{}? {}", self.mnemonic, suffix),
            None => format!("{}?", self.mnemonic),
        }
    }

    /// `MNEMONIC[ SUFFIX] VALUE`.
    pub fn write_command(&self, value: &str) -> String {
        match &self.suffix {
            Some(suffix) => format!("{} {} {}", self.mnemonic, suffix, value),
            None => format!("{} {}", self.mnemonic, value),
        }
    }
}
