//! Value codecs.
//!
//! A [`ValueCodec`] converts between wire text and a typed value. Each
//! direction is one of three strategies:
//!
//! - **NoOp**: the trimmed reply parsed with [`FromStr`], formatted with
//!   [`Display`].
//! - **Pattern**: a [`ReplyPattern`] such as `"{:e}"` or `"{:f}HZ"`.
//! - **Function**: an arbitrary pair of closures, used for asymmetric
//!   encodings like booleans that accept several tokens but emit one.
//!
//! Constraints (ranges, allowed choices, custom validators) run before
//! formatting, so an out-of-domain value never reaches the transport.

use crate::error::{ScpiError, ScpiResult};
use crate::pattern::{Field, Parsed, PatternValue, ReplyPattern};
use std::fmt::{self, Debug, Display};
use std::str::FromStr;
use std::sync::Arc;

/// Boxed parse closure of a function codec.
pub type ParseFn<T> = Arc<dyn Fn(&str) -> Result<T, String> + Send + Sync>;

/// Boxed format closure of a function codec.
pub type FormatFn<T> = Arc<dyn Fn(&T) -> Result<String, String> + Send + Sync>;

type Constraint<T> = Arc<dyn Fn(&T) -> Result<(), String> + Send + Sync>;

const NOOP_LABEL: &str = "<noop>";
const FUNCTION_LABEL: &str = "<function>";

enum Decode<T> {
    NoOp(fn(&str) -> Result<T, String>),
    Pattern {
        pattern: Arc<ReplyPattern>,
        convert: fn(Parsed) -> Result<T, String>,
    },
    Function {
        label: String,
        parse: ParseFn<T>,
    },
}

enum Encode<T> {
    NoOp(fn(&T) -> String),
    Pattern {
        pattern: Arc<ReplyPattern>,
        fields: fn(&T) -> Vec<Field>,
    },
    Function(FormatFn<T>),
}

impl<T> Clone for Decode<T> {
    fn clone(&self) -> Self {
        match self {
            Decode::NoOp(parse) => Decode::NoOp(*parse),
            Decode::Pattern { pattern, convert } => Decode::Pattern {
                pattern: Arc::clone(pattern),
                convert: *convert,
            },
            Decode::Function { label, parse } => Decode::Function {
                label: label.clone(),
                parse: Arc::clone(parse),
            },
        }
    }
}

impl<T> Clone for Encode<T> {
    fn clone(&self) -> Self {
        match self {
            Encode::NoOp(format) => Encode::NoOp(*format),
            Encode::Pattern { pattern, fields } => Encode::Pattern {
                pattern: Arc::clone(pattern),
                fields: *fields,
            },
            Encode::Function(format) => Encode::Function(Arc::clone(format)),
        }
    }
}

/// Bidirectional converter between wire text and `T`.
pub struct ValueCodec<T> {
    decode: Decode<T>,
    encode: Encode<T>,
    constraints: Vec<Constraint<T>>,
}

impl<T> Clone for ValueCodec<T> {
    fn clone(&self) -> Self {
        Self {
            decode: self.decode.clone(),
            encode: self.encode.clone(),
            constraints: self.constraints.clone(),
        }
    }
}

impl<T> Debug for ValueCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueCodec")
            .field("parse", &self.describe())
            .field("constraints", &self.constraints.len())
            .finish()
    }
}

impl<T: FromStr + Display> ValueCodec<T>
where
    T::Err: Display,
{
    /// Parse the trimmed reply with `FromStr`, format with `Display`.
    pub fn noop() -> Self {
        Self {
            decode: Decode::NoOp(|raw| raw.trim().parse::<T>().map_err(|e| e.to_string())),
            encode: Encode::NoOp(|value| value.to_string()),
            constraints: Vec::new(),
        }
    }
}

impl<T: PatternValue> ValueCodec<T> {
    /// One symmetric pattern for both directions.
    pub fn pattern(pattern: &str) -> Self {
        let pattern = Arc::new(ReplyPattern::new(pattern));
        Self {
            decode: Decode::Pattern {
                pattern: Arc::clone(&pattern),
                convert: T::from_parsed,
            },
            encode: Encode::Pattern {
                pattern,
                fields: T::to_fields,
            },
            constraints: Vec::new(),
        }
    }

    /// Separate patterns for parsing replies and formatting values.
    pub fn from_patterns(parse: &str, format: &str) -> Self {
        Self {
            decode: Decode::Pattern {
                pattern: Arc::new(ReplyPattern::new(parse)),
                convert: T::from_parsed,
            },
            encode: Encode::Pattern {
                pattern: Arc::new(ReplyPattern::new(format)),
                fields: T::to_fields,
            },
            constraints: Vec::new(),
        }
    }
}

impl<T> ValueCodec<T> {
    /// Two independent functions. Parse failures become [`ScpiError::Parse`],
    /// format failures [`ScpiError::Validation`].
    pub fn functions<P, F>(parse: P, format: F) -> Self
    where
        P: Fn(&str) -> Result<T, String> + Send + Sync + 'static,
        F: Fn(&T) -> Result<String, String> + Send + Sync + 'static,
    {
        Self {
            decode: Decode::Function {
                label: FUNCTION_LABEL.to_string(),
                parse: Arc::new(parse),
            },
            encode: Encode::Function(Arc::new(format)),
            constraints: Vec::new(),
        }
    }

    /// Name the accepted reply shape in parse errors of a function codec.
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        if let Decode::Function { label: current, .. } = &mut self.decode {
            *current = label.into();
        }
        self
    }

    /// Add a custom validation run before formatting.
    pub fn with_validator<V>(mut self, validator: V) -> Self
    where
        V: Fn(&T) -> Result<(), String> + Send + Sync + 'static,
    {
        self.constraints.push(Arc::new(validator));
        self
    }

    /// Restrict values to `[min, max]`.
    pub fn with_range(self, min: T, max: T) -> Self
    where
        T: PartialOrd + Display + Send + Sync + 'static,
    {
        self.with_validator(move |value| {
            let inside = *value >= min && *value <= max;
            if inside {
                Ok(())
            } else {
                Err(format!("{} is out of range [{}, {}]", value, min, max))
            }
        })
    }

    /// Restrict values to a fixed set.
    pub fn with_choices(self, choices: Vec<T>) -> Self
    where
        T: PartialEq + Debug + Send + Sync + 'static,
    {
        self.with_validator(move |value| {
            if choices.contains(value) {
                Ok(())
            } else {
                Err(format!("{:?} is not one of {:?}", value, choices))
            }
        })
    }

    /// Wire text to typed value.
    pub fn parse(&self, raw: &str) -> ScpiResult<T> {
        match &self.decode {
            Decode::NoOp(parse) => parse(raw).map_err(|reason| ScpiError::parse(raw, NOOP_LABEL, reason)),
            Decode::Pattern { pattern, convert } => {
                let parsed = pattern.parse(raw)?;
                convert(parsed).map_err(|reason| ScpiError::parse(raw, pattern.as_str(), reason))
            }
            Decode::Function { label, parse } => {
                parse(raw).map_err(|reason| ScpiError::parse(raw, label, reason))
            }
        }
    }

    /// Typed value to wire text. Fails with [`ScpiError::Validation`] before
    /// any I/O when the value is outside the codec's domain.
    pub fn format(&self, value: &T) -> ScpiResult<String> {
        self.validate(value)?;
        match &self.encode {
            Encode::NoOp(format) => Ok(format(value)),
            Encode::Pattern { pattern, fields } => pattern.format(&fields(value)),
            Encode::Function(format) => format(value).map_err(ScpiError::Validation),
        }
    }

    /// Run the constraints without formatting.
    pub fn validate(&self, value: &T) -> ScpiResult<()> {
        for constraint in &self.constraints {
            constraint(value).map_err(ScpiError::Validation)?;
        }
        Ok(())
    }

    /// Short description of the reply shape, used in diagnostics.
    pub fn describe(&self) -> &str {
        match &self.decode {
            Decode::NoOp(_) => NOOP_LABEL,
            Decode::Pattern { pattern, .. } => pattern.as_str(),
            Decode::Function { label, .. } => label,
        }
    }
}

impl ValueCodec<bool> {
    /// `ON`/`OFF` booleans. Parse also accepts `1`/`0`, case-insensitively.
    pub fn onoff() -> Self {
        Self::toggle(&["ON", "1"], &["OFF", "0"], "ON", "OFF")
    }

    /// Boolean with several accepted tokens per state and one canonical
    /// token emitted per state. Any other reply is a parse error.
    pub fn toggle(
        true_tokens: &'static [&'static str],
        false_tokens: &'static [&'static str],
        emit_true: &'static str,
        emit_false: &'static str,
    ) -> Self {
        let label = format!("{}|{}", true_tokens.join("/"), false_tokens.join("/"));
        Self::functions(
            move |raw| {
                let token = raw.trim();
                if true_tokens.iter().any(|t| t.eq_ignore_ascii_case(token)) {
                    Ok(true)
                } else if false_tokens.iter().any(|t| t.eq_ignore_ascii_case(token)) {
                    Ok(false)
                } else {
                    Err(format!("'{}' is not a recognised state", token))
                }
            },
            move |value| Ok(if *value { emit_true } else { emit_false }.to_string()),
        )
        .labeled(label)
    }
}

impl ValueCodec<i64> {
    pub fn integer() -> Self {
        Self::pattern("{:d}")
    }
}

impl ValueCodec<f64> {
    /// Scientific notation, `5.000000e-01`.
    pub fn real() -> Self {
        Self::pattern("{:e}")
    }

    /// Fixed point with six decimals.
    pub fn fixed() -> Self {
        Self::pattern("{:f}")
    }

    /// Fixed point followed directly by a unit, e.g. `1000.000000HZ`.
    pub fn fixed_with_unit(unit: &str) -> Self {
        Self::pattern(&format!("{{:f}}{}", unit))
    }

    /// Reject negative values.
    pub fn non_negative(self) -> Self {
        self.with_validator(|value| {
            if *value >= 0.0 {
                Ok(())
            } else {
                Err(format!("{} must not be negative", value))
            }
        })
    }
}

impl ValueCodec<String> {
    /// Trimmed text, emitted as given.
    pub fn text() -> Self {
        Self::noop()
    }
}
