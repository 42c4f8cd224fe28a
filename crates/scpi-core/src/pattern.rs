//! Reply patterns.
//!
//! A reply pattern is a friendly format string such as `"{:e}"`,
//! `"{:f}HZ"` or `"{:d},{}"`. The same pattern parses a reply into fields and
//! formats fields back into wire text.
//!
//! Placeholders:
//!
//! | Placeholder | Parses              | Formats as                    |
//! |-------------|---------------------|-------------------------------|
//! | `{}`        | any text (shortest) | natural string form           |
//! | `{:d}`      | signed integer      | decimal integer               |
//! | `{:f}`      | real number         | fixed point, 6 decimals       |
//! | `{:e}`      | real number         | `5.000000e-01`                |
//! | `{:g}`      | real number         | 6 significant digits          |
//!
//! Literal text matches case-insensitively. `{{` and `}}` escape braces. All
//! real placeholders accept any real notation on parse, since instruments
//! answer `1000HZ` as readily as `1.000000E+03HZ`.
//!
//! Patterns are compiled to a [`Regex`] on first use; a malformed pattern is
//! reported as [`ScpiError::Declaration`] at that point.

use crate::error::{ScpiError, ScpiResult};
use once_cell::sync::OnceCell;
use regex::Regex;
use std::fmt;

const INTEGER_REGEX: &str = r"([-+]?\d+)";
const REAL_REGEX: &str = r"([-+]?(?:(?:\d+\.?\d*|\.\d+)(?:e[-+]?\d+)?|nan|inf(?:inity)?))";
const ANY_REGEX: &str = r"(.+?)";

/// Number of significant digits used by `{:g}` and decimals used by `{:f}`/`{:e}`.
const PRECISION: usize = 6;

/// One value extracted from (or destined for) a reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Field {
    /// Numeric value of the field, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Field::Int(value) => Some(*value as f64),
            Field::Float(value) => Some(*value),
            Field::Text(_) => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int(value) => write!(f, "{}", value),
            Field::Float(value) => write!(f, "{}", value),
            Field::Text(value) => write!(f, "{}", value),
        }
    }
}

/// Result of parsing a reply: a single value, or an ordered tuple when the
/// pattern extracted more than one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    Scalar(Field),
    Tuple(Vec<Field>),
}

impl Parsed {
    /// Number of extracted fields.
    pub fn len(&self) -> usize {
        match self {
            Parsed::Scalar(_) => 1,
            Parsed::Tuple(fields) => fields.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_fields(self) -> Vec<Field> {
        match self {
            Parsed::Scalar(field) => vec![field],
            Parsed::Tuple(fields) => fields,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Any,
    Integer,
    Fixed,
    Exponent,
    General,
}

impl Conversion {
    fn from_spec(spec: &str) -> Option<Self> {
        match spec {
            "" => Some(Conversion::Any),
            ":d" => Some(Conversion::Integer),
            ":f" => Some(Conversion::Fixed),
            ":e" => Some(Conversion::Exponent),
            ":g" => Some(Conversion::General),
            _ => None,
        }
    }

    fn regex(self) -> &'static str {
        match self {
            Conversion::Any => ANY_REGEX,
            Conversion::Integer => INTEGER_REGEX,
            Conversion::Fixed | Conversion::Exponent | Conversion::General => REAL_REGEX,
        }
    }

    fn read(self, text: &str) -> Result<Field, String> {
        match self {
            Conversion::Any => Ok(Field::Text(text.to_string())),
            Conversion::Integer => text
                .parse::<i64>()
                .map(Field::Int)
                .map_err(|e| format!("'{}' is not an integer: {}", text, e)),
            Conversion::Fixed | Conversion::Exponent | Conversion::General => text
                .parse::<f64>()
                .map(Field::Float)
                .map_err(|e| format!("'{}' is not a real number: {}", text, e)),
        }
    }

    fn write(self, field: &Field) -> Result<String, String> {
        if self == Conversion::Any {
            return Ok(field.to_string());
        }
        if self == Conversion::Integer {
            return match field {
                Field::Int(value) => Ok(value.to_string()),
                other => Err(format!("expected an integer, got '{}'", other)),
            };
        }

        let value = field
            .as_f64()
            .ok_or_else(|| format!("expected a number, got '{}'", field))?;
        if !value.is_finite() {
            return Err(format!("{} cannot be represented on the wire", value));
        }
        Ok(match self {
            Conversion::Fixed => format!("{:.*}", PRECISION, value),
            Conversion::Exponent => exponent_notation(value),
            _ => general_notation(value),
        })
    }
}

#[derive(Debug, Clone)]
enum Piece {
    Literal(String),
    Placeholder(Conversion),
}

#[derive(Debug, Clone)]
struct Compiled {
    pieces: Vec<Piece>,
    regex: Regex,
}

impl Compiled {
    fn conversions(&self) -> impl Iterator<Item = Conversion> + '_ {
        self.pieces.iter().filter_map(|piece| match piece {
            Piece::Placeholder(conversion) => Some(*conversion),
            Piece::Literal(_) => None,
        })
    }
}

/// A bidirectional reply pattern, e.g. `"{:f}HZ"`.
#[derive(Debug, Clone)]
pub struct ReplyPattern {
    source: String,
    compiled: OnceCell<Result<Compiled, String>>,
}

impl ReplyPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            source: pattern.into(),
            compiled: OnceCell::new(),
        }
    }

    /// The pattern text as declared.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Compile the pattern now, reporting syntax errors eagerly.
    pub fn validate(&self) -> ScpiResult<()> {
        self.compiled().map(|_| ())
    }

    /// Number of placeholders in the pattern.
    pub fn field_count(&self) -> ScpiResult<usize> {
        Ok(self.compiled()?.conversions().count())
    }

    /// Parse `raw` (trimmed) into its fields.
    pub fn parse(&self, raw: &str) -> ScpiResult<Parsed> {
        let compiled = self.compiled()?;
        let captures = compiled
            .regex
            .captures(raw.trim())
            .ok_or_else(|| ScpiError::parse(raw, &self.source, "reply does not match"))?;

        let mut fields = Vec::new();
        for (group, conversion) in compiled.conversions().enumerate() {
            let text = captures
                .get(group + 1)
                .map(|m| m.as_str())
                .ok_or_else(|| ScpiError::parse(raw, &self.source, "missing capture"))?;
            let field = conversion
                .read(text)
                .map_err(|reason| ScpiError::parse(raw, &self.source, reason))?;
            fields.push(field);
        }

        match fields.len() {
            0 => Err(ScpiError::parse(
                raw,
                &self.source,
                "pattern extracted no fields",
            )),
            1 => Ok(Parsed::Scalar(fields.remove(0))),
            _ => Ok(Parsed::Tuple(fields)),
        }
    }

    /// Format `fields` into wire text.
    pub fn format(&self, fields: &[Field]) -> ScpiResult<String> {
        let compiled = self.compiled()?;
        let expected = compiled.conversions().count();
        if fields.len() != expected {
            return Err(ScpiError::Validation(format!(
                "pattern '{}' expects {} field(s), got {}",
                self.source,
                expected,
                fields.len()
            )));
        }

        let mut values = fields.iter();
        let mut output = String::new();
        for piece in &compiled.pieces {
            match piece {
                Piece::Literal(text) => output.push_str(text),
                Piece::Placeholder(conversion) => {
                    let field = values.next().ok_or_else(|| {
                        ScpiError::Validation(format!("pattern '{}' ran out of fields", self.source))
                    })?;
                    let text = conversion.write(field).map_err(|reason| {
                        ScpiError::Validation(format!("pattern '{}': {}", self.source, reason))
                    })?;
                    output.push_str(&text);
                }
            }
        }
        Ok(output)
    }

    fn compiled(&self) -> ScpiResult<&Compiled> {
        self.compiled
            .get_or_init(|| compile(&self.source))
            .as_ref()
            .map_err(|reason| ScpiError::declaration(&self.source, reason.clone()))
    }
}

fn compile(source: &str) -> Result<Compiled, String> {
    let pieces = tokenize(source)?;

    let mut regex = String::from("(?i)^");
    for piece in &pieces {
        match piece {
            Piece::Literal(text) => regex.push_str(&regex::escape(text)),
            Piece::Placeholder(conversion) => regex.push_str(conversion.regex()),
        }
    }
    regex.push('$');

    let regex = Regex::new(&regex).map_err(|e| format!("failed to compile '{}': {}", regex, e))?;
    Ok(Compiled { pieces, regex })
}

fn tokenize(source: &str) -> Result<Vec<Piece>, String> {
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut spec = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => spec.push(ch),
                        None => return Err("unterminated placeholder".to_string()),
                    }
                }
                let conversion = Conversion::from_spec(&spec)
                    .ok_or_else(|| format!("unsupported placeholder '{{{}}}'", spec))?;
                if !literal.is_empty() {
                    pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                }
                pieces.push(Piece::Placeholder(conversion));
            }
            '}' => return Err("unmatched '}'".to_string()),
            other => literal.push(other),
        }
    }
    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    Ok(pieces)
}

/// `5.000000e-01`: six decimals, signed exponent of at least two digits.
fn exponent_notation(value: f64) -> String {
    let formatted = format!("{:.*e}", PRECISION, value);
    match split_exponent(&formatted) {
        Some((mantissa, exponent)) => format!("{}{}", mantissa, exponent_suffix(exponent)),
        None => formatted,
    }
}

/// Six significant digits, trailing zeros removed, exponent form outside
/// `1e-4 <= |value| < 1e6`.
fn general_notation(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }

    let scientific = format!("{:.*e}", PRECISION - 1, value);
    let Some((mantissa, exponent)) = split_exponent(&scientific) else {
        return scientific;
    };

    if (-4..PRECISION as i32).contains(&exponent) {
        let decimals = (PRECISION as i32 - 1 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, value))
    } else {
        format!("{}{}", trim_fraction(mantissa), exponent_suffix(exponent))
    }
}

fn split_exponent(formatted: &str) -> Option<(&str, i32)> {
    let (mantissa, exponent) = formatted.split_once('e')?;
    Some((mantissa, exponent.parse().ok()?))
}

fn exponent_suffix(exponent: i32) -> String {
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("e{}{:02}", sign, exponent.abs())
}

fn trim_fraction(text: &str) -> String {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text.to_string()
    }
}

/// A value that converts to and from a single [`Field`].
pub trait FieldValue: Sized {
    fn from_field(field: Field) -> Result<Self, String>;
    fn to_field(&self) -> Field;
}

impl FieldValue for f64 {
    fn from_field(field: Field) -> Result<Self, String> {
        field
            .as_f64()
            .ok_or_else(|| format!("expected a number, got '{}'", field))
    }

    fn to_field(&self) -> Field {
        Field::Float(*self)
    }
}

impl FieldValue for i64 {
    fn from_field(field: Field) -> Result<Self, String> {
        match field {
            Field::Int(value) => Ok(value),
            other => Err(format!("expected an integer, got '{}'", other)),
        }
    }

    fn to_field(&self) -> Field {
        Field::Int(*self)
    }
}

impl FieldValue for u32 {
    fn from_field(field: Field) -> Result<Self, String> {
        let value = i64::from_field(field)?;
        u32::try_from(value).map_err(|_| format!("{} is out of range", value))
    }

    fn to_field(&self) -> Field {
        Field::Int(i64::from(*self))
    }
}

impl FieldValue for String {
    fn from_field(field: Field) -> Result<Self, String> {
        match field {
            Field::Text(text) => Ok(text),
            other => Ok(other.to_string()),
        }
    }

    fn to_field(&self) -> Field {
        Field::Text(self.clone())
    }
}

/// A value that a reply pattern can produce and consume.
///
/// Implemented for scalars (one field) and tuples (one field per element).
pub trait PatternValue: Sized {
    fn from_parsed(parsed: Parsed) -> Result<Self, String>;
    fn to_fields(&self) -> Vec<Field>;
}

macro_rules! scalar_pattern_value {
    ($($ty:ty),*) => {$(
        impl PatternValue for $ty {
            fn from_parsed(parsed: Parsed) -> Result<Self, String> {
                match parsed {
                    Parsed::Scalar(field) => <$ty>::from_field(field),
                    Parsed::Tuple(fields) => Err(format!("expected 1 field, got {}", fields.len())),
                }
            }

            fn to_fields(&self) -> Vec<Field> {
                vec![self.to_field()]
            }
        }
    )*};
}

scalar_pattern_value!(f64, i64, u32, String);

impl<A: FieldValue, B: FieldValue> PatternValue for (A, B) {
    fn from_parsed(parsed: Parsed) -> Result<Self, String> {
        let [a, b]: [Field; 2] = parsed
            .into_fields()
            .try_into()
            .map_err(|fields: Vec<Field>| format!("expected 2 fields, got {}", fields.len()))?;
        Ok((A::from_field(a)?, B::from_field(b)?))
    }

    fn to_fields(&self) -> Vec<Field> {
        vec![self.0.to_field(), self.1.to_field()]
    }
}

impl<A: FieldValue, B: FieldValue, C: FieldValue> PatternValue for (A, B, C) {
    fn from_parsed(parsed: Parsed) -> Result<Self, String> {
        let [a, b, c]: [Field; 3] = parsed
            .into_fields()
            .try_into()
            .map_err(|fields: Vec<Field>| format!("expected 3 fields, got {}", fields.len()))?;
        Ok((A::from_field(a)?, B::from_field(b)?, C::from_field(c)?))
    }

    fn to_fields(&self) -> Vec<Field> {
        vec![self.0.to_field(), self.1.to_field(), self.2.to_field()]
    }
}

impl PatternValue for Parsed {
    fn from_parsed(parsed: Parsed) -> Result<Self, String> {
        Ok(parsed)
    }

    fn to_fields(&self) -> Vec<Field> {
        self.clone().into_fields()
    }
}
