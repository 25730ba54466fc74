//! Field converters: token text ⇄ typed [`Value`].
//!
//! A converter handles exactly one primitive type. It never sees padding or quoting;
//! the [`FieldDefinition`](crate::FieldDefinition) strips those before calling
//! [`FieldConverter::parse`] and applies them after [`FieldConverter::format`].
//!
//! Built-in converters:
//!
//! | Converter | Value | Notes |
//! |-----------|-------|-------|
//! | [`StringConverter`] | `String` | identity |
//! | [`IntegerConverter`] | `Integer` | base-10, optional sign |
//! | [`FloatConverter`] | `Float` | optional fixed precision |
//! | [`DecimalConverter`] | `Decimal` | exact, optional fixed or implied scale |
//! | [`BoolConverter`] | `Bool` | configurable tokens (`Y`/`N`, `1`/`0`, ...) |
//! | [`CharConverter`] | `Char` | exactly one character |
//! | [`DateConverter`] | `Date` | chrono format string |
//! | [`DateTimeConverter`] | `DateTime` | chrono format string |
//! | [`Nullable`] | any + `Null` | null token short-circuit |
//!
//! Custom converters implement [`FieldConverter`] directly.
//!
//! ## Examples
//!
//! ```rust
//! use serde_flatfile::converter::{self, FieldConverter};
//! use serde_flatfile::Value;
//!
//! let int = converter::integer();
//! assert_eq!(int.parse("-42").unwrap(), Value::Integer(-42));
//! assert_eq!(int.format(&Value::Integer(1200)).unwrap(), "1200");
//!
//! let maybe = converter::nullable(converter::integer(), "NULL");
//! assert_eq!(maybe.parse("NULL").unwrap(), Value::Null);
//! assert_eq!(maybe.format(&Value::Null).unwrap(), "NULL");
//! ```

use crate::error::ConversionError;
use crate::value::{ISO_DATE, ISO_DATE_TIME};
use crate::{Decimal, Value};
use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use num_bigint::BigInt;
use std::fmt::{self, Write};
use std::sync::Arc;

type Result<T> = std::result::Result<T, ConversionError>;

/// Bidirectional mapping between one raw token and one typed value.
///
/// Implementations must be pure and satisfy `parse(format(v)) == v` for every value
/// they can represent.
pub trait FieldConverter: fmt::Debug + Send + Sync {
    /// Parses a token that has already been stripped of padding.
    fn parse(&self, token: &str) -> Result<Value>;

    /// Formats a value into its unpadded token.
    ///
    /// Besides its own [`Value`] variant, a converter accepts the string form a serde
    /// `Serialize` impl produces for its type (ISO dates, decimal strings, ...).
    fn format(&self, value: &Value) -> Result<String>;

    /// Value a field takes on a blank line.
    fn default_value(&self) -> Value;

    /// Token representing an absent value, for nullable converters.
    fn null_token(&self) -> Option<&str> {
        None
    }

    /// Checks the converter's own configuration (e.g. a date format string).
    fn validate(&self) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// Shared, type-erased converter as stored in a field definition.
pub type SharedConverter = Arc<dyn FieldConverter>;

impl FieldConverter for SharedConverter {
    fn parse(&self, token: &str) -> Result<Value> {
        (**self).parse(token)
    }

    fn format(&self, value: &Value) -> Result<String> {
        (**self).format(value)
    }

    fn default_value(&self) -> Value {
        (**self).default_value()
    }

    fn null_token(&self) -> Option<&str> {
        (**self).null_token()
    }

    fn validate(&self) -> std::result::Result<(), String> {
        (**self).validate()
    }
}

/// Identity converter for text columns.
#[derive(Clone, Debug, Default)]
pub struct StringConverter;

impl FieldConverter for StringConverter {
    fn parse(&self, token: &str) -> Result<Value> {
        Ok(Value::String(token.to_string()))
    }

    fn format(&self, value: &Value) -> Result<String> {
        match value {
            Value::Null => Err(ConversionError::UnexpectedNull),
            Value::String(s) => Ok(s.clone()),
            other => Ok(other.to_string()),
        }
    }

    fn default_value(&self) -> Value {
        Value::String(String::new())
    }
}

/// Base-10 signed integer converter.
#[derive(Clone, Debug, Default)]
pub struct IntegerConverter;

impl FieldConverter for IntegerConverter {
    fn parse(&self, token: &str) -> Result<Value> {
        token
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| ConversionError::InvalidNumber(token.to_string()))
    }

    fn format(&self, value: &Value) -> Result<String> {
        let int = match value {
            Value::Integer(i) => *i,
            Value::String(s) => s
                .parse::<i64>()
                .map_err(|_| ConversionError::InvalidNumber(s.clone()))?,
            Value::Float(f) => {
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    *f as i64
                } else {
                    return Err(ConversionError::OutOfRange(f.to_string()));
                }
            }
            Value::Decimal(d) => {
                let whole = d
                    .rescale(0)
                    .ok_or_else(|| ConversionError::OutOfRange(d.to_string()))?;
                i64::try_from(whole.unscaled().clone())
                    .map_err(|_| ConversionError::OutOfRange(d.to_string()))?
            }
            Value::Null => return Err(ConversionError::UnexpectedNull),
            other => return Err(ConversionError::mismatch("integer", other)),
        };
        Ok(int.to_string())
    }

    fn default_value(&self) -> Value {
        Value::Integer(0)
    }
}

/// Binary floating point converter.
#[derive(Clone, Debug, Default)]
pub struct FloatConverter {
    precision: Option<usize>,
}

impl FloatConverter {
    /// Formats with exactly `precision` fractional digits.
    ///
    /// Values with more digits are rounded on write, so they will not read back
    /// identically.
    #[must_use]
    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = Some(precision);
        self
    }
}

impl FieldConverter for FloatConverter {
    fn parse(&self, token: &str) -> Result<Value> {
        token
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| ConversionError::InvalidNumber(token.to_string()))
    }

    fn format(&self, value: &Value) -> Result<String> {
        let float = match value {
            Value::String(s) => s
                .parse::<f64>()
                .map_err(|_| ConversionError::InvalidNumber(s.clone()))?,
            Value::Null => return Err(ConversionError::UnexpectedNull),
            other => other
                .as_f64()
                .ok_or_else(|| ConversionError::mismatch("float", other))?,
        };

        Ok(match self.precision {
            Some(precision) => format!("{:.*}", precision, float),
            None => float.to_string(),
        })
    }

    fn default_value(&self) -> Value {
        Value::Float(0.0)
    }
}

/// Exact decimal converter.
///
/// With an implied scale the decimal point is not written: `123.45` with scale 2
/// becomes `12345`, the classic mainframe amount encoding.
#[derive(Clone, Debug, Default)]
pub struct DecimalConverter {
    scale: Option<u32>,
    implied: bool,
}

impl DecimalConverter {
    /// Always writes exactly `scale` fractional digits.
    #[must_use]
    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self.implied = false;
        self
    }

    /// Writes `scale` fractional digits without the decimal point.
    #[must_use]
    pub fn with_implied_scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self.implied = true;
        self
    }

    fn to_decimal(value: &Value) -> Result<Decimal> {
        match value {
            Value::Decimal(d) => Ok(d.clone()),
            Value::Integer(i) => Ok(Decimal::from(*i)),
            Value::Float(f) => {
                Decimal::from_f64(*f).ok_or_else(|| ConversionError::OutOfRange(f.to_string()))
            }
            Value::String(s) => s
                .parse()
                .map_err(|_| ConversionError::InvalidDecimal(s.clone())),
            Value::Null => Err(ConversionError::UnexpectedNull),
            other => Err(ConversionError::mismatch("decimal", other)),
        }
    }
}

impl FieldConverter for DecimalConverter {
    fn parse(&self, token: &str) -> Result<Value> {
        let invalid = || ConversionError::InvalidDecimal(token.to_string());

        match (self.implied, self.scale) {
            (true, Some(scale)) => {
                let digits = token.strip_prefix('+').unwrap_or(token);
                let unsigned = digits.strip_prefix('-').unwrap_or(digits);
                if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                let unscaled: BigInt = digits.parse().map_err(|_| invalid())?;
                Ok(Value::Decimal(Decimal::new(unscaled, scale)))
            }
            _ => token
                .parse::<Decimal>()
                .map(Value::Decimal)
                .map_err(|_| invalid()),
        }
    }

    fn format(&self, value: &Value) -> Result<String> {
        let decimal = Self::to_decimal(value)?;
        let Some(scale) = self.scale else {
            return Ok(decimal.to_string());
        };

        let scaled = decimal
            .rescale(scale)
            .ok_or_else(|| ConversionError::OutOfRange(decimal.to_string()))?;
        if self.implied {
            Ok(scaled.unscaled().to_string())
        } else {
            Ok(scaled.to_string())
        }
    }

    fn default_value(&self) -> Value {
        Value::Decimal(Decimal::new(BigInt::default(), self.scale.unwrap_or(0)))
    }
}

/// Boolean converter with configurable tokens, case-insensitive on read.
#[derive(Clone, Debug)]
pub struct BoolConverter {
    true_token: String,
    false_token: String,
}

impl Default for BoolConverter {
    fn default() -> Self {
        BoolConverter::new("true", "false")
    }
}

impl BoolConverter {
    /// # Examples
    ///
    /// ```rust
    /// use serde_flatfile::converter::{BoolConverter, FieldConverter};
    /// use serde_flatfile::Value;
    ///
    /// let yes_no = BoolConverter::new("Y", "N");
    /// assert_eq!(yes_no.parse("y").unwrap(), Value::Bool(true));
    /// assert_eq!(yes_no.format(&Value::Bool(false)).unwrap(), "N");
    /// ```
    #[must_use]
    pub fn new(true_token: &str, false_token: &str) -> Self {
        BoolConverter {
            true_token: true_token.to_string(),
            false_token: false_token.to_string(),
        }
    }

    fn lookup(&self, token: &str) -> Option<bool> {
        if token.eq_ignore_ascii_case(&self.true_token) {
            Some(true)
        } else if token.eq_ignore_ascii_case(&self.false_token) {
            Some(false)
        } else {
            None
        }
    }
}

impl FieldConverter for BoolConverter {
    fn parse(&self, token: &str) -> Result<Value> {
        self.lookup(token)
            .map(Value::Bool)
            .ok_or_else(|| ConversionError::InvalidBool(token.to_string()))
    }

    fn format(&self, value: &Value) -> Result<String> {
        let flag = match value {
            Value::Bool(b) => *b,
            Value::String(s) => self
                .lookup(s)
                .or_else(|| s.parse::<bool>().ok())
                .ok_or_else(|| ConversionError::InvalidBool(s.clone()))?,
            Value::Null => return Err(ConversionError::UnexpectedNull),
            other => return Err(ConversionError::mismatch("bool", other)),
        };
        Ok(if flag {
            self.true_token.clone()
        } else {
            self.false_token.clone()
        })
    }

    fn default_value(&self) -> Value {
        Value::Bool(false)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.true_token.eq_ignore_ascii_case(&self.false_token) {
            return Err(format!(
                "boolean tokens {:?} and {:?} are indistinguishable",
                self.true_token, self.false_token
            ));
        }
        Ok(())
    }
}

/// Single character converter.
#[derive(Clone, Debug, Default)]
pub struct CharConverter;

impl FieldConverter for CharConverter {
    fn parse(&self, token: &str) -> Result<Value> {
        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Value::Char(c)),
            _ => Err(ConversionError::InvalidChar(token.to_string())),
        }
    }

    fn format(&self, value: &Value) -> Result<String> {
        match value {
            Value::Char(c) => Ok(c.to_string()),
            Value::String(s) if s.chars().count() == 1 => Ok(s.clone()),
            Value::String(s) => Err(ConversionError::InvalidChar(s.clone())),
            Value::Null => Err(ConversionError::UnexpectedNull),
            other => Err(ConversionError::mismatch("char", other)),
        }
    }

    fn default_value(&self) -> Value {
        Value::Char(' ')
    }
}

fn check_format(format: &str) -> std::result::Result<(), String> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(format!("invalid date format {:?}", format));
    }
    Ok(())
}

fn render<T: fmt::Display>(formatted: T, format: &str) -> Result<String> {
    let mut out = String::new();
    write!(out, "{}", formatted).map_err(|_| ConversionError::InvalidDate {
        raw: String::new(),
        format: format.to_string(),
    })?;
    Ok(out)
}

/// Calendar date converter using a chrono format string.
#[derive(Clone, Debug)]
pub struct DateConverter {
    format: String,
}

impl Default for DateConverter {
    fn default() -> Self {
        DateConverter::new(ISO_DATE)
    }
}

impl DateConverter {
    /// # Examples
    ///
    /// ```rust
    /// use serde_flatfile::converter::{DateConverter, FieldConverter};
    ///
    /// let yyyymmdd = DateConverter::new("%Y%m%d");
    /// let date = yyyymmdd.parse("20240115").unwrap();
    /// assert_eq!(yyyymmdd.format(&date).unwrap(), "20240115");
    /// ```
    #[must_use]
    pub fn new(format: &str) -> Self {
        DateConverter {
            format: format.to_string(),
        }
    }

    fn parse_with(&self, raw: &str, format: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(raw, format).map_err(|_| ConversionError::InvalidDate {
            raw: raw.to_string(),
            format: format.to_string(),
        })
    }
}

impl FieldConverter for DateConverter {
    fn parse(&self, token: &str) -> Result<Value> {
        self.parse_with(token, &self.format).map(Value::Date)
    }

    fn format(&self, value: &Value) -> Result<String> {
        let date = match value {
            Value::Date(d) => *d,
            Value::DateTime(dt) => dt.date(),
            Value::String(s) => self
                .parse_with(s, ISO_DATE)
                .or_else(|_| self.parse_with(s, &self.format))?,
            Value::Null => return Err(ConversionError::UnexpectedNull),
            other => return Err(ConversionError::mismatch("date", other)),
        };
        render(date.format(&self.format), &self.format)
    }

    fn default_value(&self) -> Value {
        Value::Date(NaiveDate::default())
    }

    fn validate(&self) -> std::result::Result<(), String> {
        check_format(&self.format)
    }
}

/// Timestamp converter using a chrono format string.
#[derive(Clone, Debug)]
pub struct DateTimeConverter {
    format: String,
}

impl Default for DateTimeConverter {
    fn default() -> Self {
        DateTimeConverter::new("%Y-%m-%dT%H:%M:%S")
    }
}

impl DateTimeConverter {
    #[must_use]
    pub fn new(format: &str) -> Self {
        DateTimeConverter {
            format: format.to_string(),
        }
    }

    fn parse_with(&self, raw: &str, format: &str) -> Result<NaiveDateTime> {
        NaiveDateTime::parse_from_str(raw, format).map_err(|_| ConversionError::InvalidDate {
            raw: raw.to_string(),
            format: format.to_string(),
        })
    }
}

impl FieldConverter for DateTimeConverter {
    fn parse(&self, token: &str) -> Result<Value> {
        self.parse_with(token, &self.format).map(Value::DateTime)
    }

    fn format(&self, value: &Value) -> Result<String> {
        let timestamp = match value {
            Value::DateTime(dt) => *dt,
            Value::Date(d) => d.and_time(NaiveTime::default()),
            Value::String(s) => self
                .parse_with(s, ISO_DATE_TIME)
                .or_else(|_| self.parse_with(s, &self.format))?,
            Value::Null => return Err(ConversionError::UnexpectedNull),
            other => return Err(ConversionError::mismatch("datetime", other)),
        };
        render(timestamp.format(&self.format), &self.format)
    }

    fn default_value(&self) -> Value {
        Value::DateTime(NaiveDateTime::default())
    }

    fn validate(&self) -> std::result::Result<(), String> {
        check_format(&self.format)
    }
}

/// Wraps a converter so that a null token maps to [`Value::Null`].
///
/// The token equal to the null token parses to `Null` without consulting the inner
/// converter, and `Null` formats to the null token. Everything else is delegated.
#[derive(Clone, Debug)]
pub struct Nullable<C> {
    inner: C,
    null_token: String,
}

impl<C: FieldConverter> Nullable<C> {
    #[must_use]
    pub fn new(inner: C, null_token: &str) -> Self {
        Nullable {
            inner,
            null_token: null_token.to_string(),
        }
    }

    #[must_use]
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: FieldConverter> FieldConverter for Nullable<C> {
    fn parse(&self, token: &str) -> Result<Value> {
        if token == self.null_token {
            return Ok(Value::Null);
        }
        self.inner.parse(token)
    }

    fn format(&self, value: &Value) -> Result<String> {
        match value {
            Value::Null => Ok(self.null_token.clone()),
            other => self.inner.format(other),
        }
    }

    fn default_value(&self) -> Value {
        Value::Null
    }

    fn null_token(&self) -> Option<&str> {
        Some(&self.null_token)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        self.inner.validate()
    }
}

#[must_use]
pub fn string() -> StringConverter {
    StringConverter
}

#[must_use]
pub fn integer() -> IntegerConverter {
    IntegerConverter
}

#[must_use]
pub fn float() -> FloatConverter {
    FloatConverter::default()
}

#[must_use]
pub fn decimal() -> DecimalConverter {
    DecimalConverter::default()
}

#[must_use]
pub fn boolean() -> BoolConverter {
    BoolConverter::default()
}

#[must_use]
pub fn character() -> CharConverter {
    CharConverter
}

#[must_use]
pub fn date(format: &str) -> DateConverter {
    DateConverter::new(format)
}

#[must_use]
pub fn date_time(format: &str) -> DateTimeConverter {
    DateTimeConverter::new(format)
}

#[must_use]
pub fn nullable<C: FieldConverter>(inner: C, null_token: &str) -> Nullable<C> {
    Nullable::new(inner, null_token)
}
