//! Field definitions: one column of a layout.
//!
//! A [`FieldDefinition`] binds a column position to a converter and a formatting
//! policy. It turns a raw token into a [`Value`] (strip padding, check the null token,
//! parse) and a value back into a token (format, pad or truncate to width).
//!
//! ```rust
//! use serde_flatfile::{converter, FieldDefinition, Value};
//!
//! let amount = FieldDefinition::new("amount", 6, converter::integer()).align_right('0');
//! assert_eq!(amount.decode("000042").unwrap(), Value::Integer(42));
//! assert_eq!(amount.encode(&Value::Integer(42), 1).unwrap(), "000042");
//!
//! let note = FieldDefinition::new("note", 4, converter::string())
//!     .nullable("")
//!     .truncate();
//! assert_eq!(note.decode("    ").unwrap(), Value::Null);
//! assert_eq!(note.encode(&Value::from("overflowing"), 1).unwrap(), "over");
//! ```

use crate::converter::{FieldConverter, Nullable, SharedConverter};
use crate::error::{ConversionError, Error, Result};
use crate::options::{OverflowPolicy, Padding};
use crate::Value;
use std::sync::Arc;

/// Where a field's token lives in a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldPosition {
    /// Character range `[offset, offset + width)` of a fixed-width line
    Fixed { offset: usize, width: usize },
    /// Zero-based token index of a delimited line
    Delimited { ordinal: usize },
}

impl FieldPosition {
    /// Exclusive end offset of a fixed slot.
    #[must_use]
    pub const fn end(&self) -> Option<usize> {
        match self {
            FieldPosition::Fixed { offset, width } => Some(*offset + *width),
            FieldPosition::Delimited { .. } => None,
        }
    }
}

/// Metadata of one column.
#[derive(Clone, Debug)]
pub struct FieldDefinition {
    name: String,
    position: FieldPosition,
    converter: SharedConverter,
    padding: Option<Padding>,
    overflow: OverflowPolicy,
    optional: bool,
}

impl FieldDefinition {
    /// Creates a fixed-width field, left-aligned and space padded.
    ///
    /// The offset is assigned by [`LayoutBuilder`](crate::LayoutBuilder) from the
    /// order fields are added in; use [`FieldDefinition::at`] for explicit offsets.
    pub fn new<C: FieldConverter + 'static>(name: &str, width: usize, converter: C) -> Self {
        FieldDefinition {
            name: name.to_string(),
            position: FieldPosition::Fixed { offset: 0, width },
            converter: Arc::new(converter),
            padding: Some(Padding::default()),
            overflow: OverflowPolicy::default(),
            optional: false,
        }
    }

    /// Creates a delimited field without padding.
    pub fn column<C: FieldConverter + 'static>(name: &str, converter: C) -> Self {
        FieldDefinition {
            name: name.to_string(),
            position: FieldPosition::Delimited { ordinal: 0 },
            converter: Arc::new(converter),
            padding: None,
            overflow: OverflowPolicy::default(),
            optional: false,
        }
    }

    /// Left-aligns the value, padding (and trimming) `pad` on the right.
    #[must_use]
    pub fn align_left(self, pad: char) -> Self {
        self.with_padding(Padding::left(pad))
    }

    /// Right-aligns the value, padding (and trimming) `pad` on the left.
    #[must_use]
    pub fn align_right(self, pad: char) -> Self {
        self.with_padding(Padding::right(pad))
    }

    #[must_use]
    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = Some(padding);
        self
    }

    /// Makes the field nullable: `null_token` reads as [`Value::Null`] and `Null`
    /// writes as `null_token`.
    #[must_use]
    pub fn nullable(mut self, null_token: &str) -> Self {
        self.converter = Arc::new(Nullable::new(self.converter, null_token));
        self
    }

    /// Truncates values wider than the field instead of failing.
    #[must_use]
    pub fn truncate(self) -> Self {
        self.with_overflow(OverflowPolicy::Truncate)
    }

    #[must_use]
    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    /// Allows the field to be missing at the end of a line.
    ///
    /// A missing optional field decodes as [`Value::Null`] when nullable and as the
    /// converter's default value otherwise. Only trailing fields may be optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Places a fixed-width field at an explicit character offset.
    #[must_use]
    pub fn at(mut self, offset: usize) -> Self {
        if let FieldPosition::Fixed { width, .. } = self.position {
            self.position = FieldPosition::Fixed { offset, width };
        }
        self
    }

    #[must_use]
    pub fn with_position(mut self, position: FieldPosition) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn position(&self) -> FieldPosition {
        self.position
    }

    #[must_use]
    pub const fn width(&self) -> Option<usize> {
        match self.position {
            FieldPosition::Fixed { width, .. } => Some(width),
            FieldPosition::Delimited { .. } => None,
        }
    }

    #[must_use]
    pub fn converter(&self) -> &SharedConverter {
        &self.converter
    }

    #[must_use]
    pub const fn padding(&self) -> Option<Padding> {
        self.padding
    }

    #[must_use]
    pub const fn overflow(&self) -> OverflowPolicy {
        self.overflow
    }

    #[must_use]
    pub const fn is_optional(&self) -> bool {
        self.optional
    }

    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.converter.null_token().is_some()
    }

    /// Token written for an absent value; `""` for fields that are not nullable.
    #[must_use]
    pub fn null_token(&self) -> &str {
        self.converter.null_token().unwrap_or("")
    }

    /// Value of this field on a blank line.
    #[must_use]
    pub fn default_value(&self) -> Value {
        self.converter.default_value()
    }

    /// Removes padding from a raw token.
    ///
    /// A token made only of a digit pad character keeps one digit, so that zero
    /// survives zero padding.
    fn strip<'a>(&self, raw: &'a str) -> &'a str {
        let Some(padding) = self.padding else {
            return raw;
        };

        let stripped = padding.strip(raw);
        if stripped.is_empty() && !raw.is_empty() && padding.ch.is_ascii_digit() {
            &raw[raw.len() - padding.ch.len_utf8()..]
        } else {
            stripped
        }
    }

    fn strip_plain<'a>(&self, raw: &'a str) -> &'a str {
        self.padding.map_or(raw, |padding| padding.strip(raw))
    }

    /// Converts a raw token (padding included) into a value.
    ///
    /// For nullable fields, a token equal to the null token before or after padding
    /// is stripped yields [`Value::Null`] without parsing. The comparison uses the
    /// plain padding strip, so a null token padded with digits still reads as null.
    pub fn decode(&self, raw: &str) -> std::result::Result<Value, ConversionError> {
        if let Some(null_token) = self.converter.null_token() {
            if raw == null_token || self.strip_plain(raw) == self.strip_plain(null_token) {
                return Ok(Value::Null);
            }
        }
        self.converter.parse(self.strip(raw))
    }

    /// Like [`FieldDefinition::decode`], attributing failures to a line.
    pub(crate) fn decode_at(&self, raw: &str, line: usize) -> Result<Value> {
        self.decode(raw).map_err(|source| Error::Conversion {
            line,
            field: self.name.clone(),
            raw: raw.to_string(),
            source,
        })
    }

    /// Formats a value into the token written to the line.
    ///
    /// Fixed-width fields are padded to their width, or truncated/rejected according
    /// to the overflow policy. `entity` is the 1-based ordinal used in errors.
    pub fn encode(&self, value: &Value, entity: usize) -> Result<String> {
        let text = self
            .converter
            .format(value)
            .map_err(|source| Error::Format {
                entity,
                field: self.name.clone(),
                source,
            })?;

        let token = match self.position {
            FieldPosition::Fixed { width, .. } => self.fit(text, width, entity)?,
            FieldPosition::Delimited { .. } => text,
        };

        // a present value must not be written as the null token
        if let Some(null_token) = self.converter.null_token() {
            if !value.is_null() && token == self.null_image(null_token) {
                return Err(Error::Unrepresentable {
                    entity,
                    field: self.name.clone(),
                    msg: format!("value {:?} would read back as null", token),
                });
            }
        }
        Ok(token)
    }

    /// The null token as it appears on the line.
    fn null_image(&self, null_token: &str) -> String {
        match self.position {
            FieldPosition::Fixed { width, .. } => {
                self.padding.unwrap_or_default().pad(null_token, width)
            }
            FieldPosition::Delimited { .. } => null_token.to_string(),
        }
    }

    fn fit(&self, text: String, width: usize, entity: usize) -> Result<String> {
        let length = text.chars().count();
        if length > width {
            return match self.overflow {
                OverflowPolicy::Truncate => Ok(text.chars().take(width).collect()),
                OverflowPolicy::Error => Err(Error::FieldOverflow {
                    entity,
                    field: self.name.clone(),
                    width,
                    length,
                }),
            };
        }

        Ok(self.padding.unwrap_or_default().pad(&text, width))
    }
}
