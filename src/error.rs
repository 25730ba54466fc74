//! Error types for flat file reading and writing.
//!
//! Every failure aborts the current pass and is reported with enough context to
//! diagnose it without re-reading the file:
//!
//! - **Layout errors**: the schema itself is malformed ([`Error::LayoutInvalid`])
//! - **Record errors**: a line cannot be split (too short, wrong token count,
//!   unterminated quote), always with the 1-based line number
//! - **Conversion errors**: a token cannot be parsed, or a value cannot be formatted,
//!   with the field name and the raw token
//! - **Entity errors**: serde could not build or destructure the entity
//! - **I/O errors**: passed through from the underlying stream unchanged
//!
//! ## Examples
//!
//! ```rust
//! use serde_flatfile::{converter, Error, FieldDefinition, LayoutBuilder, Record};
//!
//! let layout = LayoutBuilder::fixed_width()
//!     .field(FieldDefinition::new("id", 5, converter::integer()).align_right('0'))
//!     .build()
//!     .unwrap();
//!
//! let result: Result<Vec<Record>, Error> = serde_flatfile::from_str(&layout, "00A12\n");
//! match result {
//!     Err(Error::Conversion { line, field, .. }) => {
//!         assert_eq!(line, 1);
//!         assert_eq!(field, "id");
//!     }
//!     other => panic!("unexpected: {:?}", other),
//! }
//! ```

use std::fmt;
use std::io;
use thiserror::Error;

/// Represents all possible errors of a read or write pass.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying stream failure, propagated unchanged
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The layout violates a schema invariant
    #[error("Invalid layout: {0}")]
    LayoutInvalid(String),

    /// Fixed-width line shorter than the layout requires
    #[error("Record too short at line {line}: expected at least {expected} characters, found {found}")]
    RecordTooShort {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// Delimited line with the wrong number of tokens
    #[error("Token count mismatch at line {line}: expected {expected} tokens, found {found}")]
    TokenCountMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// A line that cannot be tokenized at all
    #[error("Malformed record at line {line}: {msg}")]
    MalformedRecord { line: usize, msg: String },

    /// A token could not be converted to the field's type
    #[error("Conversion error at line {line}, field '{field}' (raw token {raw:?}): {source}")]
    Conversion {
        line: usize,
        field: String,
        raw: String,
        #[source]
        source: ConversionError,
    },

    /// A formatted value exceeds its fixed width under the error policy
    #[error("Field overflow in entity {entity}, field '{field}': {length} characters do not fit width {width}")]
    FieldOverflow {
        entity: usize,
        field: String,
        width: usize,
        length: usize,
    },

    /// A field value could not be formatted
    #[error("Format error in entity {entity}, field '{field}': {source}")]
    Format {
        entity: usize,
        field: String,
        #[source]
        source: ConversionError,
    },

    /// A formatted value cannot be expressed with the layout's quoting rules
    #[error("Unrepresentable value in entity {entity}, field '{field}': {msg}")]
    Unrepresentable {
        entity: usize,
        field: String,
        msg: String,
    },

    /// The entity could not be built from the decoded record
    #[error("Cannot construct entity at line {line}: {msg}")]
    EntityConstruction { line: usize, msg: String },

    /// The entity could not be destructured into a record
    #[error("Cannot extract fields from entity {entity}: {msg}")]
    EntityExtraction { entity: usize, msg: String },

    /// Entity shape the record mapping cannot express (nested data, byte arrays, ...)
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// Custom error raised by a serde implementation
    #[error("Error: {0}")]
    Custom(String),
}

impl Error {
    /// Creates a layout validation error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_flatfile::Error;
    ///
    /// let err = Error::layout("duplicate field name 'id'");
    /// assert!(err.to_string().contains("duplicate"));
    /// ```
    pub fn layout<T: fmt::Display>(msg: T) -> Self {
        Error::LayoutInvalid(msg.to_string())
    }

    /// Creates a malformed record error.
    pub fn malformed(line: usize, msg: &str) -> Self {
        Error::MalformedRecord {
            line,
            msg: msg.to_string(),
        }
    }

    /// Creates an unsupported type error for entity shapes a flat record cannot hold.
    pub fn unsupported_type(msg: &str) -> Self {
        Error::UnsupportedType(msg.to_string())
    }

    /// Creates a custom error with a display message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_flatfile::Error;
    ///
    /// let err = Error::custom("something went wrong");
    /// assert!(err.to_string().contains("something went wrong"));
    /// ```
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Attaches a line number to an error raised while building an entity.
    ///
    /// Errors that already carry their own position are returned unchanged.
    pub(crate) fn at_line(self, line: usize) -> Self {
        match self {
            Error::Custom(msg) | Error::UnsupportedType(msg) => {
                Error::EntityConstruction { line, msg }
            }
            other => other,
        }
    }

    /// Attaches an entity ordinal to an error raised while destructuring an entity.
    pub(crate) fn at_entity(self, entity: usize) -> Self {
        match self {
            Error::Custom(msg) | Error::UnsupportedType(msg) => {
                Error::EntityExtraction { entity, msg }
            }
            other => other,
        }
    }

    /// Returns the 1-based line number for read-side errors, if any.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_flatfile::Error;
    ///
    /// let err = Error::malformed(7, "unterminated quote");
    /// assert_eq!(err.line(), Some(7));
    /// assert_eq!(Error::custom("x").line(), None);
    /// ```
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::RecordTooShort { line, .. }
            | Error::TokenCountMismatch { line, .. }
            | Error::MalformedRecord { line, .. }
            | Error::Conversion { line, .. }
            | Error::EntityConstruction { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// Returns the 1-based entity ordinal for write-side errors, if any.
    #[must_use]
    pub fn entity(&self) -> Option<usize> {
        match self {
            Error::FieldOverflow { entity, .. }
            | Error::Format { entity, .. }
            | Error::Unrepresentable { entity, .. }
            | Error::EntityExtraction { entity, .. } => Some(*entity),
            _ => None,
        }
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a single [`FieldConverter`](crate::converter::FieldConverter) call.
///
/// Converters know nothing about lines or fields; the engine wraps these into
/// [`Error::Conversion`] (read) or [`Error::Format`] (write).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("invalid number {0:?}")]
    InvalidNumber(String),

    #[error("invalid decimal {0:?}")]
    InvalidDecimal(String),

    #[error("invalid boolean {0:?}")]
    InvalidBool(String),

    #[error("expected exactly one character, found {0:?}")]
    InvalidChar(String),

    #[error("invalid date {raw:?} for format {format:?}")]
    InvalidDate { raw: String, format: String },

    #[error("value {0} is out of range")]
    OutOfRange(String),

    #[error("null value for a non-nullable field")]
    UnexpectedNull,

    #[error("expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },
}

impl ConversionError {
    pub(crate) fn mismatch(expected: &str, found: &crate::Value) -> Self {
        ConversionError::TypeMismatch {
            expected: expected.to_string(),
            found: found.kind().to_string(),
        }
    }
}
