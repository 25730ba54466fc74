//! # serde_flatfile
//!
//! A Serde-compatible mapper between flat text files and typed records.
//!
//! ## What is a flat file?
//!
//! A flat file holds one record per line, with no nesting. Two layouts are common:
//!
//! - **Fixed-width**: every field owns a character range of the line, padded to its
//!   width (mainframe exports, bank statements, EDI feeds)
//! - **Delimited**: fields are separated by a character, with optional quoting and
//!   escaping (CSV, TSV, pipe-separated exports)
//!
//! ## Key Features
//!
//! - **Declarative layouts**: describe columns once with [`LayoutBuilder`] and
//!   [`FieldDefinition`], read and write with the same description
//! - **Serde Compatible**: entities are plain `#[derive(Serialize, Deserialize)]` structs
//! - **Streaming**: [`RecordReader`] and [`RecordWriter`] hold one line at a time
//! - **Exact numbers**: [`Decimal`] keeps every digit, including implied decimal points
//! - **Precise errors**: every failure names its line (or entity) and field
//!
//! ## Quick Start
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use serde_flatfile::{converter, FieldDefinition, LayoutBuilder};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Entry {
//!     id: u32,
//!     description: String,
//!     quantity: Option<u32>,
//! }
//!
//! let layout = LayoutBuilder::fixed_width()
//!     .field(FieldDefinition::new("id", 5, converter::integer()).align_right('0'))
//!     .field(FieldDefinition::new("description", 20, converter::string()))
//!     .field(
//!         FieldDefinition::new("quantity", 3, converter::integer())
//!             .align_right('0')
//!             .nullable("   "),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let entries = vec![
//!     Entry { id: 1, description: "Description 1".into(), quantity: Some(3) },
//!     Entry { id: 5, description: "Description 5".into(), quantity: None },
//! ];
//!
//! let text = serde_flatfile::to_string(&layout, &entries).unwrap();
//! assert_eq!(
//!     text,
//!     "00001Description 1       003\n00005Description 5          \n"
//! );
//!
//! let back: Vec<Entry> = serde_flatfile::from_str(&layout, &text).unwrap();
//! assert_eq!(back, entries);
//! ```
//!
//! ### Dynamic Records
//!
//! When the shape is only known at runtime, read into [`Record`]:
//!
//! ```rust
//! use serde_flatfile::{converter, FieldDefinition, LayoutBuilder, Record, Value};
//!
//! let layout = LayoutBuilder::delimited(',')
//!     .field(FieldDefinition::column("name", converter::string()))
//!     .field(FieldDefinition::column("joined", converter::date("%d/%m/%Y")))
//!     .build()
//!     .unwrap();
//!
//! let rows: Vec<Record> = serde_flatfile::from_str(&layout, "\"Doe, J\",03/02/2021\n").unwrap();
//! assert_eq!(rows[0].get("name"), Some(&Value::from("Doe, J")));
//! assert!(rows[0].get("joined").and_then(Value::as_date).is_some());
//! ```
//!
//! ## Logging
//!
//! The crate logs through the [`log`](https://docs.rs/log) facade: `debug` when a pass
//! starts and finishes, `trace` per record, `warn` when a pass aborts. It never
//! installs a logger.
//!
//! ## Examples
//!
//! See the `demos/` directory:
//!
//! - **`fixed_width.rs`** - Reading and writing a fixed-width file
//! - **`delimited.rs`** - Quoting, escaping and headers in delimited files
//! - **`banking_feed.rs`** - Implied decimals, dates and fillers in a bank export
//!
//! Run any example with: `cargo run --example <name>`

pub mod converter;
pub mod de;
pub mod decimal;
mod delimited;
pub mod error;
pub mod field;
pub mod layout;
pub mod macros;
pub mod options;
pub mod reader;
pub mod record;
pub mod ser;
pub mod value;
pub mod writer;

pub use converter::{FieldConverter, Nullable, SharedConverter};
pub use de::{from_record, RecordDeserializer, ValueDeserializer};
pub use decimal::{Decimal, ParseDecimalError};
pub use error::{ConversionError, Error, Result};
pub use field::{FieldDefinition, FieldPosition};
pub use layout::{Filler, Layout, LayoutBuilder, LayoutMode};
pub use options::{Alignment, DelimitedOptions, LineTerminator, OverflowPolicy, Padding};
pub use reader::RecordReader;
pub use record::Record;
pub use ser::{to_record, to_value, RecordSerializer, ValueSerializer};
pub use value::Value;
pub use writer::RecordWriter;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;

/// Opens a lazy stream of entities over `reader`.
///
/// The layout is validated immediately; nothing is read until the first call to
/// `next`.
///
/// # Examples
///
/// ```rust
/// use serde_flatfile::{converter, from_reader, FieldDefinition, LayoutBuilder, Record};
/// use std::io::Cursor;
///
/// let layout = LayoutBuilder::delimited('\t')
///     .field(FieldDefinition::column("key", converter::string()))
///     .field(FieldDefinition::column("value", converter::integer()))
///     .build()
///     .unwrap();
///
/// let reader = from_reader::<Record, _>(&layout, Cursor::new("a\t1\nb\t2\n")).unwrap();
/// assert_eq!(reader.count(), 2);
/// ```
///
/// # Errors
///
/// Returns [`Error::LayoutInvalid`] when the layout breaks a schema invariant.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_reader<T, R>(layout: &Layout, reader: R) -> Result<RecordReader<T, R>>
where
    T: DeserializeOwned + 'static,
    R: io::BufRead,
{
    RecordReader::new(layout, reader)
}

/// Reads every entity of `s`.
///
/// # Errors
///
/// Returns the first error of the pass; see [`RecordReader`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str<T>(layout: &Layout, s: &str) -> Result<Vec<T>>
where
    T: DeserializeOwned + 'static,
{
    from_slice(layout, s.as_bytes())
}

/// Reads every entity of a byte slice.
///
/// # Errors
///
/// Returns the first error of the pass; invalid UTF-8 is an [`Error::Io`] of kind
/// `InvalidData`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice<T>(layout: &Layout, v: &[u8]) -> Result<Vec<T>>
where
    T: DeserializeOwned + 'static,
{
    from_reader(layout, v)?.collect()
}

/// Writes every entity to `writer`, one line each, and flushes it.
///
/// Returns the number of entities written.
///
/// # Examples
///
/// ```rust
/// use serde::Serialize;
/// use serde_flatfile::{converter, to_writer, FieldDefinition, LayoutBuilder};
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// let layout = LayoutBuilder::fixed_width()
///     .field(FieldDefinition::new("x", 3, converter::integer()).align_right(' '))
///     .field(FieldDefinition::new("y", 3, converter::integer()).align_right(' '))
///     .build()
///     .unwrap();
///
/// let mut buffer = Vec::new();
/// let count = to_writer(&layout, &mut buffer, &[Point { x: 1, y: -2 }]).unwrap();
/// assert_eq!(count, 1);
/// assert_eq!(buffer, b"  1 -2\n");
/// ```
///
/// # Errors
///
/// Stops at the first failing entity; lines written before it stay in `writer`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<'e, W, T, I>(layout: &Layout, writer: W, entities: I) -> Result<usize>
where
    W: io::Write,
    T: Serialize + 'e,
    I: IntoIterator<Item = &'e T>,
{
    let mut writer = RecordWriter::new(layout, writer)?;
    writer.write_all(entities)?;
    let count = writer.written();
    writer.into_inner()?;
    Ok(count)
}

/// Writes every entity into a string.
///
/// # Errors
///
/// Returns the first error of the pass; see [`RecordWriter::write`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string<'e, T, I>(layout: &Layout, entities: I) -> Result<String>
where
    T: Serialize + 'e,
    I: IntoIterator<Item = &'e T>,
{
    let mut buffer = Vec::with_capacity(256);
    to_writer(layout, &mut buffer, entities)?;
    String::from_utf8(buffer).map_err(Error::custom)
}
