//! Streaming record reader.
//!
//! [`RecordReader`] pulls one line at a time from a [`BufRead`], decodes it with a
//! [`Layout`] and builds an entity from it. Memory use does not grow with the input:
//! the line buffer is reused for every record.
//!
//! The first error ends the stream. It is yielded once, carrying the 1-based line
//! number where possible, and the iterator returns `None` afterwards.

use crate::de::from_record;
use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::options::LineTerminator;
use log::{debug, trace, warn};
use serde::de::DeserializeOwned;
use std::io::{self, BufRead};
use std::iter::FusedIterator;
use std::marker::PhantomData;

/// Lazy iterator of entities read from a stream.
///
/// Created by [`from_reader`](crate::from_reader).
///
/// # Examples
///
/// ```rust
/// use serde::Deserialize;
/// use serde_flatfile::{converter, FieldDefinition, LayoutBuilder};
///
/// #[derive(Deserialize)]
/// struct Item { sku: String, qty: u32 }
///
/// let layout = LayoutBuilder::fixed_width()
///     .field(FieldDefinition::new("sku", 4, converter::string()))
///     .field(FieldDefinition::new("qty", 3, converter::integer()).align_right('0'))
///     .build()?;
///
/// let input = "AB12007\nZZ9 100\n";
/// let mut reader = serde_flatfile::from_reader::<Item, _>(&layout, input.as_bytes())?;
///
/// let first = reader.next().unwrap()?;
/// assert_eq!((first.sku.as_str(), first.qty), ("AB12", 7));
/// let second = reader.next().unwrap()?;
/// assert_eq!((second.sku.as_str(), second.qty), ("ZZ9", 100));
/// assert!(reader.next().is_none());
/// # Ok::<(), serde_flatfile::Error>(())
/// ```
pub struct RecordReader<T, R> {
    layout: Layout,
    reader: R,
    buf: Vec<u8>,
    line: String,
    line_no: usize,
    records: usize,
    header_pending: bool,
    done: bool,
    _entity: PhantomData<fn() -> T>,
}

impl<T, R> RecordReader<T, R>
where
    T: DeserializeOwned + 'static,
    R: BufRead,
{
    /// Validates the layout and prepares to read from `reader`.
    ///
    /// Nothing is read until the first call to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LayoutInvalid`] if the layout breaks a schema invariant.
    pub fn new(layout: &Layout, reader: R) -> Result<Self> {
        layout.validate()?;
        debug!(
            "reading {} layout with {} fields",
            if layout.is_fixed_width() { "fixed-width" } else { "delimited" },
            layout.fields().len()
        );

        Ok(RecordReader {
            layout: layout.clone(),
            reader,
            buf: Vec::with_capacity(256),
            line: String::with_capacity(256),
            line_no: 0,
            records: 0,
            header_pending: layout.has_header(),
            done: false,
            _entity: PhantomData,
        })
    }

    /// Number of physical lines consumed so far.
    #[must_use]
    pub const fn line_number(&self) -> usize {
        self.line_no
    }

    /// Number of entities yielded so far.
    #[must_use]
    pub const fn records_read(&self) -> usize {
        self.records
    }

    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Returns the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Reads the next physical line, terminator included, into `buf`.
    ///
    /// Returns `false` at end of input.
    fn fill_line(&mut self) -> Result<bool> {
        self.buf.clear();
        match self.layout.terminator() {
            LineTerminator::Lf | LineTerminator::CrLf => {
                self.reader.read_until(b'\n', &mut self.buf)?;
            }
            LineTerminator::Custom(terminator) => {
                let terminator = terminator.as_bytes();
                let Some(&last) = terminator.last() else {
                    return Err(Error::layout("the line terminator must not be empty"));
                };
                while self.reader.read_until(last, &mut self.buf)? > 0 {
                    if self.buf.ends_with(terminator) {
                        break;
                    }
                }
            }
        }

        if self.buf.is_empty() {
            return Ok(false);
        }
        self.line_no += 1;
        Ok(true)
    }

    /// Appends the line in `buf` to `line`, keeping the terminator if `keep_break`.
    fn append_line(&mut self, keep_break: bool) -> Result<()> {
        let (content, ending) = split_terminator(&self.buf, self.layout.terminator());
        let content = std::str::from_utf8(content).map_err(invalid_utf8)?;
        self.line.push_str(content);
        if keep_break {
            let ending = std::str::from_utf8(ending).map_err(invalid_utf8)?;
            self.line.push_str(ending);
        }
        Ok(())
    }

    fn next_entity(&mut self) -> Result<Option<T>> {
        loop {
            if !self.fill_line()? {
                return Ok(None);
            }
            let start = self.line_no;
            self.line.clear();
            self.append_line(false)?;

            if self.header_pending {
                self.header_pending = false;
                trace!("skipping header line {}", start);
                continue;
            }
            if self.line.is_empty() && self.layout.skips_blank_lines() {
                continue;
            }

            let record = loop {
                if let Some(record) = self.layout.decode_line(&self.line, start)? {
                    break record;
                }
                // quoted token spans a line break: keep the break and read on
                let (_, ending) = split_terminator(&self.buf, self.layout.terminator());
                let ending = std::str::from_utf8(ending).map_err(invalid_utf8)?.to_string();
                if !self.fill_line()? {
                    return Err(Error::malformed(start, "unterminated quoted token at end of input"));
                }
                self.line.push_str(&ending);
                self.append_line(false)?;
            };

            trace!("line {}: decoded {} fields", start, record.len());
            return from_record(record).map(Some).map_err(|e| e.at_line(start));
        }
    }
}

impl<T, R> Iterator for RecordReader<T, R>
where
    T: DeserializeOwned + 'static,
    R: BufRead,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Result<T>> {
        if self.done {
            return None;
        }

        match self.next_entity() {
            Ok(Some(entity)) => {
                self.records += 1;
                Some(Ok(entity))
            }
            Ok(None) => {
                self.done = true;
                debug!(
                    "finished reading: {} records from {} lines",
                    self.records, self.line_no
                );
                None
            }
            Err(err) => {
                self.done = true;
                warn!(
                    "read aborted at line {} after {} records: {}",
                    err.line().unwrap_or(self.line_no),
                    self.records,
                    err
                );
                Some(Err(err))
            }
        }
    }
}

impl<T, R> FusedIterator for RecordReader<T, R>
where
    T: DeserializeOwned + 'static,
    R: BufRead,
{
}

/// Splits a raw line into its content and the terminator that ended it.
///
/// `\n` terminators also swallow a preceding `\r`. A final line without terminator
/// has an empty ending.
fn split_terminator<'b>(line: &'b [u8], terminator: &LineTerminator) -> (&'b [u8], &'b [u8]) {
    let ending_len = match terminator {
        LineTerminator::Lf | LineTerminator::CrLf => {
            if line.ends_with(b"\r\n") {
                2
            } else if line.ends_with(b"\n") {
                1
            } else {
                0
            }
        }
        LineTerminator::Custom(t) if line.ends_with(t.as_bytes()) => t.len(),
        LineTerminator::Custom(_) => 0,
    };
    line.split_at(line.len() - ending_len)
}

fn invalid_utf8(err: std::str::Utf8Error) -> Error {
    Error::Io(io::Error::new(io::ErrorKind::InvalidData, err))
}
