//! Layouts: the ordered set of fields that describes one line.
//!
//! A [`Layout`] is either fixed-width (every field owns a character range) or
//! delimited (every field owns a token index). Layouts are built with
//! [`LayoutBuilder`], which assigns positions in the order fields are added and
//! validates the result, and are immutable and cheap to clone afterwards.
//!
//! ## Examples
//!
//! ```rust
//! use serde_flatfile::{converter, FieldDefinition, LayoutBuilder, Value};
//!
//! let layout = LayoutBuilder::fixed_width()
//!     .field(FieldDefinition::new("id", 4, converter::integer()).align_right('0'))
//!     .filler(2)
//!     .field(FieldDefinition::new("name", 6, converter::string()))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(layout.record_width(), 12);
//!
//! let record = layout.decode("0042  Alice ", 1).unwrap();
//! assert_eq!(record.get("id"), Some(&Value::Integer(42)));
//! assert_eq!(record.get("name"), Some(&Value::from("Alice")));
//! assert_eq!(layout.encode(&record, 1).unwrap(), "0042  Alice ");
//! ```

use crate::delimited::{self, Scan};
use crate::error::{Error, Result};
use crate::field::{FieldDefinition, FieldPosition};
use crate::options::{DelimitedOptions, LineTerminator, Padding};
use crate::{Record, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// How a line is cut into field tokens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutMode {
    FixedWidth,
    Delimited(DelimitedOptions),
}

/// An unnamed gap in a fixed-width line.
///
/// Fillers are written with the layout's filler character and ignored on read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Filler {
    pub offset: usize,
    pub width: usize,
}

/// Immutable description of a record line.
#[derive(Clone, Debug)]
pub struct Layout {
    mode: LayoutMode,
    fields: Arc<[FieldDefinition]>,
    fillers: Arc<[Filler]>,
    terminator: LineTerminator,
    skip_blank_lines: bool,
    has_header: bool,
    filler_char: char,
}

impl Layout {
    /// Assembles a layout from fields carrying explicit positions.
    ///
    /// Nothing is checked here; the engine validates the layout before it touches a
    /// stream. Use [`LayoutBuilder`] to get positions assigned and options set.
    #[must_use]
    pub fn from_parts(mode: LayoutMode, fields: Vec<FieldDefinition>, fillers: Vec<Filler>) -> Self {
        Layout {
            mode,
            fields: fields.into(),
            fillers: fillers.into(),
            terminator: LineTerminator::default(),
            skip_blank_lines: false,
            has_header: false,
            filler_char: ' ',
        }
    }

    #[must_use]
    pub fn mode(&self) -> &LayoutMode {
        &self.mode
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name() == name)
    }

    #[must_use]
    pub fn fillers(&self) -> &[Filler] {
        &self.fillers
    }

    #[must_use]
    pub fn terminator(&self) -> &LineTerminator {
        &self.terminator
    }

    #[must_use]
    pub const fn skips_blank_lines(&self) -> bool {
        self.skip_blank_lines
    }

    #[must_use]
    pub const fn has_header(&self) -> bool {
        self.has_header
    }

    #[must_use]
    pub const fn filler_char(&self) -> char {
        self.filler_char
    }

    #[must_use]
    pub const fn is_fixed_width(&self) -> bool {
        matches!(self.mode, LayoutMode::FixedWidth)
    }

    /// Full width of a fixed-width line, fillers included; 0 for delimited layouts.
    #[must_use]
    pub fn record_width(&self) -> usize {
        let fields = self.fields.iter().filter_map(|f| f.position().end());
        let fillers = self.fillers.iter().map(|f| f.offset + f.width);
        fields.chain(fillers).max().unwrap_or(0)
    }

    /// Minimum length of a fixed-width line: the end of the last required field.
    #[must_use]
    pub fn required_width(&self) -> usize {
        self.fields
            .iter()
            .filter(|f| !f.is_optional())
            .filter_map(|f| f.position().end())
            .max()
            .unwrap_or(0)
    }

    /// Checks every schema invariant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LayoutInvalid`] naming the first violation found.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_flatfile::{converter, FieldDefinition, LayoutBuilder};
    ///
    /// let result = LayoutBuilder::fixed_width()
    ///     .field(FieldDefinition::new("id", 3, converter::integer()))
    ///     .field(FieldDefinition::new("id", 3, converter::integer()))
    ///     .build();
    /// assert!(result.is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(Error::layout("a layout needs at least one field"));
        }
        if self.terminator.as_str().is_empty() {
            return Err(Error::layout("the line terminator must not be empty"));
        }

        let mut names = HashSet::with_capacity(self.fields.len());
        let mut seen_optional = false;
        for field in self.fields.iter() {
            if field.name().is_empty() {
                return Err(Error::layout("field names must not be empty"));
            }
            if !names.insert(field.name()) {
                return Err(Error::layout(format!("duplicate field name '{}'", field.name())));
            }
            if field.is_optional() {
                seen_optional = true;
            } else if seen_optional {
                return Err(Error::layout(format!(
                    "required field '{}' follows an optional field",
                    field.name()
                )));
            }
            field
                .converter()
                .validate()
                .map_err(|msg| Error::layout(format!("field '{}': {}", field.name(), msg)))?;
        }

        match &self.mode {
            LayoutMode::FixedWidth => self.validate_fixed(),
            LayoutMode::Delimited(options) => self.validate_delimited(options),
        }
    }

    fn validate_fixed(&self) -> Result<()> {
        if self.has_header {
            return Err(Error::layout("headers are only supported by delimited layouts"));
        }

        let mut slots = Vec::with_capacity(self.fields.len() + self.fillers.len());
        let mut previous_end = None;
        for field in self.fields.iter() {
            let (offset, width) = match field.position() {
                FieldPosition::Fixed { offset, width } => (offset, width),
                FieldPosition::Delimited { .. } => {
                    return Err(Error::layout(format!(
                        "field '{}' has no width in a fixed-width layout",
                        field.name()
                    )))
                }
            };
            if width == 0 {
                return Err(Error::layout(format!("field '{}' has zero width", field.name())));
            }
            if previous_end.map_or(false, |end| offset < end) {
                return Err(Error::layout(format!(
                    "field '{}' at offset {} is out of order or overlaps the previous field",
                    field.name(),
                    offset
                )));
            }
            previous_end = Some(offset + width);
            slots.push((offset, width, field.name()));
        }
        for filler in self.fillers.iter() {
            if filler.width == 0 {
                return Err(Error::layout(format!("filler at offset {} has zero width", filler.offset)));
            }
            slots.push((filler.offset, filler.width, "<filler>"));
        }

        slots.sort_by_key(|(offset, _, _)| *offset);
        let mut cursor = 0;
        for (offset, width, name) in slots {
            if offset > cursor {
                return Err(Error::layout(format!(
                    "gap of {} characters before '{}' at offset {}",
                    offset - cursor,
                    name,
                    offset
                )));
            }
            if offset < cursor {
                return Err(Error::layout(format!("'{}' at offset {} overlaps another slot", name, offset)));
            }
            cursor = offset + width;
        }
        Ok(())
    }

    fn validate_delimited(&self, options: &DelimitedOptions) -> Result<()> {
        if !self.fillers.is_empty() {
            return Err(Error::layout("fillers are only supported by fixed-width layouts"));
        }

        for (index, field) in self.fields.iter().enumerate() {
            match field.position() {
                FieldPosition::Delimited { ordinal } if ordinal == index => {}
                FieldPosition::Delimited { ordinal } => {
                    return Err(Error::layout(format!(
                        "field '{}' has ordinal {} but is at position {}",
                        field.name(),
                        ordinal,
                        index
                    )))
                }
                FieldPosition::Fixed { .. } => {
                    return Err(Error::layout(format!(
                        "field '{}' has a fixed position in a delimited layout",
                        field.name()
                    )))
                }
            }
        }

        let separator = options.separator;
        if matches!(separator, '\r' | '\n') {
            return Err(Error::layout("the separator must not be a line break"));
        }
        if options.quote == Some(separator) || options.escape == Some(separator) {
            return Err(Error::layout("the separator must differ from the quote and escape characters"));
        }
        if options.quote.map_or(false, |q| matches!(q, '\r' | '\n')) {
            return Err(Error::layout("the quote character must not be a line break"));
        }
        let terminator = self.terminator.as_str();
        if terminator.contains(separator) || options.quote.map_or(false, |q| terminator.contains(q)) {
            return Err(Error::layout(
                "the line terminator must not contain the separator or quote character",
            ));
        }

        if self.has_header {
            for field in self.fields.iter() {
                // the header is skipped as a single physical line
                if field.name().contains(['\r', '\n']) {
                    return Err(Error::layout(format!(
                        "header name {:?} contains a line break",
                        field.name()
                    )));
                }
                delimited::quote(field.name(), options, terminator).map_err(|msg| {
                    Error::layout(format!("header name '{}': {}", field.name(), msg))
                })?;
            }
        }
        Ok(())
    }

    /// Record of default values, produced for a blank line.
    #[must_use]
    pub fn blank_record(&self) -> Record {
        self.fields
            .iter()
            .map(|f| (f.name().to_string(), f.default_value()))
            .collect()
    }

    /// Decodes one complete line (terminator removed) into a record.
    ///
    /// `line_no` is the 1-based number used in errors.
    ///
    /// # Errors
    ///
    /// [`Error::RecordTooShort`], [`Error::TokenCountMismatch`],
    /// [`Error::MalformedRecord`] or [`Error::Conversion`].
    pub fn decode(&self, line: &str, line_no: usize) -> Result<Record> {
        self.decode_line(line, line_no)?
            .ok_or_else(|| Error::malformed(line_no, "unterminated quoted token"))
    }

    /// Like [`Layout::decode`], but returns `None` when a quoted token is still open,
    /// meaning the record continues on the next physical line.
    pub(crate) fn decode_line(&self, line: &str, line_no: usize) -> Result<Option<Record>> {
        if line.is_empty() {
            return Ok(Some(self.blank_record()));
        }
        match &self.mode {
            LayoutMode::FixedWidth => self.decode_fixed(line, line_no).map(Some),
            LayoutMode::Delimited(options) => self.decode_delimited(line, options, line_no),
        }
    }

    fn decode_fixed(&self, line: &str, line_no: usize) -> Result<Record> {
        // byte offset of every char boundary, only needed for non-ASCII lines
        let bounds: Option<Vec<usize>> = if line.is_ascii() {
            None
        } else {
            Some(
                line.char_indices()
                    .map(|(i, _)| i)
                    .chain(std::iter::once(line.len()))
                    .collect(),
            )
        };
        let length = bounds.as_ref().map_or(line.len(), |b| b.len() - 1);

        let required = self.required_width();
        if length < required {
            return Err(Error::RecordTooShort {
                line: line_no,
                expected: required,
                found: length,
            });
        }

        let mut record = Record::with_capacity(self.fields.len());
        for field in self.fields.iter() {
            let FieldPosition::Fixed { offset, width } = field.position() else {
                return Err(Error::layout(format!("field '{}' has no width", field.name())));
            };
            let value = if offset >= length {
                missing_value(field)
            } else {
                let end = (offset + width).min(length);
                field.decode_at(char_slice(line, bounds.as_deref(), offset, end), line_no)?
            };
            record.insert(field.name().to_string(), value);
        }
        Ok(record)
    }

    fn decode_delimited(
        &self,
        line: &str,
        options: &DelimitedOptions,
        line_no: usize,
    ) -> Result<Option<Record>> {
        let tokens = match delimited::split(line, options) {
            Scan::Complete(tokens) => tokens,
            Scan::Unterminated => return Ok(None),
        };

        let required = self.fields.iter().filter(|f| !f.is_optional()).count();
        if tokens.len() > self.fields.len() || tokens.len() < required {
            return Err(Error::TokenCountMismatch {
                line: line_no,
                expected: self.fields.len(),
                found: tokens.len(),
            });
        }

        let mut record = Record::with_capacity(self.fields.len());
        let mut tokens = tokens.into_iter();
        for field in self.fields.iter() {
            let value = match tokens.next() {
                Some(token) => field.decode_at(&token, line_no)?,
                None => missing_value(field),
            };
            record.insert(field.name().to_string(), value);
        }
        Ok(Some(record))
    }

    /// Encodes a record into one line, without the terminator.
    ///
    /// Record entries the layout does not name are ignored. `entity` is the 1-based
    /// ordinal used in errors.
    ///
    /// # Errors
    ///
    /// [`Error::EntityExtraction`] when a layout field is missing from the record,
    /// otherwise [`Error::Format`], [`Error::FieldOverflow`] or
    /// [`Error::Unrepresentable`].
    pub fn encode(&self, record: &Record, entity: usize) -> Result<String> {
        match &self.mode {
            LayoutMode::FixedWidth => self.encode_fixed(record, entity),
            LayoutMode::Delimited(options) => self.encode_delimited(record, options, entity),
        }
    }

    fn encode_fixed(&self, record: &Record, entity: usize) -> Result<String> {
        let width = self.record_width();
        let terminator = self.terminator.as_str();
        let filler = Padding::left(self.filler_char);
        let mut line = String::with_capacity(width);
        let mut cursor = 0;

        for field in self.fields.iter() {
            let FieldPosition::Fixed { offset, width } = field.position() else {
                return Err(Error::layout(format!("field '{}' has no width", field.name())));
            };
            if offset > cursor {
                line.push_str(&filler.pad("", offset - cursor));
            }
            let token = field.encode(lookup(record, field, entity)?, entity)?;
            // fixed-width lines cannot carry a line break
            if token.contains(['\r', '\n']) || token.contains(terminator) {
                return Err(Error::Unrepresentable {
                    entity,
                    field: field.name().to_string(),
                    msg: "fixed-width values cannot contain a line break or the line terminator"
                        .to_string(),
                });
            }
            line.push_str(&token);
            cursor = offset + width;
        }
        if width > cursor {
            line.push_str(&filler.pad("", width - cursor));
        }
        Ok(line)
    }

    fn encode_delimited(
        &self,
        record: &Record,
        options: &DelimitedOptions,
        entity: usize,
    ) -> Result<String> {
        let terminator = self.terminator.as_str();
        let mut line = String::new();

        for (index, field) in self.fields.iter().enumerate() {
            if index > 0 {
                line.push(options.separator);
            }
            let token = field.encode(lookup(record, field, entity)?, entity)?;
            let quoted = delimited::quote(&token, options, terminator).map_err(|msg| {
                Error::Unrepresentable {
                    entity,
                    field: field.name().to_string(),
                    msg,
                }
            })?;
            line.push_str(&quoted);
        }

        // an empty single-column line would read back as a blank line
        if line.is_empty() {
            if let Some(q) = options.quote {
                line.push(q);
                line.push(q);
            }
        }
        Ok(line)
    }

    /// Header line listing the field names, for delimited layouts with a header.
    pub(crate) fn header_line(&self) -> Result<Option<String>> {
        let LayoutMode::Delimited(options) = &self.mode else {
            return Ok(None);
        };
        if !self.has_header {
            return Ok(None);
        }

        let terminator = self.terminator.as_str();
        let mut names = Vec::with_capacity(self.fields.len());
        for field in self.fields.iter() {
            let name = delimited::quote(field.name(), options, terminator).map_err(|msg| {
                Error::layout(format!("header name '{}': {}", field.name(), msg))
            })?;
            names.push(name.into_owned());
        }
        Ok(Some(names.join(&options.separator.to_string())))
    }
}

fn missing_value(field: &FieldDefinition) -> Value {
    if field.is_nullable() {
        Value::Null
    } else {
        field.default_value()
    }
}

fn lookup<'r>(record: &'r Record, field: &FieldDefinition, entity: usize) -> Result<&'r Value> {
    record.get(field.name()).ok_or_else(|| Error::EntityExtraction {
        entity,
        msg: format!("no value for field '{}'", field.name()),
    })
}

/// Slices `line` by character positions.
fn char_slice<'a>(line: &'a str, bounds: Option<&[usize]>, start: usize, end: usize) -> &'a str {
    match bounds {
        None => &line[start..end],
        Some(bounds) => &line[bounds[start]..bounds[end]],
    }
}

/// Builds a validated [`Layout`].
///
/// Fixed-width offsets and delimited ordinals are assigned in the order fields
/// (and fillers) are added.
///
/// # Examples
///
/// ```rust
/// use serde_flatfile::{converter, FieldDefinition, LayoutBuilder, LineTerminator};
///
/// let layout = LayoutBuilder::delimited('|')
///     .escape('\\')
///     .with_header()
///     .terminator(LineTerminator::CrLf)
///     .field(FieldDefinition::column("sku", converter::string()))
///     .field(FieldDefinition::column("qty", converter::integer()))
///     .build()
///     .unwrap();
///
/// assert_eq!(layout.fields().len(), 2);
/// assert!(layout.has_header());
/// ```
#[derive(Clone, Debug)]
pub struct LayoutBuilder {
    mode: LayoutMode,
    fields: Vec<FieldDefinition>,
    fillers: Vec<Filler>,
    cursor: usize,
    terminator: LineTerminator,
    skip_blank_lines: bool,
    has_header: bool,
    filler_char: char,
}

impl LayoutBuilder {
    fn with_mode(mode: LayoutMode) -> Self {
        LayoutBuilder {
            mode,
            fields: Vec::new(),
            fillers: Vec::new(),
            cursor: 0,
            terminator: LineTerminator::default(),
            skip_blank_lines: false,
            has_header: false,
            filler_char: ' ',
        }
    }

    #[must_use]
    pub fn fixed_width() -> Self {
        LayoutBuilder::with_mode(LayoutMode::FixedWidth)
    }

    /// Starts a delimited layout with `separator`, double-quote quoting and no escape.
    #[must_use]
    pub fn delimited(separator: char) -> Self {
        LayoutBuilder::with_options(DelimitedOptions::csv().with_separator(separator))
    }

    /// Starts a delimited layout with complete tokenizing options.
    #[must_use]
    pub fn with_options(options: DelimitedOptions) -> Self {
        LayoutBuilder::with_mode(LayoutMode::Delimited(options))
    }

    /// Appends a field.
    ///
    /// In a fixed-width layout the field starts where the previous slot ended; in a
    /// delimited layout it takes the next token index.
    #[must_use]
    pub fn field(mut self, field: FieldDefinition) -> Self {
        let field = match self.mode {
            LayoutMode::FixedWidth => match field.width() {
                Some(width) => {
                    let field = field.at(self.cursor);
                    self.cursor += width;
                    field
                }
                // left for validate() to report
                None => field,
            },
            LayoutMode::Delimited(_) => field.with_position(FieldPosition::Delimited {
                ordinal: self.fields.len(),
            }),
        };
        self.fields.push(field);
        self
    }

    /// Reserves `width` unnamed characters after the last slot.
    #[must_use]
    pub fn filler(mut self, width: usize) -> Self {
        self.fillers.push(Filler {
            offset: self.cursor,
            width,
        });
        self.cursor += width;
        self
    }

    /// Sets the quote character of a delimited layout.
    #[must_use]
    pub fn quote(mut self, quote: char) -> Self {
        if let LayoutMode::Delimited(options) = &mut self.mode {
            options.quote = Some(quote);
        }
        self
    }

    /// Disables quoting in a delimited layout.
    #[must_use]
    pub fn without_quote(mut self) -> Self {
        if let LayoutMode::Delimited(options) = &mut self.mode {
            options.quote = None;
        }
        self
    }

    /// Sets the escape character of a delimited layout.
    #[must_use]
    pub fn escape(mut self, escape: char) -> Self {
        if let LayoutMode::Delimited(options) = &mut self.mode {
            options.escape = Some(escape);
        }
        self
    }

    #[must_use]
    pub fn terminator(mut self, terminator: LineTerminator) -> Self {
        self.terminator = terminator;
        self
    }

    /// Skips blank lines on read instead of producing default records.
    #[must_use]
    pub fn skip_blank_lines(mut self) -> Self {
        self.skip_blank_lines = true;
        self
    }

    /// Writes the field names as a first line, and skips that line on read.
    #[must_use]
    pub fn with_header(mut self) -> Self {
        self.has_header = true;
        self
    }

    /// Character written into filler gaps (default space).
    #[must_use]
    pub fn filler_char(mut self, ch: char) -> Self {
        self.filler_char = ch;
        self
    }

    /// Produces the layout without validating it.
    #[must_use]
    pub fn build_unchecked(self) -> Layout {
        Layout {
            mode: self.mode,
            fields: self.fields.into(),
            fillers: self.fillers.into(),
            terminator: self.terminator,
            skip_blank_lines: self.skip_blank_lines,
            has_header: self.has_header,
            filler_char: self.filler_char,
        }
    }

    /// Produces the layout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LayoutInvalid`] when the layout breaks a schema invariant.
    pub fn build(self) -> Result<Layout> {
        let layout = self.build_unchecked();
        layout.validate()?;
        Ok(layout)
    }
}
