//! Streaming record writer.

use crate::error::Result;
use crate::layout::Layout;
use crate::ser::to_record;
use log::{debug, trace, warn};
use serde::Serialize;
use std::io::Write;

/// Writes entities as lines of a [`Layout`], one at a time.
///
/// Every entity is fully formatted before any of its bytes reach the stream, so a
/// failing entity leaves no partial line behind. Lines of earlier entities stay
/// written.
///
/// # Examples
///
/// ```rust
/// use serde::Serialize;
/// use serde_flatfile::{converter, FieldDefinition, LayoutBuilder, RecordWriter};
///
/// #[derive(Serialize)]
/// struct Item { sku: String, qty: u32 }
///
/// let layout = LayoutBuilder::delimited(';')
///     .with_header()
///     .field(FieldDefinition::column("sku", converter::string()))
///     .field(FieldDefinition::column("qty", converter::integer()))
///     .build()?;
///
/// let mut writer = RecordWriter::new(&layout, Vec::new())?;
/// writer.write(&Item { sku: "AB;1".into(), qty: 3 })?;
/// assert_eq!(writer.written(), 1);
///
/// let bytes = writer.into_inner()?;
/// assert_eq!(String::from_utf8(bytes).unwrap(), "sku;qty\n\"AB;1\";3\n");
/// # Ok::<(), serde_flatfile::Error>(())
/// ```
pub struct RecordWriter<W: Write> {
    layout: Layout,
    writer: W,
    written: usize,
}

impl<W: Write> RecordWriter<W> {
    /// Validates the layout and writes the header line, if the layout has one.
    ///
    /// # Errors
    ///
    /// [`Error::LayoutInvalid`](crate::Error::LayoutInvalid) or an I/O error from the
    /// header write.
    pub fn new(layout: &Layout, mut writer: W) -> Result<Self> {
        layout.validate()?;
        debug!(
            "writing {} layout with {} fields",
            if layout.is_fixed_width() { "fixed-width" } else { "delimited" },
            layout.fields().len()
        );

        if let Some(mut header) = layout.header_line()? {
            header.push_str(layout.terminator().as_str());
            writer.write_all(header.as_bytes())?;
        }

        Ok(RecordWriter {
            layout: layout.clone(),
            writer,
            written: 0,
        })
    }

    /// Formats one entity and writes it followed by the line terminator.
    ///
    /// # Errors
    ///
    /// Any error aborts the write of this entity; it carries the entity's 1-based
    /// ordinal and, for field failures, the field name.
    pub fn write<T: Serialize + ?Sized>(&mut self, entity: &T) -> Result<()> {
        let ordinal = self.written + 1;
        let encoded = to_record(entity)
            .map_err(|e| e.at_entity(ordinal))
            .and_then(|record| self.layout.encode(&record, ordinal));

        let mut line = match encoded {
            Ok(line) => line,
            Err(err) => {
                warn!("write aborted at entity {}: {}", ordinal, err);
                return Err(err);
            }
        };
        line.push_str(self.layout.terminator().as_str());
        if let Err(err) = self.writer.write_all(line.as_bytes()) {
            warn!("write aborted at entity {}: {}", ordinal, err);
            return Err(err.into());
        }

        self.written = ordinal;
        trace!("entity {}: wrote {} bytes", ordinal, line.len());
        Ok(())
    }

    /// Writes every entity of `entities`, stopping at the first error.
    pub fn write_all<'e, T, I>(&mut self, entities: I) -> Result<()>
    where
        T: Serialize + 'e,
        I: IntoIterator<Item = &'e T>,
    {
        for entity in entities {
            self.write(entity)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Number of entities written so far.
    #[must_use]
    pub const fn written(&self) -> usize {
        self.written
    }

    #[must_use]
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        debug!("finished writing: {} records", self.written);
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{converter, record, Error, FieldDefinition, LayoutBuilder};
    use std::io;
    use std::sync::Mutex;

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn layout() -> Layout {
        LayoutBuilder::fixed_width()
            .field(FieldDefinition::new("code", 3, converter::string()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_failed_entity_leaves_earlier_lines() {
        let mut writer = RecordWriter::new(&layout(), Vec::new()).unwrap();
        writer.write(&record! { "code" => "AB" }).unwrap();
        let err = writer.write(&record! { "code" => "TOOLONG" }).unwrap_err();
        assert!(matches!(err, Error::FieldOverflow { entity: 2, .. }));
        assert_eq!(writer.written(), 1);
        assert_eq!(writer.get_ref().as_slice(), b"AB \n");
    }

    #[test]
    fn test_io_errors_pass_through() {
        let mut writer = RecordWriter::new(&layout(), FailingWriter).unwrap();
        let err = writer.write(&record! { "code" => "AB" }).unwrap_err();
        match err {
            Error::Io(io) => assert_eq!(io.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("unexpected {:?}", other),
        }
    }

    static WARNINGS: Mutex<Vec<String>> = Mutex::new(Vec::new());

    struct WarnCapture;

    impl log::Log for WarnCapture {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.level() <= log::Level::Warn
        }

        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                if let Ok(mut warnings) = WARNINGS.lock() {
                    warnings.push(record.args().to_string());
                }
            }
        }

        fn flush(&self) {}
    }

    #[test]
    fn test_io_error_is_logged() {
        // fails harmlessly when a logger is already installed
        let _ = log::set_logger(&WarnCapture);
        log::set_max_level(log::LevelFilter::Warn);

        let mut writer = RecordWriter::new(&layout(), FailingWriter).unwrap();
        assert!(writer.write(&record! { "code" => "AB" }).is_err());

        let warnings = WARNINGS.lock().unwrap();
        assert!(
            warnings
                .iter()
                .any(|w| w.contains("write aborted at entity 1") && w.contains("closed")),
            "{:?}",
            *warnings
        );
    }

    #[test]
    fn test_invalid_layout_rejected_before_writing() {
        let invalid = LayoutBuilder::fixed_width().build_unchecked();
        assert!(matches!(
            RecordWriter::new(&invalid, Vec::new()),
            Err(Error::LayoutInvalid(_))
        ));
    }

    #[test]
    fn test_non_record_entity() {
        let mut writer = RecordWriter::new(&layout(), Vec::new()).unwrap();
        let err = writer.write(&42).unwrap_err();
        assert!(matches!(err, Error::EntityExtraction { entity: 1, .. }));
    }
}
