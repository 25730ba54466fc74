//! Formatting options shared by layouts and field definitions.
//!
//! - [`LineTerminator`]: how records are separated in the stream
//! - [`DelimitedOptions`]: separator, quote and escape characters of a delimited layout
//! - [`Padding`] and [`Alignment`]: how fixed-width values are padded and trimmed
//! - [`OverflowPolicy`]: what happens when a value does not fit its width
//!
//! ## Examples
//!
//! ```rust
//! use serde_flatfile::{DelimitedOptions, LineTerminator, Padding};
//!
//! let options = DelimitedOptions::new(';').with_quote('\'').with_escape('\\');
//! assert_eq!(options.separator, ';');
//!
//! assert_eq!(LineTerminator::CrLf.as_str(), "\r\n");
//! assert_eq!(Padding::right('0').strip("00042"), "42");
//! ```

/// Record separator used between lines.
///
/// On read, [`LineTerminator::Lf`] and [`LineTerminator::CrLf`] both accept `\n` with
/// an optional preceding `\r`, so files produced on either platform read the same.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum LineTerminator {
    #[default]
    Lf,
    CrLf,
    Custom(String),
}

impl LineTerminator {
    /// Returns the terminator written after every record.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_flatfile::LineTerminator;
    ///
    /// assert_eq!(LineTerminator::Lf.as_str(), "\n");
    /// assert_eq!(LineTerminator::Custom("~".to_string()).as_str(), "~");
    /// ```
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            LineTerminator::Lf => "\n",
            LineTerminator::CrLf => "\r\n",
            LineTerminator::Custom(s) => s,
        }
    }

    /// Returns `true` for the newline-based terminators.
    #[must_use]
    pub const fn is_newline(&self) -> bool {
        matches!(self, LineTerminator::Lf | LineTerminator::CrLf)
    }
}

/// Tokenizing rules of a delimited layout.
///
/// # Examples
///
/// ```rust
/// use serde_flatfile::DelimitedOptions;
///
/// let csv = DelimitedOptions::csv();
/// assert_eq!(csv.separator, ',');
/// assert_eq!(csv.quote, Some('"'));
/// assert_eq!(csv.escape, None);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelimitedOptions {
    pub separator: char,
    pub quote: Option<char>,
    pub escape: Option<char>,
}

impl Default for DelimitedOptions {
    fn default() -> Self {
        DelimitedOptions::csv()
    }
}

impl DelimitedOptions {
    /// Creates options with the given separator and no quoting or escaping.
    #[must_use]
    pub const fn new(separator: char) -> Self {
        DelimitedOptions {
            separator,
            quote: None,
            escape: None,
        }
    }

    /// Comma separated, double-quote quoting, quotes escaped by doubling.
    #[must_use]
    pub const fn csv() -> Self {
        DelimitedOptions {
            separator: ',',
            quote: Some('"'),
            escape: None,
        }
    }

    /// Tab separated, double-quote quoting.
    #[must_use]
    pub const fn tab() -> Self {
        DelimitedOptions {
            separator: '\t',
            quote: Some('"'),
            escape: None,
        }
    }

    /// Pipe separated, backslash escaping, no quoting.
    #[must_use]
    pub const fn pipe() -> Self {
        DelimitedOptions {
            separator: '|',
            quote: None,
            escape: Some('\\'),
        }
    }

    #[must_use]
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    #[must_use]
    pub fn with_quote(mut self, quote: char) -> Self {
        self.quote = Some(quote);
        self
    }

    /// Sets the escape character.
    ///
    /// When set, the escape makes the following character literal; when unset,
    /// quotes inside quoted tokens are escaped by doubling them.
    #[must_use]
    pub fn with_escape(mut self, escape: char) -> Self {
        self.escape = Some(escape);
        self
    }

    #[must_use]
    pub fn without_quote(mut self) -> Self {
        self.quote = None;
        self
    }
}

/// Side a value is aligned to inside its fixed-width slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Alignment {
    /// Value first, padding after (typical for text)
    #[default]
    Left,
    /// Padding first, value after (typical for numbers)
    Right,
}

/// Padding character and alignment of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Padding {
    pub ch: char,
    pub alignment: Alignment,
}

impl Default for Padding {
    fn default() -> Self {
        Padding::left(' ')
    }
}

impl Padding {
    #[must_use]
    pub const fn left(ch: char) -> Self {
        Padding {
            ch,
            alignment: Alignment::Left,
        }
    }

    #[must_use]
    pub const fn right(ch: char) -> Self {
        Padding {
            ch,
            alignment: Alignment::Right,
        }
    }

    /// Removes padding from a token read from a line.
    ///
    /// Right-aligned tokens lose their leading pad characters, left-aligned tokens
    /// their trailing ones.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_flatfile::Padding;
    ///
    /// assert_eq!(Padding::left(' ').strip("abc   "), "abc");
    /// assert_eq!(Padding::left(' ').strip("  abc"), "  abc");
    /// assert_eq!(Padding::right('0').strip("000120"), "120");
    /// ```
    #[must_use]
    pub fn strip<'a>(&self, token: &'a str) -> &'a str {
        match self.alignment {
            Alignment::Left => token.trim_end_matches(self.ch),
            Alignment::Right => token.trim_start_matches(self.ch),
        }
    }

    /// Pads `value` up to `width` characters on the side opposite the alignment.
    ///
    /// Values already `width` characters or longer are returned unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_flatfile::Padding;
    ///
    /// assert_eq!(Padding::right('0').pad("42", 5), "00042");
    /// assert_eq!(Padding::left('.').pad("ab", 4), "ab..");
    /// ```
    #[must_use]
    pub fn pad(&self, value: &str, width: usize) -> String {
        let len = value.chars().count();
        if len >= width {
            return value.to_string();
        }

        let fill: String = std::iter::repeat(self.ch).take(width - len).collect();
        match self.alignment {
            Alignment::Left => format!("{}{}", value, fill),
            Alignment::Right => format!("{}{}", fill, value),
        }
    }
}

/// What to do with a formatted value longer than its fixed width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Keep the first `width` characters
    Truncate,
    /// Fail the write with [`Error::FieldOverflow`](crate::Error::FieldOverflow)
    #[default]
    Error,
}
