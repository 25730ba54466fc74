//! Tokenizing and quoting of delimited lines.

use crate::options::DelimitedOptions;
use std::borrow::Cow;

/// Result of scanning one line.
#[derive(Debug, PartialEq)]
pub(crate) enum Scan {
    Complete(Vec<String>),
    /// A quoted token is still open at the end of the input
    Unterminated,
}

/// An escape equal to the quote char means "doubled quotes", which is the default.
fn effective_escape(options: &DelimitedOptions) -> Option<char> {
    options.escape.filter(|e| Some(*e) != options.quote)
}

/// Splits a line on the separator, honouring quotes and escapes.
pub(crate) fn split(line: &str, options: &DelimitedOptions) -> Scan {
    let escape = effective_escape(options);
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    let mut in_quotes = false;
    let mut at_token_start = true;

    while let Some(ch) = chars.next() {
        if Some(ch) == escape {
            // a trailing escape stands for itself
            current.push(chars.next().unwrap_or(ch));
            at_token_start = false;
            continue;
        }

        if in_quotes {
            if Some(ch) == options.quote {
                if chars.peek() == Some(&ch) {
                    current.push(ch);
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(ch);
            }
            continue;
        }

        if ch == options.separator {
            tokens.push(std::mem::take(&mut current));
            at_token_start = true;
        } else if at_token_start && Some(ch) == options.quote {
            in_quotes = true;
            at_token_start = false;
        } else {
            current.push(ch);
            at_token_start = false;
        }
    }

    if in_quotes {
        return Scan::Unterminated;
    }
    tokens.push(current);
    Scan::Complete(tokens)
}

/// Quotes or escapes a token so that [`split`] reads it back unchanged.
///
/// Returns `Err` with a reason when the options offer no way to represent it.
pub(crate) fn quote<'a>(
    token: &'a str,
    options: &DelimitedOptions,
    terminator: &str,
) -> Result<Cow<'a, str>, String> {
    let escape = effective_escape(options);
    let has_line_break = token.contains('\n')
        || token.contains('\r')
        || (!terminator.is_empty() && token.contains(terminator));
    let needs_quoting = has_line_break
        || token.contains(options.separator)
        || options.quote.map_or(false, |q| token.contains(q))
        || escape.map_or(false, |e| token.contains(e));

    if !needs_quoting {
        return Ok(Cow::Borrowed(token));
    }

    if let Some(q) = options.quote {
        let mut out = String::with_capacity(token.len() + 2);
        out.push(q);
        for ch in token.chars() {
            if ch == q {
                out.push(escape.unwrap_or(q));
            } else if Some(ch) == escape {
                out.push(ch);
            }
            out.push(ch);
        }
        out.push(q);
        return Ok(Cow::Owned(out));
    }

    if has_line_break {
        return Err("line breaks require a quote character".to_string());
    }

    match escape {
        Some(e) => {
            let mut out = String::with_capacity(token.len() + 4);
            for ch in token.chars() {
                if ch == options.separator || ch == e {
                    out.push(e);
                }
                out.push(ch);
            }
            Ok(Cow::Owned(out))
        }
        None => Err(format!(
            "value contains the separator {:?} and no quote or escape character is configured",
            options.separator
        )),
    }
}
