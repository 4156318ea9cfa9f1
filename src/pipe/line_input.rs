use crate::logging;
use crate::pipe::{PipeError, PipeResult};
use std::io::BufRead;

/// Line source for the request parser.
///
/// Delivers trimmed, non-blank lines: CR bytes are dropped, leading and
/// trailing whitespace is removed, and blank lines are skipped. A partial
/// line at end of input is discarded with a warning.
pub(crate) struct LineInput<R> {
    reader: R,
    raw: Vec<u8>,
}

impl<R> std::fmt::Debug for LineInput<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "LineInput {{ .. }}")
    }
}

impl<R: BufRead> LineInput<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            raw: Vec::with_capacity(128),
        }
    }

    /// The next non-blank line, or `None` at end of input.
    ///
    /// With `required`, end of input is an error instead.
    pub(crate) fn next_line(&mut self, required: bool) -> PipeResult<Option<String>> {
        loop {
            self.raw.clear();
            let count = self.reader.read_until(b'\n', &mut self.raw)?;

            if count == 0 {
                if required {
                    return Err(PipeError::UnexpectedEndOfInput);
                }
                return Ok(None);
            }

            let terminated = self.raw.last() == Some(&b'\n');
            self.raw.retain(|byte| *byte != b'\r' && *byte != b'\n');
            if !terminated {
                if !self.raw.iter().all(u8::is_ascii_whitespace) {
                    warn!("Lost characters at end of input");
                }
                if required {
                    return Err(PipeError::UnexpectedEndOfInput);
                }
                return Ok(None);
            }

            let line = String::from_utf8_lossy(&self.raw);
            let line = line.trim_matches(|c: char| c.is_whitespace());
            if line.is_empty() {
                continue;
            }

            trace!("Received: {{{line}}}");
            return Ok(Some(line.to_string()));
        }
    }
}

/// Splits a request line into space-separated fields.
///
/// Fields are separated by runs of spaces; [`FieldCursor::rest`] hands out
/// the unsplit remainder for the state/value grammar.
#[derive(Debug)]
pub(crate) struct FieldCursor {
    line: String,
    position: usize,
}

impl FieldCursor {
    pub(crate) fn new(line: String) -> Self {
        Self { line, position: 0 }
    }

    /// The next field, or `None` when the line is exhausted.
    ///
    /// With `required`, exhaustion is a format error instead.
    pub(crate) fn next_field(&mut self, required: bool) -> PipeResult<Option<String>> {
        if self.position >= self.line.len() {
            if required {
                return Err(PipeError::UnexpectedFormat);
            }
            return Ok(None);
        }

        let rest = &self.line[self.position..];
        let start = rest.len() - rest.trim_start_matches(' ').len();
        let rest = &rest[start..];
        let end = rest.find(' ').unwrap_or(rest.len());
        let field = &rest[..end];
        self.position += start + end + 1;

        if logging::is_enabled(logging::Level::All) {
            trace!("Field: {{{field}}}");
        }

        Ok(Some(field.to_string()))
    }

    /// The next field; exhaustion is a format error.
    pub(crate) fn require_field(&mut self) -> PipeResult<String> {
        self.next_field(true)?.ok_or(PipeError::UnexpectedFormat)
    }

    /// The remainder of the line, with leading spaces skipped.
    pub(crate) fn rest(&mut self) -> &str {
        if self.position >= self.line.len() {
            return "";
        }
        let rest = self.line[self.position..].trim_start_matches(' ');
        self.position = self.line.len();
        rest
    }
}

/// Parses a complete decimal field.
pub(crate) fn parse_decimal(field: &str) -> PipeResult<i32> {
    field
        .parse::<i32>()
        .map_err(|_| PipeError::BadDecimal(field.to_string()))
}
