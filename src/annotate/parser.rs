//! Parser for the annotate tool's stdout.
//!
//! Each stdout line describes one source line:
//!
//! ```text
//! <revision>\t<author>\t<RFC 3339 timestamp>\t<source text>
//! ```
//!
//! The source text is discarded. The first failure is kept and every later
//! line is ignored, so the caller can keep draining the pipe.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::models::BlameLine;

const FIELD_SEPARATOR: char = '\t';

/// Why the output of one file could not be turned into blame records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    /// 1-based stdout line, `None` for whole-output problems such as a count mismatch
    pub line_number: Option<usize>,
    pub reason: String,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line_number {
            Some(n) => write!(f, "line {}: {}", n, self.reason),
            None => f.write_str(&self.reason),
        }
    }
}

#[derive(Debug, Default)]
pub struct BlameParser {
    lines: Vec<BlameLine>,
    consumed: usize,
    failure: Option<ParseFailure>,
}

impl BlameParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consume_line(&mut self, line: &str) {
        self.consumed += 1;
        if self.failure.is_some() {
            return;
        }
        match parse_line(line) {
            Ok(blame) => self.lines.push(blame),
            Err(reason) => {
                self.failure = Some(ParseFailure {
                    line_number: Some(self.consumed),
                    reason,
                })
            }
        }
    }

    /// Returns the records, reconciled against the host's line count.
    pub fn finish(self, expected_lines: usize) -> Result<Vec<BlameLine>, ParseFailure> {
        if let Some(failure) = self.failure {
            return Err(failure);
        }
        reconcile(self.lines, expected_lines)
    }
}

/// Parses a whole output at once.
pub fn parse<I, S>(output: I, expected_lines: usize) -> Result<Vec<BlameLine>, ParseFailure>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parser = BlameParser::new();
    for line in output {
        parser.consume_line(line.as_ref());
    }
    parser.finish(expected_lines)
}

pub fn parse_line(line: &str) -> Result<BlameLine, String> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let mut fields = line.splitn(4, FIELD_SEPARATOR);

    let revision = required_field(fields.next(), "revision")?;
    let author = required_field(fields.next(), "author")?;
    let date = parse_date(required_field(fields.next(), "date")?)?;

    Ok(BlameLine::new(revision, author, date))
}

fn required_field<'a>(field: Option<&'a str>, name: &str) -> Result<&'a str, String> {
    match field.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(format!("missing {}", name)),
    }
}

fn parse_date(raw: &str) -> Result<DateTime<Utc>, String> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| format!("invalid date '{}': {}", raw, e))?;

    // Formatting must give back the same instant.
    let formatted = parsed.to_rfc3339();
    match DateTime::parse_from_rfc3339(&formatted) {
        Ok(again) if again == parsed => Ok(parsed.with_timezone(&Utc)),
        _ => Err(format!("date '{}' does not round-trip (formatted as '{}')", raw, formatted)),
    }
}

/// The tool omits the trailing empty line of a file; that single missing
/// record is filled by repeating the last one. Any other mismatch is an error.
pub fn reconcile(mut lines: Vec<BlameLine>, expected_lines: usize) -> Result<Vec<BlameLine>, ParseFailure> {
    if lines.len() == expected_lines {
        return Ok(lines);
    }
    if expected_lines >= 1 && lines.len() == expected_lines - 1 {
        if let Some(last) = lines.last().cloned() {
            lines.push(last);
            return Ok(lines);
        }
    }
    Err(ParseFailure {
        line_number: None,
        reason: format!(
            "expected {} blame lines but the tool reported {}",
            expected_lines,
            lines.len()
        ),
    })
}
