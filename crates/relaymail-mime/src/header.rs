//! MIME header handling.

use crate::error::{Error, Result};
use std::fmt;

/// Line length header values are folded to when whitespace allows
/// (RFC 5322, section 2.1.1).
pub const FOLD_WIDTH: usize = 78;

/// Hard limit on a header line, excluding the CRLF.
pub const MAX_HEADER_LINE: usize = 998;

/// Ordered collection of email headers.
///
/// Headers are written in insertion order; lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a valid field name or the value
    /// contains a bare line break (header injection).
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        let value = value.into();
        validate(&name, &value)?;
        self.entries.push((name, value));
        Ok(())
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns true if no headers are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over all headers.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

fn validate(name: &str, value: &str) -> Result<()> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_graphic() && b != b':') {
        return Err(Error::InvalidHeader(format!("Invalid field name: {name:?}")));
    }

    // Folded values (CRLF followed by whitespace) are the only line breaks allowed.
    let folded_ok = value.split("\r\n").enumerate().all(|(index, line)| {
        !line.contains(['\r', '\n']) && (index == 0 || line.starts_with([' ', '\t']))
    });
    if !folded_ok {
        return Err(Error::InvalidHeader(format!("Line break in value of {name}")));
    }

    if fold(name, value)
        .split("\r\n")
        .any(|line| line.len() > MAX_HEADER_LINE)
    {
        return Err(Error::InvalidHeader(format!(
            "Value of {name} cannot be folded within {MAX_HEADER_LINE} characters"
        )));
    }

    Ok(())
}

/// Renders `name: value`, breaking lines longer than [`FOLD_WIDTH`] before
/// whitespace. Existing folds are kept.
fn fold(name: &str, value: &str) -> String {
    let mut out = String::with_capacity(name.len() + value.len() + 8);
    out.push_str(name);
    out.push_str(": ");
    let mut column = out.len();

    for (index, line) in value.split("\r\n").enumerate() {
        if index > 0 {
            out.push_str("\r\n");
            column = 0;
        }

        for piece in whitespace_pieces(line) {
            let starts_with_space = piece.starts_with([' ', '\t']);
            let has_text = piece.contains(|c: char| c != ' ' && c != '\t');
            if column + piece.len() > FOLD_WIDTH && starts_with_space && has_text && column > 0 {
                out.push_str("\r\n");
                column = 0;
            }
            out.push_str(piece);
            column += piece.len();
        }
    }

    out
}

/// Splits a line before each run of whitespace, so every piece but the
/// first starts with the whitespace a fold may go in front of.
fn whitespace_pieces(line: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut after_text = false;

    for (index, byte) in line.bytes().enumerate() {
        let space = byte == b' ' || byte == b'\t';
        if space && after_text {
            pieces.push(&line[start..index]);
            start = index;
        }
        after_text = !space;
    }
    pieces.push(&line[start..]);

    pieces
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.entries {
            write!(f, "{}\r\n", fold(name, value))?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain").unwrap();
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain"));
    }

    #[test]
    fn test_headers_keep_insertion_order() {
        let mut headers = Headers::new();
        headers.add("From", "a@example.com").unwrap();
        headers.add("To", "b@example.com").unwrap();
        headers.add("Subject", "Hi").unwrap();

        assert_eq!(
            headers.to_string(),
            "From: a@example.com\r\nTo: b@example.com\r\nSubject: Hi\r\n"
        );
    }

    #[test]
    fn test_headers_reject_injection() {
        let mut headers = Headers::new();
        assert!(headers.add("Subject", "Hi\r\nBcc: x@example.com").is_err());
        assert!(headers.add("Subject", "Hi\nBcc: x@example.com").is_err());
        assert!(headers.add("Bad Name", "value").is_err());
        assert!(headers.is_empty());
    }

    #[test]
    fn test_long_value_folds_at_whitespace() {
        let mut headers = Headers::new();
        let subject = "word ".repeat(240);
        headers.add("Subject", subject.trim_end()).unwrap();

        let rendered = headers.to_string();
        let lines: Vec<&str> = rendered.trim_end_matches("\r\n").split("\r\n").collect();
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|line| line.len() <= FOLD_WIDTH));
        assert!(lines[1..].iter().all(|line| line.starts_with(' ')));

        // Unfolding restores the value.
        let unfolded = rendered.trim_end_matches("\r\n").replace("\r\n", "");
        assert_eq!(unfolded, format!("Subject: {}", subject.trim_end()));
        assert_eq!(headers.get("Subject"), Some(subject.trim_end()));
    }

    #[test]
    fn test_long_word_stays_on_one_line() {
        let mut headers = Headers::new();
        let token = "x".repeat(200);
        headers.add("X-Token", format!("a {token}")).unwrap();
        assert_eq!(headers.to_string(), format!("X-Token: a\r\n {token}\r\n"));
    }

    #[test]
    fn test_unfoldable_value_is_rejected() {
        let mut headers = Headers::new();
        let err = headers.add("X-Token", "x".repeat(MAX_HEADER_LINE)).unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(_)));
        assert!(headers.is_empty());
    }

    #[test]
    fn test_trailing_whitespace_is_not_folded_alone() {
        let value = format!("{}   ", "a".repeat(80));
        assert_eq!(fold("X", &value), format!("X: {value}"));
    }

    #[test]
    fn test_headers_allow_folding() {
        let mut headers = Headers::new();
        headers
            .add("Subject", "=?utf-8?B?w6k=?=\r\n =?utf-8?B?w6k=?=")
            .unwrap();
        assert_eq!(headers.iter().count(), 1);
    }
}
