//! MIME transfer encodings.
//!
//! Supports Base64, Quoted-Printable, and RFC 2047 header encoding. All
//! encoders emit CRLF line endings and keep lines within the 76 column
//! limit of RFC 2045.

use crate::header::{FOLD_WIDTH, MAX_HEADER_LINE};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write as _;

/// Maximum encoded line length (RFC 2045, section 6.7 and 6.8).
pub const MAX_LINE_LENGTH: usize = 76;

/// Raw bytes that fit into one `=?utf-8?B?...?=` word of at most 75 chars.
const ENCODED_WORD_CHUNK: usize = 45;

/// Encodes data as Base64 without line breaks.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64, wrapped at [`MAX_LINE_LENGTH`] columns.
#[must_use]
pub fn encode_base64_wrapped(data: &[u8]) -> String {
    let encoded = encode_base64(data);
    let mut result = String::with_capacity(encoded.len() + encoded.len() / 38 + 2);

    for (index, ch) in encoded.chars().enumerate() {
        if index > 0 && index % MAX_LINE_LENGTH == 0 {
            result.push_str("\r\n");
        }
        result.push(ch);
    }

    result
}

/// Encodes text using Quoted-Printable encoding (RFC 2045).
///
/// Line breaks in the input (`\n` or `\r\n`) are kept as hard CRLF breaks;
/// longer lines get soft breaks. Trailing whitespace is always escaped.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 8);

    for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
            result.push_str("\r\n");
        }
        let line = line.strip_suffix('\r').unwrap_or(line);
        encode_quoted_printable_line(line.as_bytes(), &mut result);
    }

    result
}

fn encode_quoted_printable_line(line: &[u8], result: &mut String) {
    let mut column = 0;

    for (index, &byte) in line.iter().enumerate() {
        let is_last = index + 1 == line.len();
        let literal = match byte {
            b'!'..=b'<' | b'>'..=b'~' => true,
            b' ' | b'\t' => !is_last,
            _ => false,
        };
        let width = if literal { 1 } else { 3 };

        // Leave one column for the soft break marker.
        if column + width > MAX_LINE_LENGTH - 1 {
            result.push_str("=\r\n");
            column = 0;
        }

        if literal {
            result.push(byte as char);
        } else {
            let _ = write!(result, "={byte:02X}");
        }
        column += width;
    }
}

/// Returns true if a header value can be written without RFC 2047 encoding.
#[must_use]
pub fn is_plain_header_text(text: &str) -> bool {
    !text.contains("=?") && text.chars().all(|c| c == ' ' || c.is_ascii_graphic())
}

/// Returns true if some space-separated word is too long to fit on a folded
/// header line.
#[must_use]
pub fn has_unfoldable_word(text: &str) -> bool {
    text.split(' ')
        .any(|word| word.len() > MAX_HEADER_LINE - FOLD_WIDTH)
}

/// Encodes a header value using RFC 2047 `B` encoded words when needed.
///
/// Plain printable ASCII is returned unchanged and left to header folding,
/// unless one of its words is too long to fold. Otherwise the value goes
/// through [`encode_rfc2047_words`].
#[must_use]
pub fn encode_rfc2047(text: &str) -> String {
    if is_plain_header_text(text) && !has_unfoldable_word(text) {
        return text.to_string();
    }
    encode_rfc2047_words(text)
}

/// Encodes text as RFC 2047 `B` encoded words of at most 75 characters,
/// split on character boundaries and separated by a folding CRLF + space.
#[must_use]
pub fn encode_rfc2047_words(text: &str) -> String {
    let mut words = Vec::new();
    let mut chunk = String::new();

    for ch in text.chars() {
        if chunk.len() + ch.len_utf8() > ENCODED_WORD_CHUNK {
            words.push(encoded_word(&chunk));
            chunk.clear();
        }
        chunk.push(ch);
    }
    if !chunk.is_empty() {
        words.push(encoded_word(&chunk));
    }

    words.join("\r\n ")
}

fn encoded_word(chunk: &str) -> String {
    format!("=?utf-8?B?{}?=", encode_base64(chunk.as_bytes()))
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
    use proptest::prelude::*;

    #[test]
    fn test_base64_encode() {
        assert_eq!(encode_base64(b"Hello, World!"), "SGVsbG8sIFdvcmxkIQ==");
    }

    #[test]
    fn test_base64_wrapped_breaks_at_76() {
        let encoded = encode_base64_wrapped(&[0u8; 120]);
        let lines: Vec<&str> = encoded.split("\r\n").collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].len(), 76);
        assert_eq!(lines[1].len(), 76);
        assert_eq!(lines[2].len(), 8);
    }

    #[test]
    fn test_base64_wrapped_short_input() {
        assert_eq!(encode_base64_wrapped(b"a,b,c"), "YSxiLGM=");
    }

    #[test]
    fn test_quoted_printable_plain_ascii() {
        assert_eq!(encode_quoted_printable("Hello, World!"), "Hello, World!");
    }

    #[test]
    fn test_quoted_printable_non_ascii() {
        assert_eq!(encode_quoted_printable("Héllo"), "H=C3=A9llo");
    }

    #[test]
    fn test_quoted_printable_escapes_equals() {
        assert_eq!(encode_quoted_printable("a=b"), "a=3Db");
    }

    #[test]
    fn test_quoted_printable_hard_breaks_become_crlf() {
        assert_eq!(encode_quoted_printable("one\ntwo\r\nthree"), "one\r\ntwo\r\nthree");
    }

    #[test]
    fn test_quoted_printable_trailing_space() {
        assert_eq!(encode_quoted_printable("end \nnext"), "end=20\r\nnext");
    }

    #[test]
    fn test_quoted_printable_soft_break() {
        let text = "x".repeat(100);
        let encoded = encode_quoted_printable(&text);
        let lines: Vec<&str> = encoded.split("\r\n").collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], format!("{}=", "x".repeat(75)));
        assert_eq!(lines[1], "x".repeat(25));
    }

    #[test]
    fn test_rfc2047_plain_passthrough() {
        assert_eq!(encode_rfc2047("Weekly report"), "Weekly report");
    }

    #[test]
    fn test_rfc2047_non_ascii() {
        assert_eq!(encode_rfc2047("Héllo"), "=?utf-8?B?SMOpbGxv?=");
    }

    #[test]
    fn test_rfc2047_control_characters_are_encoded() {
        let encoded = encode_rfc2047("Hi\r\nBcc: victim@example.com");
        assert!(encoded.starts_with("=?utf-8?B?"));
        assert!(!encoded.contains("Bcc:"));
    }

    #[test]
    fn test_rfc2047_long_value_is_split() {
        let encoded = encode_rfc2047(&"é".repeat(40));
        let words: Vec<&str> = encoded.split("\r\n ").collect();
        assert_eq!(words.len(), 2);
        assert!(words.iter().all(|w| w.len() <= 75));
    }

    #[test]
    fn test_rfc2047_long_plain_text_is_left_for_folding() {
        let subject = "word ".repeat(240);
        assert_eq!(encode_rfc2047(&subject), subject);
    }

    #[test]
    fn test_rfc2047_unfoldable_word_is_encoded() {
        let encoded = encode_rfc2047(&"x".repeat(1200));
        assert!(encoded.starts_with("=?utf-8?B?"));
        assert!(encoded.split("\r\n").all(|line| line.len() <= 76));
    }

    proptest! {
        #[test]
        fn quoted_printable_lines_fit(text in "\\PC{0,400}") {
            let encoded = encode_quoted_printable(&text);
            for line in encoded.split("\r\n") {
                prop_assert!(line.len() <= MAX_LINE_LENGTH);
            }
        }

        #[test]
        fn quoted_printable_is_ascii(text in "\\PC{0,200}") {
            prop_assert!(encode_quoted_printable(&text).is_ascii());
        }

        #[test]
        fn rfc2047_words_fit(text in "\\PC{1,200}") {
            for word in encode_rfc2047(&text).split("\r\n ") {
                prop_assert!(word.len() <= 75 || is_plain_header_text(word));
            }
        }
    }
}
