//! Decoder helpers.

use super::error::ParseError;

/// Find the position of the closing `"` of a JSON string.
///
/// `x` must point to the first byte after the opening `"`. Backslash escapes
/// are honoured, so `\"` does not terminate the string.
pub fn find_ending_quote(data: &[u8], mut x: usize) -> Result<usize, ParseError> {
    let len = data.len();
    let mut prev: u8 = 0;
    while x < len {
        let ch = data[x];
        if ch == b'"' && prev != b'\\' {
            return Ok(x);
        }
        // double-backslash cancels the escape
        if ch == b'\\' && prev == b'\\' {
            prev = 0;
        } else {
            prev = ch;
        }
        x += 1;
    }
    Err(ParseError::UnexpectedEnd { position: len })
}

/// Character starting at byte `x`, for diagnostics.
pub fn char_at(data: &[u8], x: usize) -> char {
    let end = (x + 4).min(data.len());
    data.get(x..end)
        .and_then(|window| String::from_utf8_lossy(window).chars().next())
        .unwrap_or(char::REPLACEMENT_CHARACTER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_escaped_quotes() {
        let data = br#""a\"b""#;
        assert_eq!(find_ending_quote(data, 1), Ok(5));
    }

    #[test]
    fn escaped_backslash_does_not_escape_quote() {
        let data = br#""a\\"rest"#;
        assert_eq!(find_ending_quote(data, 1), Ok(4));
    }

    #[test]
    fn unterminated_string_reports_end() {
        assert_eq!(
            find_ending_quote(b"\"abc", 1),
            Err(ParseError::UnexpectedEnd { position: 4 })
        );
    }

    #[test]
    fn char_at_decodes_multibyte() {
        let data = "x€y".as_bytes();
        assert_eq!(char_at(data, 1), '€');
        assert_eq!(char_at(data, 2), char::REPLACEMENT_CHARACTER);
        assert_eq!(char_at(data, 10), char::REPLACEMENT_CHARACTER);
    }
}
