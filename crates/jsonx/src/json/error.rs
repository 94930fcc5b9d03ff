//! Parse error type.

use thiserror::Error;

/// Why a text failed to decode. Every variant carries the byte offset where
/// decoding stopped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected end of input at byte {position}")]
    UnexpectedEnd { position: usize },
    #[error("unexpected character {ch:?} at byte {position}")]
    UnexpectedChar { ch: char, position: usize },
    #[error("invalid number at byte {position}")]
    InvalidNumber { position: usize },
    #[error("invalid string escape at byte {position}")]
    InvalidString { position: usize },
    #[error("unescaped control character in string at byte {position}")]
    ControlCharacter { position: usize },
    #[error("unexpected trailing characters at byte {position}")]
    TrailingCharacters { position: usize },
    #[error("nesting exceeds {max_depth} levels at byte {position}")]
    DepthLimitExceeded { max_depth: usize, position: usize },
    #[error("invalid UTF-8 at byte {position}")]
    InvalidUtf8 { position: usize },
}

impl ParseError {
    pub fn position(&self) -> usize {
        match *self {
            ParseError::UnexpectedEnd { position }
            | ParseError::UnexpectedChar { position, .. }
            | ParseError::InvalidNumber { position }
            | ParseError::InvalidString { position }
            | ParseError::ControlCharacter { position }
            | ParseError::TrailingCharacters { position }
            | ParseError::DepthLimitExceeded { position, .. }
            | ParseError::InvalidUtf8 { position } => position,
        }
    }

    /// 1-based `(line, column)` of the error inside `text`. Columns count
    /// characters, not bytes.
    pub fn line_col(&self, text: &str) -> (usize, usize) {
        let bytes = text.as_bytes();
        let prefix = &bytes[..self.position().min(bytes.len())];
        let line = prefix.iter().filter(|&&b| b == b'\n').count() + 1;
        let line_start = prefix
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        let column = String::from_utf8_lossy(&prefix[line_start..]).chars().count() + 1;
        (line, column)
    }
}
