//! Total JSON decoder producing [`Value`].
//!
//! Accepts the standard JSON grammar only. Every input, valid or not, yields
//! either a value or a [`ParseError`]; nothing panics, and nesting is bounded
//! by [`ParseOptions::max_depth`] so hostile input cannot overflow the stack.
//!
//! Timestamps and blobs are never reconstructed from text: strings decode as
//! [`Value::Str`] whatever their content.

use tracing::debug;

use super::error::ParseError;
use super::util::{char_at, find_ending_quote};
use crate::value::{Map, Number, Value};

/// Default limit on container nesting.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Options controlling decoding.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Maximum number of nested objects/arrays before decoding fails with
    /// [`ParseError::DepthLimitExceeded`].
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

pub struct JsonxDecoder {
    pub data: Vec<u8>,
    pub x: usize,
    depth: usize,
    options: ParseOptions,
}

impl Default for JsonxDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonxDecoder {
    pub fn new() -> Self {
        Self::with_options(ParseOptions::default())
    }

    pub fn with_options(options: ParseOptions) -> Self {
        Self {
            data: Vec::new(),
            x: 0,
            depth: 0,
            options,
        }
    }

    /// Decode one complete JSON document.
    pub fn decode(&mut self, input: &[u8]) -> Result<Value, ParseError> {
        self.data = input.to_vec();
        self.x = 0;
        self.depth = 0;
        let result = self.read_document();
        if let Err(err) = &result {
            debug!(position = err.position(), error = %err, "jsonx decode failed");
        }
        result
    }

    fn read_document(&mut self) -> Result<Value, ParseError> {
        let value = self.read_any()?;
        self.skip_whitespace();
        if self.x < self.data.len() {
            return Err(ParseError::TrailingCharacters { position: self.x });
        }
        Ok(value)
    }

    pub fn read_any(&mut self) -> Result<Value, ParseError> {
        self.skip_whitespace();
        let x = self.x;
        let Some(&ch) = self.data.get(x) else {
            return Err(ParseError::UnexpectedEnd { position: x });
        };
        match ch {
            b'"' => Ok(Value::Str(self.read_str()?)),
            b'[' => self.read_arr(),
            b'{' => self.read_obj(),
            b't' => self.read_literal(b"true", Value::Bool(true)),
            b'f' => self.read_literal(b"false", Value::Bool(false)),
            b'n' => self.read_literal(b"null", Value::Null),
            b'-' | b'0'..=b'9' => self.read_num(),
            _ => Err(self.unexpected(x)),
        }
    }

    pub fn skip_whitespace(&mut self) {
        while self.x < self.data.len() {
            match self.data[self.x] {
                b' ' | b'\t' | b'\n' | b'\r' => self.x += 1,
                _ => break,
            }
        }
    }

    fn read_literal(&mut self, literal: &[u8], value: Value) -> Result<Value, ParseError> {
        for (i, &expected) in literal.iter().enumerate() {
            let x = self.x + i;
            match self.data.get(x) {
                Some(&b) if b == expected => {}
                Some(_) => return Err(self.unexpected(x)),
                None => return Err(ParseError::UnexpectedEnd { position: x }),
            }
        }
        self.x += literal.len();
        Ok(value)
    }

    /// `-?(0|[1-9][0-9]*)(\.[0-9]+)?([eE][+-]?[0-9]+)?`
    pub fn read_num(&mut self) -> Result<Value, ParseError> {
        let start = self.x;
        let data = &self.data;
        let mut x = start;

        if data.get(x) == Some(&b'-') {
            x += 1;
        }
        match data.get(x) {
            Some(b'0') => x += 1,
            Some(b'1'..=b'9') => x = skip_digits(data, x + 1),
            _ => return Err(ParseError::InvalidNumber { position: x }),
        }
        let mut is_float = false;
        if data.get(x) == Some(&b'.') {
            is_float = true;
            let digits = x + 1;
            x = skip_digits(data, digits);
            if x == digits {
                return Err(ParseError::InvalidNumber { position: x });
            }
        }
        if matches!(data.get(x), Some(b'e' | b'E')) {
            is_float = true;
            x += 1;
            if matches!(data.get(x), Some(b'+' | b'-')) {
                x += 1;
            }
            let digits = x;
            x = skip_digits(data, digits);
            if x == digits {
                return Err(ParseError::InvalidNumber { position: x });
            }
        }

        let text = std::str::from_utf8(&data[start..x])
            .map_err(|_| ParseError::InvalidNumber { position: start })?;
        let number = if is_float {
            None
        } else if let Ok(i) = text.parse::<i64>() {
            Some(Number::Int(i))
        } else {
            text.parse::<u64>().ok().map(Number::UInt)
        };
        let number = match number {
            Some(n) => n,
            None => Number::Float(
                text.parse::<f64>()
                    .map_err(|_| ParseError::InvalidNumber { position: start })?,
            ),
        };
        self.x = x;
        Ok(Value::Num(number))
    }

    pub fn read_str(&mut self) -> Result<String, ParseError> {
        let data = &self.data;
        match data.get(self.x) {
            Some(b'"') => {}
            Some(_) => return Err(self.unexpected(self.x)),
            None => return Err(ParseError::UnexpectedEnd { position: self.x }),
        }
        let x0 = self.x + 1;
        let x1 = find_ending_quote(data, x0)?;
        let slice = &data[x0..x1];
        if let Some(offset) = slice.iter().position(|&b| b < 0x20) {
            return Err(ParseError::ControlCharacter {
                position: x0 + offset,
            });
        }
        let s = decode_json_string(slice, x0)?;
        self.x = x1 + 1;
        Ok(s)
    }

    pub fn read_arr(&mut self) -> Result<Value, ParseError> {
        self.enter()?;
        self.x += 1; // skip '['
        let mut arr = Vec::new();
        self.skip_whitespace();
        if self.data.get(self.x) == Some(&b']') {
            self.x += 1;
            self.depth -= 1;
            return Ok(Value::array_from(arr));
        }
        loop {
            arr.push(self.read_any()?);
            self.skip_whitespace();
            match self.data.get(self.x) {
                Some(b',') => self.x += 1,
                Some(b']') => {
                    self.x += 1;
                    break;
                }
                Some(_) => return Err(self.unexpected(self.x)),
                None => return Err(ParseError::UnexpectedEnd { position: self.x }),
            }
        }
        self.depth -= 1;
        Ok(Value::array_from(arr))
    }

    pub fn read_obj(&mut self) -> Result<Value, ParseError> {
        self.enter()?;
        self.x += 1; // skip '{'
        let mut obj = Map::new();
        self.skip_whitespace();
        if self.data.get(self.x) == Some(&b'}') {
            self.x += 1;
            self.depth -= 1;
            return Ok(Value::object_from(obj));
        }
        loop {
            self.skip_whitespace();
            let key = self.read_str()?;
            self.skip_whitespace();
            match self.data.get(self.x) {
                Some(b':') => self.x += 1,
                Some(_) => return Err(self.unexpected(self.x)),
                None => return Err(ParseError::UnexpectedEnd { position: self.x }),
            }
            let val = self.read_any()?;
            // Duplicate keys: the last value wins, the first position stays.
            obj.insert(key, val);
            self.skip_whitespace();
            match self.data.get(self.x) {
                Some(b',') => self.x += 1,
                Some(b'}') => {
                    self.x += 1;
                    break;
                }
                Some(_) => return Err(self.unexpected(self.x)),
                None => return Err(ParseError::UnexpectedEnd { position: self.x }),
            }
        }
        self.depth -= 1;
        Ok(Value::object_from(obj))
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        if self.depth >= self.options.max_depth {
            return Err(ParseError::DepthLimitExceeded {
                max_depth: self.options.max_depth,
                position: self.x,
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn unexpected(&self, x: usize) -> ParseError {
        ParseError::UnexpectedChar {
            ch: char_at(&self.data, x),
            position: x,
        }
    }
}

fn skip_digits(data: &[u8], mut x: usize) -> usize {
    while matches!(data.get(x), Some(b'0'..=b'9')) {
        x += 1;
    }
    x
}

/// Decode a JSON string body (between the quotes), resolving escapes.
///
/// `\u` escapes are collected as UTF-16 code units; a surrogate without its
/// partner decodes to U+FFFD.
fn decode_json_string(bytes: &[u8], offset: usize) -> Result<String, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|e| ParseError::InvalidUtf8 {
        position: offset + e.valid_up_to(),
    })?;
    // Fast path: no backslash
    if !bytes.contains(&b'\\') {
        return Ok(text.to_owned());
    }
    let mut out = String::with_capacity(bytes.len());
    let mut units: Vec<u16> = Vec::new();
    let mut x = 0;
    while x < bytes.len() {
        if bytes[x] != b'\\' {
            flush_utf16(&mut out, &mut units);
            let next = bytes[x..]
                .iter()
                .position(|&b| b == b'\\')
                .map_or(bytes.len(), |p| x + p);
            out.push_str(&text[x..next]);
            x = next;
            continue;
        }
        let invalid = ParseError::InvalidString {
            position: offset + x,
        };
        let Some(&kind) = bytes.get(x + 1) else {
            return Err(invalid);
        };
        if kind == b'u' {
            let unit = bytes.get(x + 2..x + 6).and_then(hex4).ok_or(invalid)?;
            units.push(unit);
            x += 6;
            continue;
        }
        flush_utf16(&mut out, &mut units);
        out.push(match kind {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{8}',
            b'f' => '\u{c}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            _ => return Err(invalid),
        });
        x += 2;
    }
    flush_utf16(&mut out, &mut units);
    Ok(out)
}

fn flush_utf16(out: &mut String, units: &mut Vec<u16>) {
    if units.is_empty() {
        return;
    }
    out.extend(
        char::decode_utf16(units.drain(..)).map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)),
    );
}

fn hex4(digits: &[u8]) -> Option<u16> {
    digits.iter().try_fold(0u16, |acc, &b| {
        let digit = (b as char).to_digit(16)?;
        Some(acc << 4 | digit as u16)
    })
}
