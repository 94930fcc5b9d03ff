//! JSON text codec for [`Value`](crate::Value).
//!
//! - [`JsonxDecoder`]: total decoder for the standard JSON grammar.
//! - [`JsonxEncoder`]: cycle-safe encoder covering every value variant.

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod util;

pub use decoder::{JsonxDecoder, ParseOptions, DEFAULT_MAX_DEPTH};
pub use encoder::{
    stringify, to_string, to_string_pretty, Cycle, CycleReplacer, JsonxEncoder, Replacer,
    StringifyOptions, MAX_INDENT,
};
pub use error::ParseError;

use crate::Value;

/// Parse JSON text.
///
/// ```
/// use jsonx::{parse, Value};
///
/// let v = parse(r#"{"n":1,"b":2,"c":3}"#).unwrap();
/// assert_eq!(v.get("b"), Some(Value::from(2)));
/// assert!(parse("{ vanku, []}^").is_err());
/// ```
pub fn parse(text: &str) -> Result<Value, ParseError> {
    parse_slice(text.as_bytes())
}

/// Parse JSON from raw bytes, which must be UTF-8.
pub fn parse_slice(bytes: &[u8]) -> Result<Value, ParseError> {
    JsonxDecoder::new().decode(bytes)
}

pub fn parse_with(text: &str, options: &ParseOptions) -> Result<Value, ParseError> {
    JsonxDecoder::with_options(options.clone()).decode(text.as_bytes())
}
