//! Extended JSON codec.
//!
//! A recursive value model with the standard JSON types plus timestamps and
//! binary blobs, a parser that reports every failure as a [`ParseError`]
//! instead of panicking, and a serializer that writes self-referencing
//! container graphs by substituting a cycle marker for each back-reference.
//!
//! ```
//! use jsonx::{parse, stringify, Value};
//!
//! let doc = parse(r#"{"name":"a","tags":[1,2]}"#).unwrap();
//! doc.insert("self", doc.clone());
//! assert_eq!(
//!     stringify(&doc, None, None),
//!     r#"{"name":"a","tags":[1,2],"self":"[Circular ~]"}"#
//! );
//! # doc.clear();
//! ```

mod convert;
mod equal;
mod value;

pub mod cli;
pub mod json;

pub use equal::deep_equal;
pub use json::{
    parse, parse_slice, parse_with, stringify, to_string, to_string_pretty, Cycle, CycleReplacer,
    JsonxDecoder, JsonxEncoder, ParseError, ParseOptions, Replacer, StringifyOptions,
};
pub use value::{
    Blob, ContainerId, Map, Number, SharedArray, SharedObject, Timestamp, Value,
    BLOB_DATA_URI_PREFIX, MAX_ISO_MILLIS,
};
