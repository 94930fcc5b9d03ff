//! Cycle-safe JSON serializer for [`Value`] graphs.
//!
//! Unlike a plain tree serializer this encoder:
//! - detects containers that point back at one of their own ancestors, by
//!   identity, and writes a cycle marker in their place
//!   (`"[Circular ~]"` for the root, `"[Circular ~.a.b]"` for the ancestor
//!   reached through keys `a`, `b`);
//! - writes shared but acyclic containers in full at every site;
//! - writes timestamps as ISO-8601 strings and blobs as base64 data URIs;
//! - never fails: every input graph produces well-formed JSON text.
//!
//! Cycle bookkeeping (the ancestor stack and the matching key path) lives in
//! a traversal created for each call, so concurrent calls never share it.
//!
//! Known limit: a very deep *acyclic* graph can still exhaust the call stack.
//! Cycle detection does not guard against that.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::value::{read, ContainerId, Number, SharedArray, SharedObject, Value};

/// Indentation wider than this is clamped.
pub const MAX_INDENT: usize = 10;

/// A back-reference found during traversal.
pub struct Cycle<'a> {
    /// Key (or array index) under which the back-reference sits.
    pub key: &'a str,
    /// Keys leading from the root to the repeated ancestor; empty when the
    /// ancestor is the root itself.
    pub ancestor_path: &'a [String],
    /// Handle to the repeated container.
    pub value: &'a Value,
}

impl Cycle<'_> {
    /// The built-in marker text.
    pub fn marker(&self) -> String {
        if self.ancestor_path.is_empty() {
            "[Circular ~]".to_owned()
        } else {
            format!("[Circular ~.{}]", self.ancestor_path.join("."))
        }
    }
}

/// Caller-supplied substitution for cyclic edges.
pub type CycleReplacer = Arc<dyn Fn(&Cycle<'_>) -> Value + Send + Sync>;

/// Per-pair value substitution, called with the member key (array index as
/// text, `""` for the root) and the value about to be written.
pub type Replacer<'r> = &'r mut dyn FnMut(&str, Value) -> Value;

/// Options controlling serialization.
#[derive(Clone, Default)]
pub struct StringifyOptions {
    /// Spaces per nesting level. `None` or `Some(0)` writes compact output.
    pub indent: Option<usize>,
    /// Replaces the built-in marker for cyclic edges.
    pub cycle_replacer: Option<CycleReplacer>,
}

impl StringifyOptions {
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = Some(indent);
        self
    }

    pub fn with_cycle_replacer<F>(mut self, f: F) -> Self
    where
        F: Fn(&Cycle<'_>) -> Value + Send + Sync + 'static,
    {
        self.cycle_replacer = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for StringifyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringifyOptions")
            .field("indent", &self.indent)
            .field("cycle_replacer", &self.cycle_replacer.is_some())
            .finish()
    }
}

/// Reusable serializer. Holds configuration only; each call builds its own
/// traversal state, so one encoder may be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct JsonxEncoder {
    pub options: StringifyOptions,
}

impl JsonxEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: StringifyOptions) -> Self {
        Self { options }
    }

    pub fn pretty(indent: usize) -> Self {
        Self::with_options(StringifyOptions::default().with_indent(indent))
    }

    pub fn encode(&self, value: &Value) -> String {
        self.encode_with(value, None)
    }

    /// Serialize with an optional replacer.
    ///
    /// For every key/value pair, root included under key `""`, cycle
    /// substitution runs first and the replacer then sees the result.
    /// Whatever the replacer returns is checked against the ancestor stack
    /// again before it is written.
    pub fn encode_with(&self, value: &Value, replacer: Option<Replacer<'_>>) -> String {
        let mut traversal = Traversal {
            out: String::new(),
            indent: self.options.indent.unwrap_or(0).min(MAX_INDENT),
            cycle_replacer: self.options.cycle_replacer.as_deref(),
            replacer,
            ancestors: Vec::new(),
            path: Vec::new(),
        };
        let root = traversal.resolve("", value.clone());
        traversal.write_any("", &root);
        traversal.out
    }
}

/// Serialize `value` with an optional replacer and indent width.
///
/// ```
/// use jsonx::{stringify, Value};
///
/// let a = Value::object();
/// a.insert("self", a.clone());
/// assert_eq!(stringify(&a, None, None), r#"{"self":"[Circular ~]"}"#);
/// # a.clear();
/// ```
pub fn stringify(value: &Value, replacer: Option<Replacer<'_>>, indent: Option<usize>) -> String {
    let encoder = JsonxEncoder::with_options(StringifyOptions {
        indent,
        ..StringifyOptions::default()
    });
    encoder.encode_with(value, replacer)
}

/// Compact serialization.
pub fn to_string(value: &Value) -> String {
    JsonxEncoder::new().encode(value)
}

/// Indented serialization.
pub fn to_string_pretty(value: &Value, indent: usize) -> String {
    JsonxEncoder::pretty(indent).encode(value)
}

struct Traversal<'e, 'r> {
    out: String,
    indent: usize,
    cycle_replacer: Option<&'e (dyn Fn(&Cycle<'_>) -> Value + Send + Sync)>,
    replacer: Option<Replacer<'r>>,
    /// Containers being descended into, root first.
    ancestors: Vec<ContainerId>,
    /// `path[i]` is the key under which `ancestors[i]` was reached.
    path: Vec<String>,
}

impl Traversal<'_, '_> {
    /// Cycle substitution, then the replacer, then a second cycle check on
    /// whatever the replacer produced.
    fn resolve(&mut self, key: &str, value: Value) -> Value {
        let value = self.break_cycle(key, value);
        let value = match self.replacer.as_deref_mut() {
            Some(replace) => replace(key, value),
            None => value,
        };
        self.break_cycle(key, value)
    }

    fn ancestor_depth(&self, value: &Value) -> Option<usize> {
        let id = value.container_id()?;
        self.ancestors.iter().position(|a| *a == id)
    }

    /// Returns a value that is guaranteed not to be an ancestor.
    fn break_cycle(&self, key: &str, value: Value) -> Value {
        let Some(depth) = self.ancestor_depth(&value) else {
            return value;
        };
        let cycle = Cycle {
            key,
            ancestor_path: &self.path[1..depth + 1],
            value: &value,
        };
        trace!(key, depth, "jsonx cycle substituted");
        if let Some(custom) = self.cycle_replacer {
            let substitute = custom(&cycle);
            if self.ancestor_depth(&substitute).is_none() {
                return substitute;
            }
        }
        Value::Str(cycle.marker())
    }

    fn write_any(&mut self, key: &str, value: &Value) {
        match value {
            Value::Null | Value::Undefined => self.write_null(),
            Value::Bool(b) => self.write_boolean(*b),
            Value::Num(n) => self.write_number(*n),
            Value::Str(s) => self.write_str(s),
            Value::Timestamp(ts) => match ts.to_iso_string() {
                Some(iso) => self.write_str(&iso),
                None => self.write_null(),
            },
            Value::Blob(blob) => self.write_str(&blob.to_data_uri()),
            Value::Array(arr) => self.write_arr(key, arr),
            Value::Object(obj) => self.write_obj(key, obj),
        }
    }

    fn write_null(&mut self) {
        self.out.push_str("null");
    }

    fn write_boolean(&mut self, b: bool) {
        self.out.push_str(if b { "true" } else { "false" });
    }

    fn write_number(&mut self, n: Number) {
        match n {
            Number::Int(i) => self.out.push_str(&i.to_string()),
            Number::UInt(u) => self.out.push_str(&u.to_string()),
            Number::Float(f) => self.out.push_str(&format_float(f)),
        }
    }

    /// Write a JSON-encoded string (with escaping).
    fn write_str(&mut self, s: &str) {
        let plain = s
            .bytes()
            .all(|b| (32..=126).contains(&b) && b != b'"' && b != b'\\');
        if plain {
            self.out.reserve(s.len() + 2);
            self.out.push('"');
            self.out.push_str(s);
            self.out.push('"');
            return;
        }
        // Fall back to serde_json for proper escaping
        let json_str = serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string());
        self.out.push_str(&json_str);
    }

    fn write_arr(&mut self, key: &str, arr: &SharedArray) {
        let items = read(arr).clone();
        if items.is_empty() {
            self.out.push_str("[]");
            return;
        }
        self.enter(ContainerId::of(arr), key);
        self.out.push('[');
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.newline();
            let index = i.to_string();
            let item = self.resolve(&index, item);
            self.write_any(&index, &item);
        }
        self.leave();
        self.newline();
        self.out.push(']');
    }

    fn write_obj(&mut self, key: &str, obj: &SharedObject) {
        let entries: Vec<(String, Value)> = read(obj)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.enter(ContainerId::of(obj), key);
        self.out.push('{');
        let mut written = 0usize;
        for (member_key, member) in entries {
            let member = self.resolve(&member_key, member);
            if member.is_undefined() {
                continue;
            }
            if written > 0 {
                self.out.push(',');
            }
            written += 1;
            self.newline();
            self.write_str(&member_key);
            self.out.push(':');
            if self.indent > 0 {
                self.out.push(' ');
            }
            self.write_any(&member_key, &member);
        }
        self.leave();
        if written > 0 {
            self.newline();
        }
        self.out.push('}');
    }

    fn enter(&mut self, id: ContainerId, key: &str) {
        self.ancestors.push(id);
        self.path.push(key.to_owned());
    }

    fn leave(&mut self) {
        self.ancestors.pop();
        self.path.pop();
    }

    fn newline(&mut self) {
        if self.indent == 0 {
            return;
        }
        self.out.push('\n');
        let width = self.indent * self.ancestors.len();
        self.out.extend(std::iter::repeat(' ').take(width));
    }
}

/// Shortest round-trip text. Magnitudes below `1e-6` or from `1e21` up use
/// exponent form with an explicit sign (`5e-324`, `1e+21`).
fn format_float(f: f64) -> String {
    if !f.is_finite() {
        return "null".to_string();
    }
    let abs = f.abs();
    if f.fract() == 0.0 && abs < 1e15 {
        return format!("{}", f as i64);
    }
    if abs >= 1e21 || abs < 1e-6 {
        let text = format!("{f:e}");
        return match text.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => text,
        };
    }
    format!("{f}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_leaves() {
        assert_eq!(to_string(&Value::Null), "null");
        assert_eq!(to_string(&Value::Undefined), "null");
        assert_eq!(to_string(&Value::Bool(false)), "false");
        assert_eq!(to_string(&Value::from(-12)), "-12");
        assert_eq!(to_string(&Value::from(u64::MAX)), "18446744073709551615");
        assert_eq!(to_string(&Value::from(2.0)), "2");
        assert_eq!(to_string(&Value::from(0.1)), "0.1");
        assert_eq!(to_string(&Value::from(f64::NAN)), "null");
        assert_eq!(to_string(&Value::from(f64::NEG_INFINITY)), "null");
    }

    #[test]
    fn extreme_floats_use_exponent_form() {
        let cases = [
            (5e-324, "5e-324"),
            (f64::MAX, "1.7976931348623157e+308"),
            (-f64::MAX, "-1.7976931348623157e+308"),
            (1e21, "1e+21"),
            (1.23e22, "1.23e+22"),
            (1e-7, "1e-7"),
            (-2.5e-8, "-2.5e-8"),
            (1e20, "100000000000000000000"),
            (0.000001, "0.000001"),
            (123.456, "123.456"),
        ];
        for (f, expected) in cases {
            assert_eq!(to_string(&Value::from(f)), expected, "{f:e}");
        }
    }

    #[test]
    fn escapes_strings() {
        assert_eq!(to_string(&Value::str("plain")), r#""plain""#);
        assert_eq!(to_string(&Value::str("q\"b\\")), r#""q\"b\\""#);
        assert_eq!(to_string(&Value::str("\n\u{1}")), r#""\n\u0001""#);
        assert_eq!(to_string(&Value::str("é")), "\"é\"");
    }

    #[test]
    fn writes_extended_leaves() {
        assert_eq!(
            to_string(&Value::timestamp_ms(86_400_000)),
            r#""1970-01-02T00:00:00.000Z""#
        );
        assert_eq!(to_string(&Value::timestamp_ms(i64::MIN)), "null");
        assert_eq!(
            to_string(&Value::timestamp_ms(253_402_300_799_999)),
            r#""9999-12-31T23:59:59.999Z""#
        );
        assert_eq!(
            to_string(&Value::timestamp_ms(253_402_300_800_000)),
            r#""+010000-01-01T00:00:00.000Z""#
        );
        assert_eq!(
            to_string(&Value::timestamp_ms(-62_198_755_200_000)),
            r#""-000001-01-01T00:00:00.000Z""#
        );
        assert_eq!(
            to_string(&Value::blob(vec![4, 5, 6])),
            r#""data:application/octet-stream;base64,BAUG""#
        );
    }

    #[test]
    fn undefined_members_are_skipped() {
        let v = Value::object_from([
            ("a", Value::Undefined),
            ("b", Value::from(1)),
            ("c", Value::Undefined),
        ]);
        assert_eq!(to_string(&v), r#"{"b":1}"#);
        let only = Value::object_from([("a", Value::Undefined)]);
        assert_eq!(to_string_pretty(&only, 2), "{}");
        let arr = Value::array_from([Value::Undefined, Value::from(1)]);
        assert_eq!(to_string(&arr), "[null,1]");
    }

    #[test]
    fn cycle_marker_paths() {
        let cycle = Value::object();
        let cases: [(Vec<String>, &str); 3] = [
            (vec![], "[Circular ~]"),
            (vec!["a".to_owned()], "[Circular ~.a]"),
            (vec!["a".to_owned(), "0".to_owned()], "[Circular ~.a.0]"),
        ];
        for (path, expected) in &cases {
            let c = Cycle {
                key: "x",
                ancestor_path: path,
                value: &cycle,
            };
            assert_eq!(c.marker(), *expected);
        }
    }

    #[test]
    fn indent_is_clamped() {
        let v = Value::array_from([Value::from(1)]);
        let wide = to_string_pretty(&v, 40);
        assert_eq!(wide, format!("[\n{}1\n]", " ".repeat(MAX_INDENT)));
    }

    #[test]
    fn options_debug_hides_closure() {
        let options = StringifyOptions::default()
            .with_indent(2)
            .with_cycle_replacer(|_| Value::Null);
        assert_eq!(
            format!("{options:?}"),
            "StringifyOptions { indent: Some(2), cycle_replacer: true }"
        );
    }
}
