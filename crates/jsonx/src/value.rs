//! The JSONX value model.
//!
//! Standard JSON types plus two extended leaves, [`Timestamp`] and [`Blob`].
//! Objects and arrays are shared handles: cloning a container value clones
//! the handle, so one container can be reachable from several parents,
//! itself included. The serializer treats such graphs as legal input.
//!
//! Reference cycles between `Arc` handles are never freed on their own; call
//! [`Value::clear`] on a container to break a cycle you no longer need.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use indexmap::IndexMap;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

/// Ordered key/value storage backing [`Value::Object`].
pub type Map = IndexMap<String, Value>;

/// Shared handle to an object container.
pub type SharedObject = Arc<RwLock<Map>>;

/// Shared handle to an array container.
pub type SharedArray = Arc<RwLock<Vec<Value>>>;

/// `data:application/octet-stream;base64,` prefix used when writing blobs.
pub const BLOB_DATA_URI_PREFIX: &str = "data:application/octet-stream;base64,";

/// Largest distance from the epoch, in either direction, that a timestamp
/// can be written as an ISO-8601 string.
pub const MAX_ISO_MILLIS: i64 = 8_640_000_000_000_000;

/// Everything after the year; the year itself is written by hand so that
/// expanded years get their sign and six digits.
const ISO_FORMAT_AFTER_YEAR: &[BorrowedFormatItem<'static>] =
    format_description!("-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Identity of a container allocation.
///
/// Two values have the same id only when they are handles to the very same
/// object or array, never merely because their contents are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(usize);

impl ContainerId {
    pub(crate) fn of<T: ?Sized>(handle: &Arc<T>) -> Self {
        Self(Arc::as_ptr(handle) as *const () as usize)
    }
}

/// Numeric payload of [`Value::Num`].
///
/// Equality is numeric, so `Int(1)`, `UInt(1)` and `Float(1.0)` are equal.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    /// Integer that fits in `i64`.
    Int(i64),
    /// Positive integer above `i64::MAX`.
    UInt(u64),
    /// Floating-point number.
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::UInt(u) => u as f64,
            Number::Float(f) => f,
        }
    }

    /// Returns the value as `i64` when it is an integer in range.
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Number::Int(i) => Some(i),
            Number::UInt(u) => i64::try_from(u).ok(),
            Number::Float(f) => {
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                    Some(f as i64)
                } else {
                    None
                }
            }
        }
    }

    pub fn is_finite(self) -> bool {
        match self {
            Number::Float(f) => f.is_finite(),
            _ => true,
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (*self, *other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (Number::UInt(a), Number::UInt(b)) => a == b,
            (Number::Float(a), Number::Float(b)) => a == b,
            (Number::Int(i), Number::UInt(u)) | (Number::UInt(u), Number::Int(i)) => {
                u64::try_from(i).is_ok_and(|i| i == u)
            }
            (Number::Int(i), Number::Float(f)) | (Number::Float(f), Number::Int(i)) => {
                f == i as f64
            }
            (Number::UInt(u), Number::Float(f)) | (Number::Float(f), Number::UInt(u)) => {
                f == u as f64
            }
        }
    }
}

/// A point in time with millisecond resolution, stored as milliseconds
/// since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    millis: i64,
}

impl Timestamp {
    pub const fn from_millis(millis: i64) -> Self {
        Self { millis }
    }

    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        let millis = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => i64::try_from(after.as_millis()).unwrap_or(i64::MAX),
            Err(before) => -i64::try_from(before.duration().as_millis()).unwrap_or(i64::MAX),
        };
        Self { millis }
    }

    pub const fn millis(self) -> i64 {
        self.millis
    }

    /// Formats as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
    ///
    /// Years outside `0..=9999` use the expanded form, a sign and six
    /// digits: `+010000-01-01T00:00:00.000Z`, `-000001-01-01T00:00:00.000Z`.
    ///
    /// Returns `None` when the instant is more than [`MAX_ISO_MILLIS`] away
    /// from the epoch.
    pub fn to_iso_string(self) -> Option<String> {
        if self.millis.unsigned_abs() > MAX_ISO_MILLIS.unsigned_abs() {
            return None;
        }
        let nanos = i128::from(self.millis) * 1_000_000;
        let datetime = OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()?;
        let year = datetime.year();
        let mut iso = if (0..=9999).contains(&year) {
            format!("{year:04}")
        } else {
            let sign = if year < 0 { '-' } else { '+' };
            format!("{sign}{:06}", year.unsigned_abs())
        };
        iso.push_str(&datetime.format(ISO_FORMAT_AFTER_YEAR).ok()?);
        Some(iso)
    }
}

/// Immutable byte sequence.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Blob(Arc<[u8]>);

impl Blob {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self(Arc::from(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `data:application/octet-stream;base64,<payload>`
    pub fn to_data_uri(&self) -> String {
        let mut uri = String::with_capacity(BLOB_DATA_URI_PREFIX.len() + self.0.len() * 4 / 3 + 4);
        uri.push_str(BLOB_DATA_URI_PREFIX);
        STANDARD.encode_string(&self.0, &mut uri);
        uri
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blob({} bytes)", self.0.len())
    }
}

/// Any JSONX value.
#[derive(Clone, Default)]
pub enum Value {
    /// Mapping from unique string keys to values, insertion ordered.
    Object(SharedObject),
    /// Ordered sequence of values.
    Array(SharedArray),
    Timestamp(Timestamp),
    Blob(Blob),
    Str(String),
    Num(Number),
    Bool(bool),
    #[default]
    Null,
    /// "No value at all". Never written to wire text: object members holding
    /// it are skipped and array slots become `null`.
    Undefined,
}

impl Value {
    /// New empty object.
    pub fn object() -> Self {
        Value::Object(Arc::new(RwLock::new(Map::new())))
    }

    /// New empty array.
    pub fn array() -> Self {
        Value::Array(Arc::new(RwLock::new(Vec::new())))
    }

    pub fn object_from<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let map: Map = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Value::Object(Arc::new(RwLock::new(map)))
    }

    pub fn array_from<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Value::Array(Arc::new(RwLock::new(items.into_iter().collect())))
    }

    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn timestamp_ms(millis: i64) -> Self {
        Value::Timestamp(Timestamp::from_millis(millis))
    }

    pub fn blob(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Blob(Blob::new(bytes))
    }

    /// Inserts into an object, replacing any previous value for `key` in
    /// place. Returns `false` when `self` is not an object.
    pub fn insert(&self, key: impl Into<String>, value: Value) -> bool {
        match self {
            Value::Object(obj) => {
                write(obj).insert(key.into(), value);
                true
            }
            _ => false,
        }
    }

    /// Appends to an array. Returns `false` when `self` is not an array.
    pub fn push(&self, value: Value) -> bool {
        match self {
            Value::Array(arr) => {
                write(arr).push(value);
                true
            }
            _ => false,
        }
    }

    /// Empties a container. Returns `false` for leaves.
    pub fn clear(&self) -> bool {
        match self {
            Value::Object(obj) => {
                write(obj).clear();
                true
            }
            Value::Array(arr) => {
                write(arr).clear();
                true
            }
            _ => false,
        }
    }

    /// Member of an object by key.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(obj) => read(obj).get(key).cloned(),
            _ => None,
        }
    }

    /// Element of an array by index.
    pub fn get_index(&self, index: usize) -> Option<Value> {
        match self {
            Value::Array(arr) => read(arr).get(index).cloned(),
            _ => None,
        }
    }

    /// Snapshot of an object's members in insertion order.
    pub fn entries(&self) -> Option<Vec<(String, Value)>> {
        match self {
            Value::Object(obj) => Some(
                read(obj)
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Snapshot of an array's elements.
    pub fn items(&self) -> Option<Vec<Value>> {
        match self {
            Value::Array(arr) => Some(read(arr).clone()),
            _ => None,
        }
    }

    /// Number of members or elements of a container.
    pub fn container_len(&self) -> Option<usize> {
        match self {
            Value::Object(obj) => Some(read(obj).len()),
            Value::Array(arr) => Some(read(arr).len()),
            _ => None,
        }
    }

    pub fn container_id(&self) -> Option<ContainerId> {
        match self {
            Value::Object(obj) => Some(ContainerId::of(obj)),
            Value::Array(arr) => Some(ContainerId::of(arr)),
            _ => None,
        }
    }

    /// `true` when both values are handles to the same container.
    pub fn same_container(&self, other: &Value) -> bool {
        match (self.container_id(), other.container_id()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Object(_) => "object",
            Value::Array(_) => "array",
            Value::Timestamp(_) => "timestamp",
            Value::Blob(_) => "blob",
            Value::Str(_) => "string",
            Value::Num(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Null => "null",
            Value::Undefined => "undefined",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Array(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_number().map(Number::as_f64)
    }

    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&Blob> {
        match self {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }
}

// Containers print through the cycle-safe encoder; a derived impl would
// recurse forever on self-referencing graphs.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Object(_) => write!(f, "Object({})", crate::json::to_string(self)),
            Value::Array(_) => write!(f, "Array({})", crate::json::to_string(self)),
            Value::Timestamp(ts) => write!(f, "Timestamp({})", ts.millis),
            Value::Blob(b) => write!(f, "{b:?}"),
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::Num(n) => f.debug_tuple("Num").field(n).finish(),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Null => f.write_str("Null"),
            Value::Undefined => f.write_str("Undefined"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::json::to_string(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_container() {
        let a = Value::object();
        let b = a.clone();
        assert!(b.insert("k", Value::from(1)));
        assert_eq!(a.get("k"), Some(Value::from(1)));
        assert!(a.same_container(&b));
    }

    #[test]
    fn equal_contents_are_different_containers() {
        let a = Value::array_from([Value::from(1)]);
        let b = Value::array_from([Value::from(1)]);
        assert!(!a.same_container(&b));
        assert_ne!(a.container_id(), b.container_id());
    }

    #[test]
    fn insert_keeps_first_position() {
        let obj = Value::object_from([("a", Value::from(1)), ("b", Value::from(2))]);
        obj.insert("a", Value::from(3));
        let keys: Vec<String> = obj.entries().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(obj.get("a"), Some(Value::from(3)));
    }

    #[test]
    fn mutators_reject_wrong_variant() {
        assert!(!Value::array().insert("k", Value::Null));
        assert!(!Value::object().push(Value::Null));
        assert!(!Value::Null.clear());
    }

    #[test]
    fn number_equality_is_numeric() {
        assert_eq!(Number::Int(1), Number::Float(1.0));
        assert_eq!(Number::UInt(5), Number::Int(5));
        assert_ne!(Number::Int(-1), Number::UInt(u64::MAX));
        assert_ne!(Number::Float(f64::NAN), Number::Float(f64::NAN));
        assert_eq!(Number::Float(3.0).as_i64(), Some(3));
        assert_eq!(Number::Float(3.5).as_i64(), None);
    }

    #[test]
    fn timestamp_iso_format() {
        assert_eq!(
            Timestamp::from_millis(0).to_iso_string().as_deref(),
            Some("1970-01-01T00:00:00.000Z")
        );
        assert_eq!(
            Timestamp::from_millis(1_672_531_200_123).to_iso_string().as_deref(),
            Some("2023-01-01T00:00:00.123Z")
        );
        assert_eq!(Timestamp::from_millis(i64::MAX).to_iso_string(), None);
    }

    #[test]
    fn timestamp_iso_expanded_years() {
        let cases = [
            (253_402_300_799_999, "9999-12-31T23:59:59.999Z"),
            (253_402_300_800_000, "+010000-01-01T00:00:00.000Z"),
            (-62_167_219_200_000, "0000-01-01T00:00:00.000Z"),
            (-62_167_219_200_001, "-000001-12-31T23:59:59.999Z"),
            (-62_198_755_200_000, "-000001-01-01T00:00:00.000Z"),
            (MAX_ISO_MILLIS, "+275760-09-13T00:00:00.000Z"),
            (-MAX_ISO_MILLIS, "-271821-04-20T00:00:00.000Z"),
        ];
        for (millis, expected) in cases {
            assert_eq!(
                Timestamp::from_millis(millis).to_iso_string().as_deref(),
                Some(expected),
                "{millis}"
            );
        }
        assert_eq!(Timestamp::from_millis(MAX_ISO_MILLIS + 1).to_iso_string(), None);
        assert_eq!(Timestamp::from_millis(-MAX_ISO_MILLIS - 1).to_iso_string(), None);
    }

    #[test]
    fn timestamp_from_system_time() {
        let t = UNIX_EPOCH + std::time::Duration::from_millis(1500);
        assert_eq!(Timestamp::from_system_time(t).millis(), 1500);
        let before = UNIX_EPOCH - std::time::Duration::from_millis(20);
        assert_eq!(Timestamp::from_system_time(before).millis(), -20);
    }

    #[test]
    fn blob_data_uri() {
        let blob = Blob::new(b"hello".to_vec());
        assert_eq!(blob.len(), 5);
        assert_eq!(blob.to_data_uri(), "data:application/octet-stream;base64,aGVsbG8=");
        assert_eq!(Blob::new(Vec::new()).to_data_uri(), BLOB_DATA_URI_PREFIX);
    }

    #[test]
    fn debug_survives_self_reference() {
        let a = Value::object();
        a.insert("self", a.clone());
        assert_eq!(format!("{a:?}"), r#"Object({"self":"[Circular ~]"})"#);
        a.clear();
    }
}
