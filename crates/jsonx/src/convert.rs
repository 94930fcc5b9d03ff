//! Conversions between [`Value`] and Rust / `serde_json` types.

use crate::value::{read, Blob, ContainerId, Number, Timestamp, Value};

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Num(Number::Int(i64::from(i)))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Num(Number::Int(i))
    }
}

impl From<u32> for Value {
    fn from(u: u32) -> Self {
        Value::Num(Number::Int(i64::from(u)))
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        match i64::try_from(u) {
            Ok(i) => Value::Num(Number::Int(i)),
            Err(_) => Value::Num(Number::UInt(u)),
        }
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Num(Number::Float(f))
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Num(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Timestamp> for Value {
    fn from(ts: Timestamp) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<Blob> for Value {
    fn from(blob: Blob) -> Self {
        Value::Blob(blob)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array_from(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Num(Number::Int(i))
                } else if let Some(u) = n.as_u64() {
                    Value::Num(Number::UInt(u))
                } else {
                    Value::Num(Number::Float(n.as_f64().unwrap_or(0.0)))
                }
            }
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(arr) => Value::array_from(arr.into_iter().map(Value::from)),
            serde_json::Value::Object(obj) => {
                Value::object_from(obj.into_iter().map(|(k, v)| (k, Value::from(v))))
            }
        }
    }
}

impl Value {
    /// Converts to a `serde_json::Value`.
    ///
    /// Returns `None` when the graph contains a cycle. Timestamps become
    /// their ISO string (or null when out of range), blobs their data URI,
    /// non-finite numbers null. Undefined members are dropped from objects
    /// and become null elsewhere.
    pub fn to_serde(&self) -> Option<serde_json::Value> {
        let mut ancestors = Vec::new();
        to_serde_in(self, &mut ancestors)
    }
}

fn to_serde_in(value: &Value, ancestors: &mut Vec<ContainerId>) -> Option<serde_json::Value> {
    Some(match value {
        Value::Null | Value::Undefined => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Num(Number::Int(i)) => serde_json::Value::from(*i),
        Value::Num(Number::UInt(u)) => serde_json::Value::from(*u),
        Value::Num(Number::Float(f)) => serde_json::Number::from_f64(*f)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::Timestamp(ts) => ts
            .to_iso_string()
            .map_or(serde_json::Value::Null, serde_json::Value::String),
        Value::Blob(blob) => serde_json::Value::String(blob.to_data_uri()),
        Value::Array(arr) => {
            let id = ContainerId::of(arr);
            if ancestors.contains(&id) {
                return None;
            }
            let items = read(arr).clone();
            ancestors.push(id);
            let out = items
                .iter()
                .map(|item| to_serde_in(item, ancestors))
                .collect::<Option<Vec<_>>>();
            ancestors.pop();
            serde_json::Value::Array(out?)
        }
        Value::Object(obj) => {
            let id = ContainerId::of(obj);
            if ancestors.contains(&id) {
                return None;
            }
            let entries = read(obj).clone();
            ancestors.push(id);
            let mut out = serde_json::Map::with_capacity(entries.len());
            for (key, val) in &entries {
                if val.is_undefined() {
                    continue;
                }
                match to_serde_in(val, ancestors) {
                    Some(v) => {
                        out.insert(key.clone(), v);
                    }
                    None => {
                        ancestors.pop();
                        return None;
                    }
                }
            }
            ancestors.pop();
            serde_json::Value::Object(out)
        }
    })
}
