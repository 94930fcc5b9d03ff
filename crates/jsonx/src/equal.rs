//! Structural equality for [`Value`] graphs.
//!
//! Objects compare by key set and member values regardless of key order,
//! arrays element by element, numbers numerically, blobs by bytes.
//!
//! Comparison is cycle safe. A stack of `(left, right)` container pairs
//! currently being compared is kept per call; meeting a pair that is already
//! on the stack counts as equal, so two cyclic graphs with the same shape
//! compare equal instead of recursing forever.

use crate::value::{read, ContainerId, Value};

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        deep_equal(self, other)
    }
}

/// Deep equality check between two values.
///
/// ```
/// use jsonx::{deep_equal, Value};
///
/// let list = |x: i64, y: i64| Value::array_from([Value::from(x), Value::from(y)]);
/// let a = Value::object_from([("foo", list(1, 2))]);
/// let b = Value::object_from([("foo", list(1, 2))]);
/// let c = Value::object_from([("foo", list(1, 3))]);
///
/// assert!(deep_equal(&a, &b));
/// assert!(!deep_equal(&a, &c));
/// ```
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    let mut comparing = Vec::new();
    equal_in(a, b, &mut comparing)
}

fn equal_in(a: &Value, b: &Value, comparing: &mut Vec<(ContainerId, ContainerId)>) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Undefined, Value::Undefined) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Num(a), Value::Num(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
        (Value::Blob(a), Value::Blob(b)) => a == b,

        (Value::Array(arr_a), Value::Array(arr_b)) => {
            let pair = (ContainerId::of(arr_a), ContainerId::of(arr_b));
            if pair.0 == pair.1 || comparing.contains(&pair) {
                return true;
            }
            // Snapshots, so no lock is held while recursing.
            let left = read(arr_a).clone();
            let right = read(arr_b).clone();
            if left.len() != right.len() {
                return false;
            }
            comparing.push(pair);
            let equal = left
                .iter()
                .zip(right.iter())
                .all(|(l, r)| equal_in(l, r, comparing));
            comparing.pop();
            equal
        }

        (Value::Object(obj_a), Value::Object(obj_b)) => {
            let pair = (ContainerId::of(obj_a), ContainerId::of(obj_b));
            if pair.0 == pair.1 || comparing.contains(&pair) {
                return true;
            }
            let left = read(obj_a).clone();
            let right = read(obj_b).clone();
            if left.len() != right.len() {
                return false;
            }
            comparing.push(pair);
            let equal = left.iter().all(|(key, val_a)| match right.get(key) {
                Some(val_b) => equal_in(val_a, val_b, comparing),
                None => false,
            });
            comparing.pop();
            equal
        }

        // Different types are never equal
        _ => false,
    }
}
