//! Event definitions for the simulation kernel.
//!
//! Events are the values that circulate on ports. Each event carries a
//! [`Value`] whose kind is known at runtime, and the payload is reference
//! counted: copying an event onto several ports shares the payload instead of
//! duplicating it.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A typed payload.
///
/// This closed set of kinds is what models exchange and what the rule
/// evaluator computes with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// A signed integer
    Integer(i64),
    /// A double precision float
    Float(f64),
    /// A boolean flag
    Boolean(bool),
    /// A homogeneous array of integers
    IntegerArray(Vec<i64>),
    /// A homogeneous array of floats
    FloatArray(Vec<f64>),
}

/// The runtime kind of a [`Value`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Integer,
    Float,
    Boolean,
    IntegerArray,
    FloatArray,
}

impl ValueKind {
    /// Returns true for the two array kinds.
    pub fn is_array(self) -> bool {
        matches!(self, ValueKind::IntegerArray | ValueKind::FloatArray)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Boolean => "boolean",
            ValueKind::IntegerArray => "integer array",
            ValueKind::FloatArray => "float array",
        };
        f.write_str(name)
    }
}

impl Value {
    /// Returns the runtime kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::IntegerArray(_) => ValueKind::IntegerArray,
            Value::FloatArray(_) => ValueKind::FloatArray,
        }
    }

    /// Returns true if this value is an array.
    pub fn is_array(&self) -> bool {
        self.kind().is_array()
    }

    /// Number of elements for arrays, `None` for scalars.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::IntegerArray(items) => Some(items.len()),
            Value::FloatArray(items) => Some(items.len()),
            _ => None,
        }
    }

    /// Returns the integer payload, if any.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the numeric payload as a float, promoting integers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the boolean payload, if any.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the elements of an integer array.
    pub fn as_integer_array(&self) -> Option<&[i64]> {
        match self {
            Value::IntegerArray(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the elements of a float array.
    pub fn as_float_array(&self) -> Option<&[f64]> {
        match self {
            Value::FloatArray(items) => Some(items),
            _ => None,
        }
    }

    /// Copies the elements in `start..end` into a new array value.
    ///
    /// Returns `None` for scalars and for ranges outside the array.
    pub fn slice(&self, start: usize, end: usize) -> Option<Value> {
        match self {
            Value::IntegerArray(items) => items.get(start..end).map(|s| Value::IntegerArray(s.to_vec())),
            Value::FloatArray(items) => items.get(start..end).map(|s| Value::FloatArray(s.to_vec())),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
            f.write_str("{")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}", item)?;
            }
            f.write_str("}")
        }

        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::IntegerArray(items) => list(f, items),
            Value::FloatArray(items) => list(f, items),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v.into())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Value::IntegerArray(v)
    }
}

impl From<Vec<i32>> for Value {
    fn from(v: Vec<i32>) -> Self {
        Value::IntegerArray(v.into_iter().map(i64::from).collect())
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::FloatArray(v)
    }
}

impl From<Vec<f32>> for Value {
    fn from(v: Vec<f32>) -> Self {
        Value::FloatArray(v.into_iter().map(f64::from).collect())
    }
}

/// A value travelling on a port.
///
/// Cloning an `Event` shares the payload; the payload is dropped when the
/// last port holding the event is cleared. Events are immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    value: Arc<Value>,
}

impl Event {
    /// Creates a new event that takes ownership of `value`.
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: Arc::new(value.into()),
        }
    }

    /// Creates a payload-less event, used as a pure signal.
    ///
    /// The payload is the integer `0`.
    pub fn empty() -> Self {
        Self::new(Value::Integer(0))
    }

    /// Returns the payload.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns the runtime kind of the payload.
    pub fn kind(&self) -> ValueKind {
        self.value.kind()
    }

    /// Returns true if both events share the same payload allocation.
    pub fn shares_payload(&self, other: &Event) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }

    /// Number of live handles to this payload.
    pub fn share_count(&self) -> usize {
        Arc::strong_count(&self.value)
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Into<Value>> From<T> for Event {
    fn from(value: T) -> Self {
        Event::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = Event::new(42i64);
        assert_eq!(event.kind(), ValueKind::Integer);
        assert_eq!(event.value().as_integer(), Some(42));

        let event = Event::new(vec![1.5f64, 2.5]);
        assert_eq!(event.kind(), ValueKind::FloatArray);
        assert_eq!(event.value().len(), Some(2));
    }

    #[test]
    fn test_empty_event() {
        let event = Event::empty();
        assert_eq!(event.value(), &Value::Integer(0));
        assert_eq!(Event::default(), event);
    }

    #[test]
    fn test_clone_shares_payload() {
        let a = Event::new(vec![1i64, 2, 3]);
        let b = a.clone();
        assert!(a.shares_payload(&b));
        assert_eq!(a.share_count(), 2);

        drop(b);
        assert_eq!(a.share_count(), 1);

        let c = Event::new(vec![1i64, 2, 3]);
        assert!(!a.shares_payload(&c));
        assert_eq!(a, c);
    }

    #[test]
    fn test_narrow_conversions_widen() {
        assert_eq!(Value::from(7i32), Value::Integer(7));
        assert_eq!(Value::from(0.5f32), Value::Float(0.5));
        assert_eq!(Value::from(vec![1i32, 2]), Value::IntegerArray(vec![1, 2]));
        assert_eq!(Value::from(vec![0.5f32]), Value::FloatArray(vec![0.5]));
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Integer(3).as_float(), Some(3.0));
        assert_eq!(Value::Boolean(true).as_float(), None);
        assert_eq!(Value::Boolean(true).as_boolean(), Some(true));
        assert!(Value::Integer(1).len().is_none());
        assert!(Value::FloatArray(vec![]).is_array());
    }

    #[test]
    fn test_value_slice() {
        let v = Value::IntegerArray(vec![10, 20, 30, 40]);
        assert_eq!(v.slice(1, 3), Some(Value::IntegerArray(vec![20, 30])));
        assert_eq!(v.slice(0, 0), Some(Value::IntegerArray(vec![])));
        assert_eq!(v.slice(2, 5), None);
        assert_eq!(v.slice(3, 2), None);
        assert_eq!(Value::Integer(1).slice(0, 1), None);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::IntegerArray(vec![1, 2, 3]).to_string(), "{1,2,3}");
        assert_eq!(Value::Boolean(false).to_string(), "false");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
    }

    #[test]
    fn test_value_serialization() {
        let v = Value::FloatArray(vec![1.0, 2.0]);
        let json = serde_json::to_string(&v).unwrap();
        let restored: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, restored);
    }
}
