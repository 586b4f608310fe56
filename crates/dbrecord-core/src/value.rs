//! Dynamically-typed attribute values.
//!
//! `Value` is the cell type stored in record attributes and returned in
//! engine rows. It trades type safety for the flexibility the record layer
//! needs: a field loaded from storage, a decoded JSON column, and a nested
//! joined row all live in the same map.

use serde::ser::{Serialize, Serializer};

use crate::row::Row;

/// A dynamically-typed value.
///
/// # Example
///
/// ```
/// use dbrecord_core::Value;
///
/// let v = Value::from("12");
/// assert!(v.loosely_equals(&Value::Int(12)));
/// assert_eq!(v.render().as_deref(), Some("12"));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent / SQL NULL.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer (all integer widths collapse to `i64`).
    Int(i64),
    /// Double-precision float.
    Double(f64),
    /// Text.
    Text(String),
    /// A list, e.g. a decoded pipe-delimited or JSON array column.
    List(Vec<Value>),
    /// A nested mapping, e.g. a join group or a decoded JSON object column.
    Map(Row),
}

impl Value {
    /// True for `Value::Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow as text, if this is a `Text` value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Coerce to an integer: `Int` directly, `Double` truncated, numeric
    /// `Text` parsed, `Bool` as 0/1.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Double(d) => Some(*d as i64),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Coerce to a float, accepting `Int`, `Double` and numeric `Text`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Double(d) => Some(*d),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Borrow as a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow as a nested mapping.
    #[must_use]
    pub fn as_map(&self) -> Option<&Row> {
        match self {
            Value::Map(row) => Some(row),
            _ => None,
        }
    }

    /// True for `List` and `Map` values, which validation skips entirely.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        matches!(self, Value::List(_) | Value::Map(_))
    }

    /// Loose equality used by dirty tracking.
    ///
    /// Values of different variants compare through their common ground:
    /// numbers against numeric text, booleans against integer 0/1 and
    /// string truthiness. `Null` equals only `Null`. Composite values
    /// compare element-wise.
    #[must_use]
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Int(a), Value::Double(b)) | (Value::Double(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Text(s), Value::Int(i)) | (Value::Int(i), Value::Text(s)) => {
                s.trim().parse::<i64>().is_ok_and(|p| p == *i)
            }
            (Value::Text(s), Value::Double(d)) | (Value::Double(d), Value::Text(s)) => {
                s.trim().parse::<f64>().is_ok_and(|p| p == *d)
            }
            (Value::Bool(b), Value::Int(i)) | (Value::Int(i), Value::Bool(b)) => {
                i64::from(*b) == *i
            }
            (Value::Bool(b), Value::Text(s)) | (Value::Text(s), Value::Bool(b)) => {
                *b == (!s.is_empty() && s != "0")
            }
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loosely_equals(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|w| v.loosely_equals(w)))
            }
            _ => false,
        }
    }

    /// Render a scalar as the string form that validation patterns match
    /// against. `Null` and composite values have no rendering.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(if *b { "true".into() } else { "false".into() }),
            Value::Int(i) => Some(i.to_string()),
            Value::Double(d) => Some(d.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Null | Value::List(_) | Value::Map(_) => None,
        }
    }

    /// Convert into the `serde_json` representation.
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Double(d) => serde_json::Value::from(*d),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json_value).collect())
            }
            Value::Map(row) => row.to_json_value(),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Value::Int)
                .unwrap_or_else(|| Value::Double(n.as_f64().unwrap_or(f64::NAN))),
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                let mut row = Row::new();
                for (k, v) in map {
                    row.insert(k, Value::from(v));
                }
                Value::Map(row)
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Row> for Value {
    fn from(row: Row) -> Self {
        Value::Map(row)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Double(d) => serializer.serialize_f64(*d),
            Value::Text(s) => serializer.serialize_str(s),
            Value::List(items) => items.serialize(serializer),
            Value::Map(row) => row.serialize(serializer),
        }
    }
}
