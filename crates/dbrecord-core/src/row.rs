//! Ordered field/value rows.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::value::Value;

/// An insertion-ordered mapping of field name to [`Value`].
///
/// Rows are what the query engine yields for each fetched record and what
/// the persister hands back as candidate data. Order is preserved because
/// schemas, candidate data and serialized output all follow declaration
/// order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    entries: IndexMap<String, Value>,
}

impl Row {
    /// Create an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the row has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Set a field, returning the previous value if any. Existing fields
    /// keep their position; new fields append.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(name.into(), value.into())
    }

    /// Remove a field, preserving the order of the remaining ones.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.entries.shift_remove(name)
    }

    /// True if the row has a field of this name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Field names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Convert into the `serde_json` object representation.
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        let mut map = serde_json::Map::with_capacity(self.entries.len());
        for (k, v) in &self.entries {
            map.insert(k.clone(), v.to_json_value());
        }
        serde_json::Value::Object(map)
    }

    /// Encode as a JSON object string.
    pub fn to_json_string(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Build a row from a `serde_json` object. Returns `None` for any
    /// other JSON shape.
    #[must_use]
    pub fn from_json_object(json: serde_json::Value) -> Option<Self> {
        match json {
            serde_json::Value::Object(map) => {
                let mut row = Row::new();
                for (k, v) in map {
                    row.insert(k, Value::from(v));
                }
                Some(row)
            }
            _ => None,
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_preserved() {
        let mut row = Row::new();
        row.insert("z", 1);
        row.insert("a", 2);
        row.insert("m", 3);
        let names: Vec<_> = row.names().collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut row = Row::new();
        row.insert("a", 1);
        row.insert("b", 2);
        let prev = row.insert("a", 10);
        assert_eq!(prev, Some(Value::Int(1)));
        let names: Vec<_> = row.names().collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_json_string_encoding() {
        let mut row = Row::new();
        row.insert("id", 1);
        row.insert("name", "Alice");
        row.insert("deleted", Value::Null);
        assert_eq!(
            row.to_json_string().unwrap(),
            r#"{"id":1,"name":"Alice","deleted":null}"#
        );
    }

    #[test]
    fn test_from_json_object() {
        let row = Row::from_json_object(serde_json::json!({"a": 1})).unwrap();
        assert_eq!(row.get("a"), Some(&Value::Int(1)));
        assert!(Row::from_json_object(serde_json::json!([1, 2])).is_none());
    }
}
