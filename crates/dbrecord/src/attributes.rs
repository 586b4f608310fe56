//! Per-record attribute storage with dirty-field accounting.
//!
//! Every change made through [`Attributes::set`] is counted per field:
//! the counter increments whenever the incoming value differs (loosely)
//! from the stored one, and the persister consumes one unit per field it
//! writes. A field is dirty iff its count is above zero, which is what
//! lets two buffered changes survive two consecutive saves.
//!
//! Hydration paths (loading from storage, caching a resolved relation,
//! capturing a generated key) go through [`Attributes::insert_raw`] and
//! leave the counters untouched.

use indexmap::IndexMap;

use dbrecord_core::{Row, Value};

use crate::record::Record;

/// One attribute cell: a plain value, a nested record (to-one
/// assignment or resolution), or a collection of records (to-many
/// resolution in object mode).
#[derive(Debug, Clone)]
pub enum Attr {
    /// A dynamically-typed value.
    Value(Value),
    /// A nested record.
    Record(Box<Record>),
    /// A collection of records.
    Records(Vec<Record>),
}

impl Attr {
    /// Borrow the plain value, if this cell holds one.
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Attr::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow the nested record, if this cell holds one.
    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Attr::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Borrow the record collection, if this cell holds one.
    #[must_use]
    pub fn as_records(&self) -> Option<&[Record]> {
        match self {
            Attr::Records(list) => Some(list),
            _ => None,
        }
    }

    /// True for a plain `Null` value.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Attr::Value(Value::Null))
    }

    /// Loose equality for dirty tracking. Nested records always count
    /// as changed.
    fn loosely_equals(&self, other: &Attr) -> bool {
        match (self, other) {
            (Attr::Value(a), Attr::Value(b)) => a.loosely_equals(b),
            _ => false,
        }
    }

    /// Flatten to a plain value: nested records become their attribute
    /// mappings, collections become lists of mappings.
    #[must_use]
    pub fn flatten(&self) -> Value {
        match self {
            Attr::Value(v) => v.clone(),
            Attr::Record(r) => Value::Map(r.attributes().to_row()),
            Attr::Records(list) => Value::List(
                list.iter()
                    .map(|r| Value::Map(r.attributes().to_row()))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for Attr {
    fn from(value: Value) -> Self {
        Attr::Value(value)
    }
}

impl From<Record> for Attr {
    fn from(record: Record) -> Self {
        Attr::Record(Box::new(record))
    }
}

/// Ordered attribute store plus per-field dirty counters.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    entries: IndexMap<String, Attr>,
    dirty: IndexMap<String, u32>,
}

impl Attributes {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            dirty: IndexMap::new(),
        }
    }

    /// Hydrate a store from a fetched row without marking anything dirty.
    #[must_use]
    pub fn from_row(row: Row) -> Self {
        let mut attrs = Self::new();
        for (name, value) in row {
            attrs.entries.insert(name, Attr::Value(value));
        }
        attrs
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no attributes are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Attr> {
        self.entries.get(name)
    }

    /// Mutably look up an attribute. Does not touch dirty counters.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Attr> {
        self.entries.get_mut(name)
    }

    /// Look up a plain value.
    #[must_use]
    pub fn get_value(&self, name: &str) -> Option<&Value> {
        self.entries.get(name).and_then(Attr::as_value)
    }

    /// True if an attribute of this name is stored.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Store an attribute through dirty tracking: the counter increments
    /// when the value differs loosely from the stored one or the field
    /// was absent. The value is always overwritten.
    pub fn set(&mut self, name: &str, attr: Attr) {
        let changed = match self.entries.get(name) {
            Some(previous) => !previous.loosely_equals(&attr),
            None => true,
        };
        if changed {
            *self.dirty.entry(name.to_string()).or_insert(0) += 1;
        }
        self.entries.insert(name.to_string(), attr);
    }

    /// Store an attribute without touching dirty counters. Existing
    /// fields keep their position.
    pub fn insert_raw(&mut self, name: &str, attr: Attr) {
        self.entries.insert(name.to_string(), attr);
    }

    /// Remove an attribute. Its dirty counter is left as-is.
    pub fn unset(&mut self, name: &str) -> Option<Attr> {
        self.entries.shift_remove(name)
    }

    /// Remove and return an attribute, e.g. to fold a nested join group
    /// into a relation. The dirty counter is left as-is.
    pub fn take(&mut self, name: &str) -> Option<Attr> {
        self.entries.shift_remove(name)
    }

    /// Current dirty count of a field.
    #[must_use]
    pub fn dirty_count(&self, name: &str) -> u32 {
        self.dirty.get(name).copied().unwrap_or(0)
    }

    /// Raise a field's dirty count to at least one.
    pub fn force_dirty(&mut self, name: &str) {
        let count = self.dirty.entry(name.to_string()).or_insert(0);
        if *count == 0 {
            *count = 1;
        }
    }

    /// Consume one unit of a field's dirtiness.
    pub fn consume_dirty(&mut self, name: &str) {
        if let Some(count) = self.dirty.get_mut(name) {
            *count = count.saturating_sub(1);
        }
    }

    /// Attribute names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate attributes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Attr)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Flatten into a plain row: nested records become their attribute
    /// mappings, collections become lists of mappings.
    #[must_use]
    pub fn to_row(&self) -> Row {
        self.iter().map(|(name, attr)| (name, attr.flatten())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_set_counts_as_change() {
        let mut attrs = Attributes::new();
        attrs.set("login", Attr::Value(Value::from("demo")));
        assert_eq!(attrs.dirty_count("login"), 1);
    }

    #[test]
    fn test_same_value_does_not_count() {
        let mut attrs = Attributes::new();
        attrs.set("age", Attr::Value(Value::Int(30)));
        attrs.set("age", Attr::Value(Value::Int(30)));
        assert_eq!(attrs.dirty_count("age"), 1);

        // loosely equal across types is still "same"
        attrs.set("age", Attr::Value(Value::from("30")));
        assert_eq!(attrs.dirty_count("age"), 1);
    }

    #[test]
    fn test_set_back_counts_relative_to_stored_value() {
        let mut attrs = Attributes::new();
        attrs.set("age", Attr::Value(Value::Int(30)));
        attrs.set("age", Attr::Value(Value::Int(31)));
        attrs.set("age", Attr::Value(Value::Int(30)));
        assert_eq!(attrs.dirty_count("age"), 3);
    }

    #[test]
    fn test_hydration_is_clean() {
        let mut row = Row::new();
        row.insert("id", 1);
        row.insert("login", "demo");
        let attrs = Attributes::from_row(row);
        assert_eq!(attrs.dirty_count("id"), 0);
        assert_eq!(attrs.dirty_count("login"), 0);
        assert!(attrs.has("login"));
    }

    #[test]
    fn test_consume_and_force() {
        let mut attrs = Attributes::new();
        attrs.set("login", Attr::Value(Value::from("demo")));
        attrs.consume_dirty("login");
        assert_eq!(attrs.dirty_count("login"), 0);
        attrs.consume_dirty("login");
        assert_eq!(attrs.dirty_count("login"), 0);

        attrs.force_dirty("login");
        assert_eq!(attrs.dirty_count("login"), 1);
        // force never lowers an existing count
        attrs.set("login", Attr::Value(Value::from("other")));
        assert_eq!(attrs.dirty_count("login"), 2);
        attrs.force_dirty("login");
        assert_eq!(attrs.dirty_count("login"), 2);
    }

    #[test]
    fn test_unset_keeps_counter() {
        let mut attrs = Attributes::new();
        attrs.set("login", Attr::Value(Value::from("demo")));
        attrs.unset("login");
        assert!(!attrs.has("login"));
        assert_eq!(attrs.dirty_count("login"), 1);
    }

    #[test]
    fn test_to_row_preserves_order() {
        let mut attrs = Attributes::new();
        attrs.set("z", Attr::Value(Value::Int(1)));
        attrs.set("a", Attr::Value(Value::Int(2)));
        let row = attrs.to_row();
        let names: Vec<_> = row.names().collect();
        assert_eq!(names, vec!["z", "a"]);
    }
}
