//! Field schema definitions.
//!
//! A model may declare an ordered field schema. Its type tags map to the
//! validation patterns the persister checks candidate data against; a tag
//! outside the built-in set is treated as a literal regular expression
//! supplied by the schema author.

/// Type tag for a schema field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// Free text, never pattern-checked.
    Text,
    /// Digits only.
    Int,
    /// Digits and a decimal point.
    Double,
    /// Case-insensitive yes/no/0/1/true/false.
    Bool,
    /// Alphanumerics, space, `-` and `:`.
    DateTime,
    /// An author-supplied regular expression.
    Pattern(String),
}

impl FieldType {
    /// The validation pattern for this tag, or `None` when the tag is
    /// never checked.
    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        match self {
            FieldType::Text => None,
            FieldType::Int => Some(r"^[0-9]*$"),
            FieldType::Double => Some(r"^[0-9.]*$"),
            FieldType::Bool => Some(r"^(?i:yes|no|0|1|true|false)$"),
            FieldType::DateTime => Some(r"^[0-9a-zA-Z :-]*$"),
            FieldType::Pattern(p) => Some(p),
        }
    }

    /// The label used in validation failure messages.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::Int => "int",
            FieldType::Double => "double",
            FieldType::Bool => "bool",
            FieldType::DateTime => "datetime",
            FieldType::Pattern(p) => p,
        }
    }
}

/// One declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Column name.
    pub name: String,
    /// Type tag driving validation.
    pub field_type: FieldType,
    /// Declared required flag. Enforcement is opt-in, see
    /// [`ValidateOptions`](crate::validate::ValidateOptions).
    pub required: bool,
}

impl FieldDef {
    /// Create an optional field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
        }
    }

    /// Mark the field as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// An ordered collection of field definitions.
///
/// Declaration order matters: validation walks fields in order and
/// candidate data is filtered against this set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSchema {
    fields: Vec<FieldDef>,
}

impl FieldSchema {
    /// Create an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Append a field definition.
    pub fn push(&mut self, field: FieldDef) {
        self.fields.push(field);
    }

    /// Look up a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// True if a field of this name is declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter()
    }

    /// Number of declared fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no fields are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<FieldDef> for FieldSchema {
    fn from_iter<I: IntoIterator<Item = FieldDef>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_patterns() {
        assert_eq!(FieldType::Text.pattern(), None);
        assert_eq!(FieldType::Int.pattern(), Some(r"^[0-9]*$"));
        assert_eq!(
            FieldType::Pattern("^[a-f]+$".into()).pattern(),
            Some("^[a-f]+$")
        );
    }

    #[test]
    fn test_custom_pattern_label_is_the_pattern() {
        let ty = FieldType::Pattern("^[a-f]+$".into());
        assert_eq!(ty.label(), "^[a-f]+$");
        assert_eq!(FieldType::DateTime.label(), "datetime");
    }

    #[test]
    fn test_schema_lookup_and_order() {
        let schema: FieldSchema = [
            FieldDef::new("login", FieldType::Text).required(),
            FieldDef::new("age", FieldType::Int),
        ]
        .into_iter()
        .collect();

        assert!(schema.contains("age"));
        assert!(!schema.contains("missing"));
        assert!(schema.get("login").unwrap().required);
        let names: Vec<_> = schema.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["login", "age"]);
    }
}
