//! Relation metadata.
//!
//! Relations are declared once per model and represented as plain
//! metadata. Targets are referred to by registry name rather than by a
//! direct model reference, which is what lets mutually-related models
//! (a user has many products, a product has one user) be declared without
//! a construction cycle and resolved lazily.

/// The kind of a declared relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// To-one: the parent row carries a foreign key pointing at the
    /// target's primary key. Resolved through a join before the fetch.
    HasOne,
    /// To-many: target rows carry a foreign key pointing back at the
    /// parent. Resolved through a follow-up fetch per parent row.
    HasMany,
}

/// A declared relation on a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDef {
    /// Kind of relation.
    pub kind: RelationKind,
    /// Registry name of the target model.
    pub target: String,
    /// Foreign key column. For `HasOne` this is a column on the parent
    /// and defaults to the relation name suffixed with `id`; for
    /// `HasMany` it is the column on the target pointing back at the
    /// parent's primary key.
    pub foreign_key: Option<String>,
}

impl RelationDef {
    /// Declare a to-one relation with the default foreign key.
    pub fn has_one(target: impl Into<String>) -> Self {
        Self {
            kind: RelationKind::HasOne,
            target: target.into(),
            foreign_key: None,
        }
    }

    /// Declare a to-many relation keyed by `foreign_key` on the target.
    pub fn has_many(target: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        Self {
            kind: RelationKind::HasMany,
            target: target.into(),
            foreign_key: Some(foreign_key.into()),
        }
    }

    /// Override the foreign key column.
    #[must_use]
    pub fn key(mut self, foreign_key: impl Into<String>) -> Self {
        self.foreign_key = Some(foreign_key.into());
        self
    }

    /// The parent-side foreign key column for a `HasOne` relation named
    /// `name`: the explicit key when declared, `{name}id` otherwise.
    #[must_use]
    pub fn has_one_key(&self, name: &str) -> String {
        self.foreign_key
            .clone()
            .unwrap_or_else(|| format!("{name}id"))
    }
}
