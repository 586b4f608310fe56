//! Model definitions and the startup registry.
//!
//! A [`ModelDef`] carries everything that is record-*type*-level rather
//! than instance-level: the backing table, the primary key field, the
//! optional field schema, declared relations, automatic timestamp flags
//! and field encodings. Definitions are built once at startup, shared via
//! `Arc`, and looked up by name through the [`Registry`]. Relation
//! targets refer to registry names, so mutually-related models declare
//! cleanly.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use dbrecord_core::{Error, FieldDef, FieldSchema, FieldType, RelationDef, Result, ValidateOptions};

use crate::attributes::Attributes;

/// Field stamped on insert when automatic timestamps are enabled.
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Field stamped on update when automatic timestamps are enabled.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Automatic timestamp configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timestamps {
    /// Stamp [`CREATED_AT_FIELD`] on insert.
    pub created_at: bool,
    /// Stamp [`UPDATED_AT_FIELD`] on update.
    pub updated_at: bool,
}

/// Pre-persistence hook, invoked with the full attribute set before
/// dirty-filtering so derived models can normalize data first.
pub type PrepareHook = fn(&mut Attributes);

/// A record-type-level definition, shared across all instances of the
/// type.
#[derive(Debug, Clone)]
pub struct ModelDef {
    name: String,
    table: String,
    primary_key: String,
    fields: Option<FieldSchema>,
    relations: IndexMap<String, RelationDef>,
    timestamps: Timestamps,
    json_fields: Vec<String>,
    list_fields: Vec<String>,
    validate_options: ValidateOptions,
    prepare_hook: Option<PrepareHook>,
}

impl ModelDef {
    /// Start building a model definition. The backing table defaults to
    /// the model name and the primary key to `id`.
    pub fn builder(name: impl Into<String>) -> ModelBuilder {
        ModelBuilder::new(name)
    }

    /// Create an anonymous, schema-less definition bound to an arbitrary
    /// table name. The name is sanitized to alphanumerics, `_` and `-`.
    #[must_use]
    pub fn bind_table(table: &str) -> Arc<ModelDef> {
        let cleaned: String = table
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        Arc::new(ModelDef::builder(cleaned).build())
    }

    /// Registry name of this model.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backing table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Primary key field name.
    #[must_use]
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// The declared field schema. `None` disables validation and field
    /// filtering entirely.
    #[must_use]
    pub fn fields(&self) -> Option<&FieldSchema> {
        self.fields.as_ref()
    }

    /// Look up a declared relation.
    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.get(name)
    }

    /// Declared relations in declaration order.
    pub fn relations(&self) -> impl Iterator<Item = (&str, &RelationDef)> {
        self.relations.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Automatic timestamp configuration.
    #[must_use]
    pub fn timestamps(&self) -> Timestamps {
        self.timestamps
    }

    /// Fields stored as JSON text and transcoded on read/write.
    #[must_use]
    pub fn json_fields(&self) -> &[String] {
        &self.json_fields
    }

    /// Fields stored as pipe-delimited text and transcoded on read/write.
    #[must_use]
    pub fn list_fields(&self) -> &[String] {
        &self.list_fields
    }

    /// True if `name` is a declared JSON-encoded field.
    #[must_use]
    pub fn is_json_field(&self, name: &str) -> bool {
        self.json_fields.iter().any(|f| f == name)
    }

    /// True if `name` is a declared pipe-delimited field.
    #[must_use]
    pub fn is_list_field(&self, name: &str) -> bool {
        self.list_fields.iter().any(|f| f == name)
    }

    /// Validation knobs for this model.
    #[must_use]
    pub fn validate_options(&self) -> ValidateOptions {
        self.validate_options
    }

    /// The pre-persistence hook, if declared.
    #[must_use]
    pub fn prepare_hook(&self) -> Option<PrepareHook> {
        self.prepare_hook
    }
}

/// Fluent builder for [`ModelDef`].
///
/// # Example
///
/// ```
/// use dbrecord::model::ModelDef;
/// use dbrecord_core::FieldType;
///
/// let user = ModelDef::builder("user")
///     .table("users")
///     .field("id", FieldType::Int)
///     .field("login", FieldType::Text)
///     .has_one("avatar", "avatar")
///     .has_many("products", "product", "userid")
///     .timestamps()
///     .build();
/// assert_eq!(user.table(), "users");
/// assert_eq!(user.primary_key(), "id");
/// ```
#[derive(Debug)]
pub struct ModelBuilder {
    name: String,
    table: Option<String>,
    primary_key: String,
    fields: Vec<FieldDef>,
    relations: IndexMap<String, RelationDef>,
    timestamps: Timestamps,
    json_fields: Vec<String>,
    list_fields: Vec<String>,
    validate_options: ValidateOptions,
    prepare_hook: Option<PrepareHook>,
}

impl ModelBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            primary_key: "id".to_string(),
            fields: Vec::new(),
            relations: IndexMap::new(),
            timestamps: Timestamps::default(),
            json_fields: Vec::new(),
            list_fields: Vec::new(),
            validate_options: ValidateOptions::default(),
            prepare_hook: None,
        }
    }

    /// Override the backing table name (defaults to the model name).
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Override the primary key field (defaults to `id`).
    #[must_use]
    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = field.into();
        self
    }

    /// Declare an optional schema field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(FieldDef::new(name, field_type));
        self
    }

    /// Declare a required schema field.
    #[must_use]
    pub fn required_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(FieldDef::new(name, field_type).required());
        self
    }

    /// Declare a to-one relation. The parent's foreign key column
    /// defaults to the relation name suffixed with `id`.
    #[must_use]
    pub fn has_one(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relations
            .insert(name.into(), RelationDef::has_one(target));
        self
    }

    /// Declare a to-one relation with an explicit foreign key column on
    /// the parent.
    #[must_use]
    pub fn has_one_keyed(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.relations
            .insert(name.into(), RelationDef::has_one(target).key(foreign_key));
        self
    }

    /// Declare a to-many relation, keyed by `foreign_key` on the target.
    #[must_use]
    pub fn has_many(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.relations
            .insert(name.into(), RelationDef::has_many(target, foreign_key));
        self
    }

    /// Stamp both `createdAt` and `updatedAt` automatically.
    #[must_use]
    pub fn timestamps(mut self) -> Self {
        self.timestamps = Timestamps {
            created_at: true,
            updated_at: true,
        };
        self
    }

    /// Stamp only `createdAt` on insert.
    #[must_use]
    pub fn stamp_created(mut self) -> Self {
        self.timestamps.created_at = true;
        self
    }

    /// Stamp only `updatedAt` on update.
    #[must_use]
    pub fn stamp_updated(mut self) -> Self {
        self.timestamps.updated_at = true;
        self
    }

    /// Store this field as JSON text, decoded on read and encoded on
    /// write.
    #[must_use]
    pub fn json_field(mut self, name: impl Into<String>) -> Self {
        self.json_fields.push(name.into());
        self
    }

    /// Store this field as a pipe-delimited list, split on read and
    /// joined on write.
    #[must_use]
    pub fn list_field(mut self, name: impl Into<String>) -> Self {
        self.list_fields.push(name.into());
        self
    }

    /// Reject null values for fields declared required. Off by default:
    /// the required flag is otherwise declarative only.
    #[must_use]
    pub fn enforce_required(mut self) -> Self {
        self.validate_options.enforce_required = true;
        self
    }

    /// Install a pre-persistence hook run on the full attribute set
    /// before candidate data is built.
    #[must_use]
    pub fn prepare_hook(mut self, hook: PrepareHook) -> Self {
        self.prepare_hook = Some(hook);
        self
    }

    /// Finish the definition.
    #[must_use]
    pub fn build(self) -> ModelDef {
        let table = self.table.unwrap_or_else(|| self.name.clone());
        ModelDef {
            name: self.name,
            table,
            primary_key: self.primary_key,
            fields: if self.fields.is_empty() {
                None
            } else {
                Some(self.fields.into_iter().collect())
            },
            relations: self.relations,
            timestamps: self.timestamps,
            json_fields: self.json_fields,
            list_fields: self.list_fields,
            validate_options: self.validate_options,
            prepare_hook: self.prepare_hook,
        }
    }
}

/// Startup registry of model definitions, keyed by model name.
///
/// Relation targets are resolved through the registry at fetch time, so
/// every model reachable through a declared relation must be registered
/// before records are used.
#[derive(Debug, Default)]
pub struct Registry {
    models: HashMap<String, Arc<ModelDef>>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            models: HashMap::new(),
        }
    }

    /// Register a definition under its model name, returning the shared
    /// handle.
    pub fn register(&mut self, model: ModelDef) -> Arc<ModelDef> {
        let shared = Arc::new(model);
        self.models.insert(shared.name().to_string(), shared.clone());
        shared
    }

    /// Look up a model by name.
    pub fn model(&self, name: &str) -> Result<Arc<ModelDef>> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownModel(name.to_string()))
    }

    /// Look up a model that relation metadata refers to.
    ///
    /// # Panics
    ///
    /// Panics when no model of that name is registered: a relation
    /// pointing at an unregistered target is a programming error in the
    /// model declarations, not a runtime data error.
    #[must_use]
    pub fn expect_model(&self, name: &str) -> Arc<ModelDef> {
        self.models.get(name).cloned().unwrap_or_else(|| {
            panic!("no model named `{name}` registered; register relation targets at startup")
        })
    }

    /// True if a model of this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let model = ModelDef::builder("session").build();
        assert_eq!(model.name(), "session");
        assert_eq!(model.table(), "session");
        assert_eq!(model.primary_key(), "id");
        assert!(model.fields().is_none());
        assert_eq!(model.timestamps(), Timestamps::default());
    }

    #[test]
    fn test_empty_schema_disables_validation() {
        let model = ModelDef::builder("log").table("logs").build();
        assert!(model.fields().is_none());

        let with_fields = ModelDef::builder("log")
            .field("id", FieldType::Int)
            .build();
        assert_eq!(with_fields.fields().unwrap().len(), 1);
    }

    #[test]
    fn test_relations_keep_declaration_order() {
        let model = ModelDef::builder("user")
            .has_many("products", "product", "userid")
            .has_one("avatar", "avatar")
            .build();
        let names: Vec<_> = model.relations().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["products", "avatar"]);
    }

    #[test]
    fn test_bind_table_sanitizes_name() {
        let model = ModelDef::bind_table("audit_log; DROP TABLE x");
        assert_eq!(model.table(), "audit_logDROPTABLEx");
        assert!(model.fields().is_none());
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = Registry::new();
        registry.register(ModelDef::builder("user").table("users").build());

        assert!(registry.contains("user"));
        assert_eq!(registry.model("user").unwrap().table(), "users");
        assert!(matches!(
            registry.model("ghost"),
            Err(Error::UnknownModel(name)) if name == "ghost"
        ));
    }

    #[test]
    #[should_panic(expected = "no model named `ghost` registered")]
    fn test_expect_model_panics_on_unknown() {
        let registry = Registry::new();
        let _ = registry.expect_model("ghost");
    }
}
