//! Active-Record style records over a pluggable query engine.
//!
//! `dbrecord` represents rows of a relational table as dynamically-typed
//! [`Record`]s: attribute access with per-field dirty accounting, declared
//! `hasOne`/`hasMany` relations resolved eagerly on request or lazily on
//! access, an insert/update/save/delete lifecycle with schema-driven
//! validation, and three result shapes (typed records, plain mappings,
//! JSON) for the same data.
//!
//! SQL itself is somebody else's job: every record holds an explicit
//! handle to a [`QueryEngine`] implementation, which owns filter
//! accumulation, dialects, binding and execution.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use dbrecord::{ModelDef, Record, Registry};
//! use dbrecord_core::FieldType;
//!
//! let mut registry = Registry::new();
//! registry.register(
//!     ModelDef::builder("user")
//!         .table("users")
//!         .field("id", FieldType::Int)
//!         .field("login", FieldType::Text)
//!         .has_many("products", "product", "userid")
//!         .build(),
//! );
//! registry.register(ModelDef::builder("product").table("products").build());
//! let registry = Arc::new(registry);
//!
//! let mut user = Record::new(registry.model("user")?, engine.clone(), registry.clone());
//! user.set("login", "demo");
//! let id = user.save(None)?;
//!
//! let loaded = user.with("products").by_id(id, None)?;
//! ```

pub mod attributes;
pub mod model;
mod persist;
pub mod record;
mod resolve;
pub mod serialize;

pub use attributes::{Attr, Attributes};
pub use model::{
    ModelBuilder, ModelDef, PrepareHook, Registry, Timestamps, CREATED_AT_FIELD, UPDATED_AT_FIELD,
};
pub use record::{Engine, Record, DEFAULT_PAGE_LIMIT};
pub use serialize::{Fetched, FetchedSet, ReturnMode};

pub use dbrecord_core::{
    Error, FieldDef, FieldSchema, FieldType, JoinKind, Limit, OrderDirection, QueryEngine,
    QueryOption, RelationDef, RelationKind, Result, Row, ValidateOptions, Value,
};
