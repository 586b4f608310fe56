//! Core types and the engine contract for DbRecord.
//!
//! `dbrecord-core` is the foundation layer: it defines the data types the
//! record layer and query engines exchange, plus the validation machinery
//! run before every write.
//!
//! # Role In The Architecture
//!
//! - **Data model**: [`Value`] and [`Row`] represent attribute cells and
//!   fetched/candidate rows shared across the whole stack.
//! - **Schema**: [`FieldSchema`] and [`FieldType`] drive the persister's
//!   pre-write validation; [`RelationDef`] describes declared relations.
//! - **Contract layer**: [`QueryEngine`] is the trait storage backends
//!   implement. The record layer delegates all SQL concerns to it.
//!
//! Most applications should use the `dbrecord` facade; reach for
//! `dbrecord-core` directly when writing an engine.

pub mod engine;
pub mod error;
pub mod field;
pub mod relation;
pub mod row;
pub mod validate;
pub mod value;

pub use engine::{JoinKind, Limit, OrderDirection, QueryEngine, QueryOption};
pub use error::{Error, Result};
pub use field::{FieldDef, FieldSchema, FieldType};
pub use relation::{RelationDef, RelationKind};
pub use row::Row;
pub use validate::{matches_pattern, validate_row, ValidateOptions};
pub use value::Value;
