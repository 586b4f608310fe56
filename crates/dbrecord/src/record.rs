//! The record façade.
//!
//! A [`Record`] represents one mapped row (or one prospective row) of a
//! table: dynamically-typed attribute access with dirty tracking, fetch
//! operations, relation resolution and the persistence lifecycle. Every
//! record holds an explicit handle to the query engine it delegates to
//! (there is no hidden shared connection) plus the registry its relation
//! targets resolve through.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;

use dbrecord_core::{
    Limit, OrderDirection, QueryEngine, QueryOption, RelationDef, RelationKind, Result, Row, Value,
};

use crate::attributes::{Attr, Attributes};
use crate::model::{ModelDef, Registry};
use crate::serialize::{decode_stored_fields, Fetched, FetchedSet, ReturnMode};

/// Shared handle to an injected query engine.
///
/// Records created for relation resolution clone this handle, so one
/// engine serves a whole object graph. The execution model is
/// single-threaded, synchronous call-and-return.
pub type Engine = Rc<RefCell<dyn QueryEngine>>;

/// Default page size for [`Record::paginate`].
pub const DEFAULT_PAGE_LIMIT: u64 = 20;

/// One mapped row (or prospective row) of a table.
#[derive(Clone)]
pub struct Record {
    pub(crate) model: Arc<ModelDef>,
    pub(crate) engine: Engine,
    pub(crate) registry: Arc<Registry>,
    pub(crate) attributes: Attributes,
    pub(crate) is_new: bool,
    pub(crate) return_mode: ReturnMode,
    pub(crate) pending: IndexMap<String, RelationDef>,
    pub(crate) errors: Vec<String>,
    page_limit: u64,
    total_pages: u64,
}

impl Record {
    /// Create an empty, unsaved record of the given model.
    #[must_use]
    pub fn new(model: Arc<ModelDef>, engine: Engine, registry: Arc<Registry>) -> Self {
        Self {
            model,
            engine,
            registry,
            attributes: Attributes::new(),
            is_new: true,
            return_mode: ReturnMode::default(),
            pending: IndexMap::new(),
            errors: Vec::new(),
            page_limit: DEFAULT_PAGE_LIMIT,
            total_pages: 0,
        }
    }

    /// Hydrate a record from a storage row. The record is not new and
    /// nothing is marked dirty.
    #[must_use]
    pub fn hydrate(
        model: Arc<ModelDef>,
        engine: Engine,
        registry: Arc<Registry>,
        row: Row,
        return_mode: ReturnMode,
    ) -> Self {
        Self::from_attributes(model, engine, registry, Attributes::from_row(row), return_mode)
    }

    pub(crate) fn from_attributes(
        model: Arc<ModelDef>,
        engine: Engine,
        registry: Arc<Registry>,
        attributes: Attributes,
        return_mode: ReturnMode,
    ) -> Self {
        Self {
            model,
            engine,
            registry,
            attributes,
            is_new: false,
            return_mode,
            pending: IndexMap::new(),
            errors: Vec::new(),
            page_limit: DEFAULT_PAGE_LIMIT,
            total_pages: 0,
        }
    }

    /// The model definition backing this record.
    #[must_use]
    pub fn model(&self) -> &Arc<ModelDef> {
        &self.model
    }

    /// The registry this record resolves relation targets through.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The injected engine handle.
    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The backing table name.
    #[must_use]
    pub fn table(&self) -> &str {
        self.model.table()
    }

    /// True until the record is inserted or loaded from storage.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Validation and persistence failure descriptions from the last
    /// persistence attempt.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// The attribute store.
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    // ------------------------------------------------------------------
    // Attribute access
    // ------------------------------------------------------------------

    /// Set a field through dirty tracking.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.attributes.set(name, Attr::Value(value.into()));
    }

    /// Assign a nested record to a field, e.g. an unsaved to-one target
    /// that should be cascade-saved with this record.
    pub fn set_related(&mut self, name: &str, record: Record) {
        self.attributes.set(name, Attr::Record(Box::new(record)));
    }

    /// Read a field.
    ///
    /// When the name is a declared relation that has not been resolved
    /// yet, the relation is resolved on the spot (a to-one target is
    /// fetched by the foreign key, a to-many collection by a filtered
    /// fetch) and the result is cached, so later reads are free.
    pub fn get(&mut self, name: &str) -> Result<Option<&Attr>> {
        if self.attributes.has(name) {
            return Ok(self.attributes.get(name));
        }

        let Some(rel) = self.model.relation(name).cloned() else {
            return Ok(None);
        };

        let resolved = match rel.kind {
            RelationKind::HasOne => {
                let fk = rel.has_one_key(name);
                let fk_value = self.attributes.get_value(&fk).cloned();
                self.resolve_has_one(&rel, fk_value)?
            }
            RelationKind::HasMany => {
                let parent_key = self.attributes.get_value(self.model.primary_key()).cloned();
                self.resolve_has_many(&rel, parent_key)?
            }
        };
        self.attributes.insert_raw(name, resolved);
        Ok(self.attributes.get(name))
    }

    /// Read a field without triggering relation resolution.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&Attr> {
        self.attributes.get(name)
    }

    /// True if the field is currently stored.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.attributes.has(name)
    }

    /// Remove a field.
    pub fn unset(&mut self, name: &str) {
        self.attributes.unset(name);
    }

    /// The primary key value, when present and non-null.
    #[must_use]
    pub fn primary_key_value(&self) -> Option<Value> {
        self.attributes
            .get_value(self.model.primary_key())
            .filter(|v| !v.is_null())
            .cloned()
    }

    // ------------------------------------------------------------------
    // Return mode
    // ------------------------------------------------------------------

    /// Materialize fetch results as typed records.
    pub fn as_object(&mut self) -> &mut Self {
        self.return_mode = ReturnMode::Object;
        self
    }

    /// Materialize fetch results as plain mappings.
    pub fn as_mapping(&mut self) -> &mut Self {
        self.return_mode = ReturnMode::Mapping;
        self
    }

    /// Materialize fetch results as JSON strings.
    pub fn as_json(&mut self) -> &mut Self {
        self.return_mode = ReturnMode::Json;
        self
    }

    /// The current return mode.
    #[must_use]
    pub fn return_mode(&self) -> ReturnMode {
        self.return_mode
    }

    /// Set the return mode explicitly.
    pub fn set_return_mode(&mut self, mode: ReturnMode) -> &mut Self {
        self.return_mode = mode;
        self
    }

    // ------------------------------------------------------------------
    // Filter delegation
    // ------------------------------------------------------------------

    /// Add an equality condition to the next query.
    pub fn where_(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.where_op(field, value, "=")
    }

    /// Add a condition with an explicit operator to the next query.
    pub fn where_op(&mut self, field: &str, value: impl Into<Value>, operator: &str) -> &mut Self {
        self.engine.borrow_mut().where_(field, value.into(), operator);
        self
    }

    /// Add an OR-ed equality condition to the next query.
    pub fn or_where(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.or_where_op(field, value, "=")
    }

    /// Add an OR-ed condition with an explicit operator to the next query.
    pub fn or_where_op(
        &mut self,
        field: &str,
        value: impl Into<Value>,
        operator: &str,
    ) -> &mut Self {
        self.engine
            .borrow_mut()
            .or_where(field, value.into(), operator);
        self
    }

    /// Order the next query's rows.
    pub fn order_by(&mut self, field: &str, direction: OrderDirection) -> &mut Self {
        self.engine.borrow_mut().order_by(field, direction);
        self
    }

    /// Group the next query's rows.
    pub fn group_by(&mut self, field: &str) -> &mut Self {
        self.engine.borrow_mut().group_by(field);
        self
    }

    /// Apply an engine option to the next query.
    pub fn set_query_option(&mut self, option: QueryOption) -> &mut Self {
        self.engine.borrow_mut().set_query_option(option);
        self
    }

    // ------------------------------------------------------------------
    // Fetch operations
    // ------------------------------------------------------------------

    /// Fetch a record by primary key.
    pub fn by_id(&mut self, id: impl Into<Value>, fields: Option<&[&str]>) -> Result<Option<Fetched>> {
        let field = format!("{}.{}", self.model.table(), self.model.primary_key());
        self.engine.borrow_mut().where_(&field, id.into(), "=");
        self.fetch_one(fields)
    }

    /// Fetch one record matching the accumulated conditions.
    ///
    /// Returns `Ok(None)` when the engine matches no row. Pending
    /// relations requested through [`with`](Self::with) are consumed by
    /// this call whatever the outcome.
    pub fn fetch_one(&mut self, fields: Option<&[&str]>) -> Result<Option<Fetched>> {
        self.apply_has_one_joins();
        let fetched = self.engine.borrow_mut().get_one(self.model.table(), fields);
        let row = match fetched {
            Ok(row) => row,
            Err(e) => {
                self.pending.clear();
                return Err(e);
            }
        };
        let matched = self.engine.borrow().row_count();
        let Some(mut row) = row.filter(|_| matched > 0) else {
            self.pending.clear();
            return Ok(None);
        };

        decode_stored_fields(&self.model, &mut row);
        let mut attrs = Attributes::from_row(row);
        let resolved = self.resolve_pending(&mut attrs);
        self.pending.clear();
        resolved?;

        Ok(Some(self.materialize_one(attrs)?))
    }

    /// Fetch all records matching the accumulated conditions.
    ///
    /// Returns `Ok(None)` when the engine matches no rows: an explicit
    /// no-results signal, not an empty collection. Pending relations
    /// are consumed once for the whole result set.
    pub fn fetch(&mut self, limit: Option<Limit>, fields: Option<&[&str]>) -> Result<Option<FetchedSet>> {
        self.apply_has_one_joins();
        let fetched = self.engine.borrow_mut().get(self.model.table(), limit, fields);
        let rows = match fetched {
            Ok(rows) => rows,
            Err(e) => {
                self.pending.clear();
                return Err(e);
            }
        };
        let matched = self.engine.borrow().row_count();
        if matched == 0 || rows.is_empty() {
            self.pending.clear();
            return Ok(None);
        }

        let mut all = Vec::with_capacity(rows.len());
        for mut row in rows {
            decode_stored_fields(&self.model, &mut row);
            let mut attrs = Attributes::from_row(row);
            if let Err(e) = self.resolve_pending(&mut attrs) {
                self.pending.clear();
                return Err(e);
            }
            all.push(attrs);
        }
        self.pending.clear();

        Ok(Some(self.materialize_set(all)?))
    }

    /// Total record count for this table.
    pub fn count(&mut self) -> Result<i64> {
        let value = self
            .engine
            .borrow_mut()
            .get_value(self.model.table(), "count(*)")?;
        Ok(value.and_then(|v| v.as_i64()).unwrap_or(0))
    }

    /// Fetch one page of raw rows. The page size is this record's
    /// [`page_limit`](Self::page_limit); the resulting total page count
    /// is readable via [`total_pages`](Self::total_pages).
    pub fn paginate(&mut self, page: u64, fields: Option<&[&str]>) -> Result<Vec<Row>> {
        let rows = {
            let mut engine = self.engine.borrow_mut();
            engine.set_page_limit(self.page_limit);
            engine.paginate(self.model.table(), page, fields)?
        };
        self.total_pages = self.engine.borrow().total_pages();
        Ok(rows)
    }

    /// Page size used by [`paginate`](Self::paginate).
    #[must_use]
    pub fn page_limit(&self) -> u64 {
        self.page_limit
    }

    /// Change the page size used by [`paginate`](Self::paginate).
    pub fn set_page_limit(&mut self, per_page: u64) -> &mut Self {
        self.page_limit = per_page;
        self
    }

    /// Total page count of the last [`paginate`](Self::paginate) call.
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Flatten this record into a plain row: nested records become their
    /// attribute mappings, collections become lists of mappings.
    /// Relations still pending from [`with`](Self::with) are resolved
    /// lazily first.
    pub fn to_row(&mut self) -> Result<Row> {
        let pending: Vec<String> = self.pending.keys().cloned().collect();
        self.pending.clear();
        for name in pending {
            self.get(&name)?;
        }
        Ok(self.attributes.to_row())
    }

    /// Encode this record as JSON, applying the same flattening as
    /// [`to_row`](Self::to_row).
    pub fn to_json(&mut self) -> Result<String> {
        let row = self.to_row()?;
        Ok(serde_json::to_string(&row)?)
    }

    pub(crate) fn materialize_one(&self, attrs: Attributes) -> Result<Fetched> {
        Ok(match self.return_mode {
            ReturnMode::Object => Fetched::Record(Box::new(Record::from_attributes(
                self.model.clone(),
                self.engine.clone(),
                self.registry.clone(),
                attrs,
                self.return_mode,
            ))),
            ReturnMode::Mapping => Fetched::Row(attrs.to_row()),
            ReturnMode::Json => Fetched::Json(serde_json::to_string(&attrs.to_row())?),
        })
    }

    pub(crate) fn materialize_set(&self, all: Vec<Attributes>) -> Result<FetchedSet> {
        Ok(match self.return_mode {
            ReturnMode::Object => FetchedSet::Records(
                all.into_iter()
                    .map(|attrs| {
                        Record::from_attributes(
                            self.model.clone(),
                            self.engine.clone(),
                            self.registry.clone(),
                            attrs,
                            self.return_mode,
                        )
                    })
                    .collect(),
            ),
            ReturnMode::Mapping => FetchedSet::Rows(all.iter().map(Attributes::to_row).collect()),
            ReturnMode::Json => {
                let rows: Vec<Row> = all.iter().map(Attributes::to_row).collect();
                FetchedSet::Json(serde_json::to_string(&rows)?)
            }
        })
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// This record's failure descriptions merged with the engine's last
    /// error text.
    #[must_use]
    pub fn last_error(&self) -> String {
        let mut out = self.errors.join("; ");
        if let Some(err) = self.engine.borrow().last_error() {
            if !out.is_empty() {
                out.push_str("; ");
            }
            out.push_str(&err);
        }
        out
    }

    /// The last query the engine executed, if any.
    #[must_use]
    pub fn last_query(&self) -> Option<String> {
        self.engine.borrow().last_query()
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("model", &self.model.name())
            .field("table", &self.model.table())
            .field("is_new", &self.is_new)
            .field("return_mode", &self.return_mode)
            .field("attributes", &self.attributes)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}
