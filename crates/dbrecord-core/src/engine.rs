//! The query-engine contract.
//!
//! DbRecord never builds or executes SQL itself. Everything below the
//! record layer (dialects, parameter binding, escaping, transactions,
//! pagination math) belongs to an engine implementing this trait, which
//! is injected into every record explicitly.
//!
//! The contract is stateful: `where_`/`or_where`/`join`/`set_query_option`
//! accumulate clause state that applies to the *next* executed query and
//! is consumed (reset) by it. The model is strictly synchronous
//! call-and-return; engines must not require a runtime.

use crate::row::Row;
use crate::value::Value;
use crate::Result;

/// SQL join kind requested by relation resolution or an explicit join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JoinKind {
    /// LEFT join, the default. Used by eager hasOne resolution.
    #[default]
    Left,
    /// RIGHT join.
    Right,
    /// INNER join.
    Inner,
    /// OUTER join.
    Outer,
}

impl JoinKind {
    /// SQL keyword for this join kind.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
            JoinKind::Inner => "INNER",
            JoinKind::Outer => "OUTER",
        }
    }
}

/// Sort direction for `order_by`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderDirection {
    /// Ascending.
    Asc,
    /// Descending, the default.
    #[default]
    Desc,
}

impl OrderDirection {
    /// SQL keyword for this direction.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// Option applied to the next query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum QueryOption {
    /// Group joined columns under the joined table's name in each result
    /// row, so a to-one relation arrives as a nested mapping.
    NestedResults,
}

/// Row limit for a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    /// Maximum number of rows.
    pub count: u64,
    /// Rows to skip first.
    pub offset: u64,
}

impl Limit {
    /// Limit to `count` rows from the start.
    #[must_use]
    pub const fn new(count: u64) -> Self {
        Self { count, offset: 0 }
    }

    /// Skip `offset` rows first.
    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }
}

impl From<u64> for Limit {
    fn from(count: u64) -> Self {
        Limit::new(count)
    }
}

/// The delegated storage layer.
///
/// All fetches yield typed [`Row`]s; shaping results into records,
/// mappings or JSON is wholly the record layer's concern. Clause state
/// accumulated through the filter methods is consumed by the next
/// executed query, so two query constructions must never be interleaved
/// against the same engine.
pub trait QueryEngine {
    /// Add an AND-ed condition to the next query.
    fn where_(&mut self, field: &str, value: Value, operator: &str);

    /// Add an OR-ed condition to the next query.
    fn or_where(&mut self, field: &str, value: Value, operator: &str);

    /// Add a join to the next query. `condition` is the full join
    /// condition, e.g. `users.avatarid = avatar.id`.
    fn join(&mut self, table: &str, condition: &str, kind: JoinKind);

    /// Apply a query option to the next query.
    fn set_query_option(&mut self, option: QueryOption);

    /// Order the next query's rows.
    fn order_by(&mut self, field: &str, direction: OrderDirection);

    /// Group the next query's rows.
    fn group_by(&mut self, field: &str);

    /// Insert a row, returning the generated key (or the engine's
    /// equivalent signal when the table generates none).
    fn insert(&mut self, table: &str, data: &Row) -> Result<Value>;

    /// Update rows matched by the accumulated conditions.
    fn update(&mut self, table: &str, data: &Row) -> Result<bool>;

    /// Delete rows matched by the accumulated conditions.
    fn delete(&mut self, table: &str) -> Result<bool>;

    /// Fetch rows matched by the accumulated conditions.
    fn get(&mut self, table: &str, limit: Option<Limit>, fields: Option<&[&str]>)
        -> Result<Vec<Row>>;

    /// Fetch a single row matched by the accumulated conditions.
    fn get_one(&mut self, table: &str, fields: Option<&[&str]>) -> Result<Option<Row>>;

    /// Fetch a single scalar, e.g. `count(*)`.
    fn get_value(&mut self, table: &str, expression: &str) -> Result<Option<Value>>;

    /// Fetch one page of rows; the page size comes from
    /// [`set_page_limit`](Self::set_page_limit) and the resulting page
    /// count is readable via [`total_pages`](Self::total_pages).
    fn paginate(&mut self, table: &str, page: u64, fields: Option<&[&str]>) -> Result<Vec<Row>>;

    /// Set the page size used by [`paginate`](Self::paginate).
    fn set_page_limit(&mut self, per_page: u64);

    /// Total page count of the last paginate call.
    fn total_pages(&self) -> u64;

    /// Rows matched by the last fetch.
    fn row_count(&self) -> u64;

    /// Text of the last error the engine observed, if any.
    fn last_error(&self) -> Option<String>;

    /// Text of the last query the engine executed, if any.
    fn last_query(&self) -> Option<String>;
}
