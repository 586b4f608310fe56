//! Shared test fixtures: a scripted in-memory query engine plus the
//! standard user/avatar/product model set.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

use dbrecord::{
    Engine, Error, JoinKind, Limit, ModelDef, OrderDirection, QueryEngine, QueryOption, Registry,
    Result, Row, Value,
};
use dbrecord_core::FieldType;

/// One accumulated condition, as the engine received it.
#[derive(Debug, Clone, PartialEq)]
pub struct Cond {
    pub field: String,
    pub value: Value,
    pub operator: String,
    pub or: bool,
}

/// One accumulated join, as the engine received it.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub table: String,
    pub condition: String,
    pub kind: JoinKind,
}

/// Every executed query, with the clause state it consumed.
#[derive(Debug, Clone)]
pub enum Call {
    Insert {
        table: String,
        data: Row,
    },
    Update {
        table: String,
        data: Row,
        conditions: Vec<Cond>,
    },
    Delete {
        table: String,
        conditions: Vec<Cond>,
    },
    Get {
        table: String,
        conditions: Vec<Cond>,
        joins: Vec<Join>,
        options: Vec<QueryOption>,
        limit: Option<Limit>,
    },
    GetOne {
        table: String,
        conditions: Vec<Cond>,
        joins: Vec<Join>,
        options: Vec<QueryOption>,
    },
    GetValue {
        table: String,
        expression: String,
    },
    Paginate {
        table: String,
        page: u64,
        per_page: u64,
    },
}

/// A scripted engine: accumulated clauses are drained into the recorded
/// [`Call`] each time a query executes, and results come from the
/// per-operation queues (with benign defaults when a queue runs dry).
pub struct MockEngine {
    conditions: Vec<Cond>,
    joins: Vec<Join>,
    options: Vec<QueryOption>,
    orders: Vec<(String, OrderDirection)>,
    groups: Vec<String>,
    pub calls: Vec<Call>,
    pub get_results: VecDeque<Vec<Row>>,
    pub one_results: VecDeque<Option<Row>>,
    pub insert_keys: VecDeque<Value>,
    pub scalar_results: VecDeque<Option<Value>>,
    pub paginate_results: VecDeque<Vec<Row>>,
    pub pages_total: u64,
    pub fail_next: Option<String>,
    row_count: u64,
    page_limit: u64,
    last_query: Option<String>,
    last_error: Option<String>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            conditions: Vec::new(),
            joins: Vec::new(),
            options: Vec::new(),
            orders: Vec::new(),
            groups: Vec::new(),
            calls: Vec::new(),
            get_results: VecDeque::new(),
            one_results: VecDeque::new(),
            insert_keys: VecDeque::new(),
            scalar_results: VecDeque::new(),
            paginate_results: VecDeque::new(),
            pages_total: 0,
            fail_next: None,
            row_count: 0,
            page_limit: 20,
            last_query: None,
            last_error: None,
        }
    }

    /// True when no clause state is waiting for the next query.
    pub fn is_drained(&self) -> bool {
        self.conditions.is_empty()
            && self.joins.is_empty()
            && self.options.is_empty()
            && self.orders.is_empty()
            && self.groups.is_empty()
    }

    fn drain(&mut self) -> (Vec<Cond>, Vec<Join>, Vec<QueryOption>) {
        self.orders.clear();
        self.groups.clear();
        (
            std::mem::take(&mut self.conditions),
            std::mem::take(&mut self.joins),
            std::mem::take(&mut self.options),
        )
    }

    fn take_failure(&mut self) -> Option<Error> {
        let message = self.fail_next.take()?;
        self.last_error = Some(message.clone());
        Some(Error::Engine(message))
    }
}

impl QueryEngine for MockEngine {
    fn where_(&mut self, field: &str, value: Value, operator: &str) {
        self.conditions.push(Cond {
            field: field.to_string(),
            value,
            operator: operator.to_string(),
            or: false,
        });
    }

    fn or_where(&mut self, field: &str, value: Value, operator: &str) {
        self.conditions.push(Cond {
            field: field.to_string(),
            value,
            operator: operator.to_string(),
            or: true,
        });
    }

    fn join(&mut self, table: &str, condition: &str, kind: JoinKind) {
        self.joins.push(Join {
            table: table.to_string(),
            condition: condition.to_string(),
            kind,
        });
    }

    fn set_query_option(&mut self, option: QueryOption) {
        self.options.push(option);
    }

    fn order_by(&mut self, field: &str, direction: OrderDirection) {
        self.orders.push((field.to_string(), direction));
    }

    fn group_by(&mut self, field: &str) {
        self.groups.push(field.to_string());
    }

    fn insert(&mut self, table: &str, data: &Row) -> Result<Value> {
        self.drain();
        self.last_query = Some(format!("INSERT INTO {table}"));
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        self.calls.push(Call::Insert {
            table: table.to_string(),
            data: data.clone(),
        });
        Ok(self.insert_keys.pop_front().unwrap_or(Value::Int(1)))
    }

    fn update(&mut self, table: &str, data: &Row) -> Result<bool> {
        let (conditions, _, _) = self.drain();
        self.last_query = Some(format!("UPDATE {table}"));
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        self.calls.push(Call::Update {
            table: table.to_string(),
            data: data.clone(),
            conditions,
        });
        Ok(true)
    }

    fn delete(&mut self, table: &str) -> Result<bool> {
        let (conditions, _, _) = self.drain();
        self.last_query = Some(format!("DELETE FROM {table}"));
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        self.calls.push(Call::Delete {
            table: table.to_string(),
            conditions,
        });
        Ok(true)
    }

    fn get(
        &mut self,
        table: &str,
        limit: Option<Limit>,
        _fields: Option<&[&str]>,
    ) -> Result<Vec<Row>> {
        let (conditions, joins, options) = self.drain();
        self.last_query = Some(format!("SELECT FROM {table}"));
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let rows = self.get_results.pop_front().unwrap_or_default();
        self.row_count = rows.len() as u64;
        self.calls.push(Call::Get {
            table: table.to_string(),
            conditions,
            joins,
            options,
            limit,
        });
        Ok(rows)
    }

    fn get_one(&mut self, table: &str, _fields: Option<&[&str]>) -> Result<Option<Row>> {
        let (conditions, joins, options) = self.drain();
        self.last_query = Some(format!("SELECT ONE FROM {table}"));
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let row = self.one_results.pop_front().flatten();
        self.row_count = u64::from(row.is_some());
        self.calls.push(Call::GetOne {
            table: table.to_string(),
            conditions,
            joins,
            options,
        });
        Ok(row)
    }

    fn get_value(&mut self, table: &str, expression: &str) -> Result<Option<Value>> {
        self.drain();
        self.last_query = Some(format!("SELECT {expression} FROM {table}"));
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let value = self.scalar_results.pop_front().flatten();
        self.row_count = u64::from(value.is_some());
        self.calls.push(Call::GetValue {
            table: table.to_string(),
            expression: expression.to_string(),
        });
        Ok(value)
    }

    fn paginate(&mut self, table: &str, page: u64, _fields: Option<&[&str]>) -> Result<Vec<Row>> {
        self.drain();
        self.last_query = Some(format!("SELECT PAGE {page} FROM {table}"));
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        let rows = self.paginate_results.pop_front().unwrap_or_default();
        self.row_count = rows.len() as u64;
        self.calls.push(Call::Paginate {
            table: table.to_string(),
            page,
            per_page: self.page_limit,
        });
        Ok(rows)
    }

    fn set_page_limit(&mut self, per_page: u64) {
        self.page_limit = per_page;
    }

    fn total_pages(&self) -> u64 {
        self.pages_total
    }

    fn row_count(&self) -> u64 {
        self.row_count
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }

    fn last_query(&self) -> Option<String> {
        self.last_query.clone()
    }
}

/// Build a row from name/value pairs.
pub fn row(pairs: &[(&str, Value)]) -> Row {
    pairs.iter().map(|(k, v)| (*k, v.clone())).collect()
}

/// A fresh scripted engine plus its trait-object handle.
pub fn engine() -> (Rc<RefCell<MockEngine>>, Engine) {
    let mock = Rc::new(RefCell::new(MockEngine::new()));
    let handle: Engine = mock.clone();
    (mock, handle)
}

/// The standard fixture models: a user with a to-one avatar and to-many
/// products.
pub fn registry() -> Arc<Registry> {
    let mut registry = Registry::new();
    registry.register(
        ModelDef::builder("user")
            .table("users")
            .field("id", FieldType::Int)
            .field("login", FieldType::Text)
            .field("age", FieldType::Int)
            .field("avatarid", FieldType::Int)
            .has_one("avatar", "avatar")
            .has_many("products", "product", "userid")
            .build(),
    );
    registry.register(
        ModelDef::builder("avatar")
            .table("avatars")
            .field("id", FieldType::Int)
            .field("url", FieldType::Text)
            .build(),
    );
    registry.register(
        ModelDef::builder("product")
            .table("products")
            .field("id", FieldType::Int)
            .field("userid", FieldType::Int)
            .field("title", FieldType::Text)
            .build(),
    );
    Arc::new(registry)
}
