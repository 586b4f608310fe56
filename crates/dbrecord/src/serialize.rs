//! Result shapes and stored-field transcoding.
//!
//! Fetch results materialize in one of three shapes, chosen per record
//! instance: fully-typed records, plain attribute mappings, or the JSON
//! encoding of the mapping form. Declared JSON and pipe-delimited fields
//! are decoded once per fetched row, before relation resolution so that
//! relation keys are unaffected, and re-encoded when candidate data is
//! built.

use dbrecord_core::{Result, Row, Value};

use crate::model::ModelDef;
use crate::record::Record;

/// The shape fetch results materialize in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReturnMode {
    /// Fully-typed [`Record`] instances.
    #[default]
    Object,
    /// Plain attribute mappings.
    Mapping,
    /// The JSON encoding of the mapping form.
    Json,
}

/// A single fetched result, shaped per [`ReturnMode`].
#[derive(Debug, Clone)]
pub enum Fetched {
    /// Object mode: a hydrated record.
    Record(Box<Record>),
    /// Mapping mode: the attribute mapping.
    Row(Row),
    /// Json mode: the encoded mapping.
    Json(String),
}

impl Fetched {
    /// Unwrap the record, if materialized in object mode.
    #[must_use]
    pub fn into_record(self) -> Option<Record> {
        match self {
            Fetched::Record(r) => Some(*r),
            _ => None,
        }
    }

    /// Borrow the record, if materialized in object mode.
    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Fetched::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Unwrap the mapping, if materialized in mapping mode.
    #[must_use]
    pub fn into_row(self) -> Option<Row> {
        match self {
            Fetched::Row(row) => Some(row),
            _ => None,
        }
    }

    /// Unwrap the JSON string, if materialized in JSON mode.
    #[must_use]
    pub fn into_json(self) -> Option<String> {
        match self {
            Fetched::Json(s) => Some(s),
            _ => None,
        }
    }
}

/// A fetched result set, shaped per [`ReturnMode`].
#[derive(Debug, Clone)]
pub enum FetchedSet {
    /// Object mode: hydrated records.
    Records(Vec<Record>),
    /// Mapping mode: attribute mappings.
    Rows(Vec<Row>),
    /// Json mode: the encoded array of mappings.
    Json(String),
}

impl FetchedSet {
    /// Unwrap the records, if materialized in object mode.
    #[must_use]
    pub fn into_records(self) -> Option<Vec<Record>> {
        match self {
            FetchedSet::Records(list) => Some(list),
            _ => None,
        }
    }

    /// Unwrap the mappings, if materialized in mapping mode.
    #[must_use]
    pub fn into_rows(self) -> Option<Vec<Row>> {
        match self {
            FetchedSet::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// Unwrap the JSON string, if materialized in JSON mode.
    #[must_use]
    pub fn into_json(self) -> Option<String> {
        match self {
            FetchedSet::Json(s) => Some(s),
            _ => None,
        }
    }
}

/// Decode declared JSON and pipe-delimited fields of a freshly fetched
/// row in place. Undecodable JSON logs a warning and yields `Null`.
pub(crate) fn decode_stored_fields(model: &ModelDef, row: &mut Row) {
    for name in model.json_fields() {
        let Some(raw) = row.get(name).and_then(Value::as_str).map(str::to_string) else {
            continue;
        };
        let decoded = match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(json) => Value::from(json),
            Err(e) => {
                tracing::warn!(
                    table = model.table(),
                    field = name.as_str(),
                    error = %e,
                    "undecodable stored json"
                );
                Value::Null
            }
        };
        row.insert(name.clone(), decoded);
    }

    for name in model.list_fields() {
        let Some(raw) = row.get(name).and_then(Value::as_str).map(str::to_string) else {
            continue;
        };
        let items = raw
            .split('|')
            .map(|part| Value::Text(part.to_string()))
            .collect::<Vec<_>>();
        row.insert(name.clone(), Value::List(items));
    }
}

/// Encode a candidate value for storage. Only composite values are
/// transcoded: declared JSON fields encode to JSON text, declared pipe
/// fields join their rendered items with `|`. Scalars pass through.
pub(crate) fn encode_for_storage(model: &ModelDef, name: &str, value: &Value) -> Result<Value> {
    if !value.is_composite() {
        return Ok(value.clone());
    }

    if model.is_json_field(name) {
        return Ok(Value::Text(serde_json::to_string(value)?));
    }

    if model.is_list_field(name) {
        if let Value::List(items) = value {
            let joined = items
                .iter()
                .map(|item| item.render().unwrap_or_default())
                .collect::<Vec<_>>()
                .join("|");
            return Ok(Value::Text(joined));
        }
    }

    Ok(value.clone())
}
