//! The insert/update/save/delete lifecycle.
//!
//! Candidate data is built from the attribute store by consuming one unit
//! of dirtiness per field, so only changed fields reach the engine.
//! Unsaved nested records are cascade-saved first and replaced by their
//! generated keys. Validation runs between building and executing; a
//! rejected candidate never touches storage.

use std::sync::Arc;

use dbrecord_core::{validate_row, Error, Result, Row, Value};

use crate::attributes::Attr;
use crate::model::{CREATED_AT_FIELD, UPDATED_AT_FIELD};
use crate::record::Record;
use crate::serialize::encode_for_storage;

/// Outcome of preparing one attribute for the candidate row.
enum Prepared {
    Plain(Value),
    SavedKey(Value),
    CascadeFailed(Vec<String>),
    Fatal(Error),
}

impl Record {
    /// Insert this record.
    ///
    /// Stamps `createdAt` when the model declares automatic timestamps,
    /// builds and validates candidate data, and delegates to the engine.
    /// On success the generated key is captured into the record (when it
    /// had none), `is_new` flips to false, and the key is returned.
    pub fn insert(&mut self) -> Result<Value> {
        if self.model.timestamps().created_at {
            self.set(CREATED_AT_FIELD, now_stamp());
        }

        let candidate = self.prepare_data()?;
        if !self.run_validation(&candidate) {
            return Err(self.validation_error());
        }

        tracing::debug!(table = self.model.table(), "inserting record");
        let key = self
            .engine
            .borrow_mut()
            .insert(self.model.table(), &candidate)?;

        if self.primary_key_value().is_none() {
            let pk = self.model.primary_key().to_string();
            self.attributes.insert_raw(&pk, Attr::Value(key.clone()));
        }
        self.is_new = false;

        Ok(key)
    }

    /// Update this record, optionally applying a patch of field changes
    /// first (each entry goes through dirty tracking).
    ///
    /// Requires an existing primary key value. When nothing besides the
    /// primary key changed, succeeds trivially without issuing a write.
    pub fn update(&mut self, patch: Option<Row>) -> Result<bool> {
        let Some(key_value) = self.primary_key_value() else {
            return Err(Error::MissingPrimaryKey);
        };

        if let Some(patch) = patch {
            for (name, value) in patch {
                self.set(&name, value);
            }
        }

        if self.model.timestamps().updated_at {
            self.set(UPDATED_AT_FIELD, now_stamp());
        }

        let candidate = self.prepare_data()?;
        if candidate.len() < 2 {
            return Ok(true);
        }
        if !self.run_validation(&candidate) {
            return Err(self.validation_error());
        }

        tracing::debug!(table = self.model.table(), "updating record");
        let mut engine = self.engine.borrow_mut();
        engine.where_(self.model.primary_key(), key_value, "=");
        engine.update(self.model.table(), &candidate)
    }

    /// Insert when new, update otherwise. Returns the record's key: the
    /// generated one on the insert path, the existing one on the update
    /// path.
    pub fn save(&mut self, patch: Option<Row>) -> Result<Value> {
        if self.is_new {
            self.insert()
        } else {
            self.update(patch)?;
            Ok(self.primary_key_value().unwrap_or(Value::Null))
        }
    }

    /// Delete this record's row. Requires an existing primary key value.
    pub fn delete(&mut self) -> Result<bool> {
        let Some(key_value) = self.primary_key_value() else {
            return Err(Error::MissingPrimaryKey);
        };

        tracing::debug!(table = self.model.table(), "deleting record");
        let mut engine = self.engine.borrow_mut();
        engine.where_(self.model.primary_key(), key_value, "=");
        engine.delete(self.model.table())
    }

    /// Build candidate data for a write.
    ///
    /// Resets the error list, runs the model's prepare hook on the full
    /// attribute set, then, for schema-less models, passes everything
    /// through unfiltered. Otherwise the primary key is forced dirty and
    /// each non-null attribute with dirtiness left is consumed: unsaved
    /// nested records are cascade-saved (their errors merge into this
    /// record's on failure, leaving the field out), non-schema fields are
    /// dropped after their dirtiness is consumed, and composite values of
    /// declared encoded fields are transcoded.
    pub(crate) fn prepare_data(&mut self) -> Result<Row> {
        self.errors.clear();
        if self.attributes.is_empty() {
            return Ok(Row::new());
        }

        let model = Arc::clone(&self.model);
        if let Some(hook) = model.prepare_hook() {
            hook(&mut self.attributes);
        }

        let Some(schema) = model.fields() else {
            return Ok(self.attributes.to_row());
        };

        self.attributes.force_dirty(model.primary_key());

        let names: Vec<String> = self.attributes.names().map(str::to_string).collect();
        let mut candidate = Row::new();

        for name in names {
            if self
                .attributes
                .get(&name)
                .is_none_or(Attr::is_null)
            {
                continue;
            }
            if self.attributes.dirty_count(&name) == 0 {
                continue;
            }
            self.attributes.consume_dirty(&name);

            let outcome = match self.attributes.get_mut(&name) {
                None => continue,
                Some(Attr::Record(nested)) if nested.is_new() => match nested.save(None) {
                    Ok(key) => Prepared::SavedKey(key),
                    Err(Error::Validation { .. }) => {
                        Prepared::CascadeFailed(nested.errors().to_vec())
                    }
                    Err(e) => Prepared::Fatal(e),
                },
                Some(Attr::Record(nested)) => {
                    Prepared::Plain(nested.primary_key_value().unwrap_or(Value::Null))
                }
                Some(attr) => Prepared::Plain(attr.flatten()),
            };

            let value = match outcome {
                Prepared::Plain(value) => value,
                Prepared::SavedKey(key) => {
                    self.attributes.insert_raw(&name, Attr::Value(key.clone()));
                    key
                }
                Prepared::CascadeFailed(nested_errors) => {
                    self.errors.extend(nested_errors);
                    continue;
                }
                Prepared::Fatal(e) => return Err(e),
            };

            if !schema.contains(&name) {
                continue;
            }

            let value = encode_for_storage(&model, &name, &value)?;
            candidate.insert(name, value);
        }

        Ok(candidate)
    }

    fn run_validation(&mut self, candidate: &Row) -> bool {
        match self.model.fields() {
            None => true,
            Some(schema) => validate_row(
                self.model.table(),
                schema,
                candidate,
                self.model.validate_options(),
                &mut self.errors,
            ),
        }
    }

    fn validation_error(&self) -> Error {
        Error::Validation {
            table: self.model.table().to_string(),
            details: self.errors.join("; "),
        }
    }
}

fn now_stamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
