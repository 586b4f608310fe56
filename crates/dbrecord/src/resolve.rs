//! Relation resolution.
//!
//! Two strategies, one per relation kind. A `hasOne` relation is folded
//! into the main query: before the fetch, the engine is told to group
//! joined columns under the target table's name, and the target table is
//! joined on the parent's foreign key; after the fetch, the nested group
//! is rewritten under the relation name. A `hasMany` relation is always a
//! follow-up fetch: one query per parent row, filtered by the target's
//! foreign key, in row order.
//!
//! Both strategies also run on demand when an unresolved relation is read
//! as a field, with the result cached in the attribute store.

use dbrecord_core::{JoinKind, QueryOption, RelationDef, RelationKind, Result, Value};

use crate::attributes::{Attr, Attributes};
use crate::record::Record;
use crate::serialize::{Fetched, FetchedSet, ReturnMode};

impl Record {
    /// Request a declared relation to be loaded together with the next
    /// fetch. The request is consumed by exactly one `fetch`/`fetch_one`
    /// call.
    ///
    /// # Panics
    ///
    /// Panics when no relation of that name is declared on the model:
    /// that is a mistake in the relation declarations, not bad data.
    pub fn with(&mut self, name: &str) -> &mut Self {
        let Some(rel) = self.model.relation(name).cloned() else {
            panic!(
                "no relation named `{name}` declared on model `{}`",
                self.model.name()
            );
        };
        self.pending.insert(name.to_string(), rel);
        self
    }

    /// Join another model's table into the next query.
    ///
    /// `key` defaults to the target name suffixed with `id` and joins
    /// against `target_key`, which defaults to the target's qualified
    /// primary key. A `key` containing a dot is used as-is; a bare key is
    /// qualified with this record's table.
    ///
    /// # Panics
    ///
    /// Panics when the target model is not registered.
    pub fn join(
        &mut self,
        target: &str,
        key: Option<&str>,
        kind: JoinKind,
        target_key: Option<&str>,
    ) -> &mut Self {
        let target_model = self.registry.expect_model(target);
        let key = key.map_or_else(|| format!("{target}id"), str::to_string);
        let target_key = target_key.map_or_else(
            || format!("{}.{}", target_model.table(), target_model.primary_key()),
            str::to_string,
        );
        let condition = if key.contains('.') {
            format!("{key} = {target_key}")
        } else {
            format!("{}.{key} = {target_key}", self.model.table())
        };
        self.engine
            .borrow_mut()
            .join(target_model.table(), &condition, kind);
        self
    }

    /// Fold every pending `hasOne` relation into the next query: request
    /// nested result grouping and join the target table.
    pub(crate) fn apply_has_one_joins(&self) {
        let mut engine = self.engine.borrow_mut();
        for (name, rel) in &self.pending {
            if rel.kind != RelationKind::HasOne {
                continue;
            }
            let target = self.registry.expect_model(&rel.target);
            engine.set_query_option(QueryOption::NestedResults);
            let key = rel.has_one_key(name);
            let condition = if key.contains('.') {
                format!("{key} = {}.{}", target.table(), target.primary_key())
            } else {
                format!(
                    "{}.{key} = {}.{}",
                    self.model.table(),
                    target.table(),
                    target.primary_key()
                )
            };
            engine.join(target.table(), &condition, JoinKind::Left);
        }
    }

    /// Resolve every pending relation against one fetched row's
    /// attributes. Does not clear the pending set; the caller does that
    /// once per fetch, after the whole result set.
    pub(crate) fn resolve_pending(&self, attrs: &mut Attributes) -> Result<()> {
        for (name, rel) in &self.pending {
            match rel.kind {
                RelationKind::HasOne => self.fold_has_one(name, rel, attrs)?,
                RelationKind::HasMany => {
                    let parent_key = attrs.get_value(self.model.primary_key()).cloned();
                    let resolved = self.resolve_has_many(rel, parent_key)?;
                    attrs.insert_raw(name, resolved);
                }
            }
        }
        Ok(())
    }

    /// Rewrite a joined nested group under the relation name, or fall
    /// back to an on-demand fetch when the engine produced no group.
    fn fold_has_one(&self, name: &str, rel: &RelationDef, attrs: &mut Attributes) -> Result<()> {
        let target = self.registry.expect_model(&rel.target);

        match attrs.take(target.table()) {
            Some(Attr::Value(Value::Map(nested))) => {
                let has_key = nested
                    .get(target.primary_key())
                    .is_some_and(|v| !v.is_null());
                let resolved = if has_key {
                    match self.return_mode {
                        ReturnMode::Object => Attr::Record(Box::new(Record::hydrate(
                            target,
                            self.engine.clone(),
                            self.registry.clone(),
                            nested,
                            self.return_mode,
                        ))),
                        ReturnMode::Mapping | ReturnMode::Json => Attr::Value(Value::Map(nested)),
                    }
                } else {
                    Attr::Value(Value::Null)
                };
                attrs.insert_raw(name, resolved);
            }
            Some(other) => {
                // not a nested group; leave the column alone and load on
                // demand instead
                attrs.insert_raw(target.table(), other);
                self.fold_has_one_lazily(name, rel, attrs)?;
            }
            None => self.fold_has_one_lazily(name, rel, attrs)?,
        }
        Ok(())
    }

    fn fold_has_one_lazily(
        &self,
        name: &str,
        rel: &RelationDef,
        attrs: &mut Attributes,
    ) -> Result<()> {
        let fk = rel.has_one_key(name);
        let fk_value = attrs.get_value(&fk).cloned();
        let resolved = self.resolve_has_one(rel, fk_value)?;
        attrs.insert_raw(name, resolved);
        Ok(())
    }

    /// Fetch a `hasOne` target by its primary key.
    pub(crate) fn resolve_has_one(
        &self,
        rel: &RelationDef,
        fk_value: Option<Value>,
    ) -> Result<Attr> {
        let Some(fk_value) = fk_value.filter(|v| !v.is_null()) else {
            return Ok(Attr::Value(Value::Null));
        };

        let target = self.registry.expect_model(&rel.target);
        tracing::debug!(
            table = target.table(),
            "loading to-one relation on demand"
        );
        let mut child = Record::new(target, self.engine.clone(), self.registry.clone());
        child.set_return_mode(self.child_mode());

        Ok(match child.by_id(fk_value, None)? {
            Some(Fetched::Record(record)) => Attr::Record(record),
            Some(Fetched::Row(row)) => Attr::Value(Value::Map(row)),
            Some(Fetched::Json(raw)) => Attr::Value(Value::Text(raw)),
            None => Attr::Value(Value::Null),
        })
    }

    /// Fetch a `hasMany` collection filtered by the parent's key.
    pub(crate) fn resolve_has_many(
        &self,
        rel: &RelationDef,
        parent_key: Option<Value>,
    ) -> Result<Attr> {
        let Some(parent_key) = parent_key.filter(|v| !v.is_null()) else {
            return Ok(Attr::Value(Value::Null));
        };

        let target = self.registry.expect_model(&rel.target);
        let fk = rel
            .foreign_key
            .clone()
            .unwrap_or_else(|| format!("{}id", self.model.name()));
        tracing::debug!(
            table = target.table(),
            key = fk.as_str(),
            "loading to-many relation"
        );
        let mut child = Record::new(target, self.engine.clone(), self.registry.clone());
        child.set_return_mode(self.child_mode());
        child.where_(&fk, parent_key);

        Ok(match child.fetch(None, None)? {
            Some(FetchedSet::Records(records)) => Attr::Records(records),
            Some(FetchedSet::Rows(rows)) => {
                Attr::Value(Value::List(rows.into_iter().map(Value::Map).collect()))
            }
            Some(FetchedSet::Json(raw)) => Attr::Value(Value::Text(raw)),
            None => Attr::Value(Value::Null),
        })
    }

    /// The mode child records are fetched in. Json parents fetch their
    /// relations in mapping form and encode once at the end.
    fn child_mode(&self) -> ReturnMode {
        match self.return_mode {
            ReturnMode::Object => ReturnMode::Object,
            ReturnMode::Mapping | ReturnMode::Json => ReturnMode::Mapping,
        }
    }
}
