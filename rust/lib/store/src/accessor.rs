//! Accessor: CRUD + search over one noun's record store.
//!
//! The store is an insertion-ordered `id -> record` map owned by the accessor.
//! Locks are held only for a single read or write, never while hooks run, so
//! hooks may call back into any accessor (cascades) freely.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use nounbase_core::{ListOptions, ServiceError, new_id};
use nounbase_schema::NounSchema;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::debug;

use crate::filter::matches_filter;
use crate::hooks::{Hooks, ResolveRelations};
use crate::record::{CREATED_AT, ID, Record, UPDATED_AT, into_record, merge_fields, type_name};
use crate::search::{self, ScoredRecord};
use crate::timestamp::{stamp_create, stamp_update};

/// Options for `Accessor::get_with`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Relation fields to resolve. `None` resolves every relation field.
    pub include: Option<Vec<String>>,
}

impl GetOptions {
    /// Resolve only the named relation fields.
    pub fn include<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: Some(fields.into_iter().map(Into::into).collect()),
        }
    }

    /// Resolve no relation fields.
    pub fn raw() -> Self {
        Self { include: Some(Vec::new()) }
    }
}

pub struct Accessor {
    noun: String,
    id_prefix: String,
    schema: RwLock<Arc<NounSchema>>,
    records: RwLock<IndexMap<String, Record>>,
    hooks: RwLock<Hooks>,
    resolver: RwLock<Option<Arc<dyn ResolveRelations>>>,
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("noun", &self.noun)
            .field("id_prefix", &self.id_prefix)
            .field("records", &self.records.read().len())
            .field("hooks", &!self.hooks.read().is_empty())
            .field("resolver", &self.resolver.read().is_some())
            .finish()
    }
}

impl Accessor {
    /// Create an empty store for the schema's noun, with no hooks and no
    /// relation resolver.
    pub fn new(schema: NounSchema) -> Self {
        let noun = schema.noun().to_string();
        Self {
            id_prefix: default_id_prefix(&noun),
            noun,
            schema: RwLock::new(Arc::new(schema)),
            records: RwLock::new(IndexMap::new()),
            hooks: RwLock::new(Hooks::new()),
            resolver: RwLock::new(None),
        }
    }

    pub fn with_hooks(self, hooks: Hooks) -> Self {
        self.add_hooks(hooks);
        self
    }

    pub fn with_resolver(self, resolver: Arc<dyn ResolveRelations>) -> Self {
        self.set_resolver(resolver);
        self
    }

    /// Override the prefix used for generated ids (default: first three
    /// letters of the noun, lowercased).
    pub fn with_id_prefix(mut self, prefix: &str) -> Self {
        self.id_prefix = prefix.to_string();
        self
    }

    pub fn noun(&self) -> &str {
        &self.noun
    }

    pub fn schema(&self) -> Arc<NounSchema> {
        self.schema.read().clone()
    }

    /// Swap the whole schema. Stored records are kept as they are.
    pub fn replace_schema(&self, schema: NounSchema) -> Result<(), ServiceError> {
        if schema.noun() != self.noun {
            return Err(ServiceError::Validation(format!(
                "schema for '{}' cannot replace schema of '{}'",
                schema.noun(),
                self.noun
            )));
        }
        *self.schema.write() = Arc::new(schema);
        debug!(noun = %self.noun, "schema replaced");
        Ok(())
    }

    /// Append hooks after the ones already registered.
    pub fn add_hooks(&self, hooks: Hooks) {
        self.hooks.write().extend(hooks);
    }

    pub fn set_resolver(&self, resolver: Arc<dyn ResolveRelations>) {
        *self.resolver.write() = Some(resolver);
    }

    fn hooks(&self) -> Hooks {
        self.hooks.read().clone()
    }

    fn not_found(&self, id: &str) -> ServiceError {
        ServiceError::NotFound(format!("{} '{}' not found", self.noun, id))
    }

    // ── Create ──────────────────────────────────────────────────────

    /// Insert a new record.
    ///
    /// Runs `before_create`, assigns an id when none is given, stamps
    /// timestamps, inserts, then runs `after_create`.
    pub fn create(&self, data: Value) -> Result<Record, ServiceError> {
        let hooks = self.hooks();
        let mut record = hooks.run_before_create(into_record(data)?)?;

        record.remove(CREATED_AT);
        record.remove(UPDATED_AT);
        let id = match record.remove(ID) {
            None | Some(Value::Null) => new_id(&self.id_prefix),
            Some(Value::String(s)) if s.is_empty() => new_id(&self.id_prefix),
            Some(Value::String(s)) => s,
            Some(other) => {
                return Err(ServiceError::Validation(format!(
                    "{} id must be a string, got {}",
                    self.noun,
                    type_name(&other)
                )));
            }
        };

        let mut stored = Record::new();
        stored.insert(ID.into(), Value::String(id.clone()));
        stored.extend(record);
        stamp_create(&mut stored);

        {
            let mut records = self.records.write();
            if records.contains_key(&id) {
                return Err(ServiceError::Conflict(format!(
                    "{} '{}' already exists",
                    self.noun, id
                )));
            }
            records.insert(id.clone(), stored.clone());
        }
        debug!(noun = %self.noun, id = %id, "created");

        hooks.run_after_create(&stored)?;
        Ok(stored)
    }

    // ── Read ────────────────────────────────────────────────────────

    /// Get a record with every relation field resolved.
    pub fn get(&self, id: &str) -> Result<Option<Record>, ServiceError> {
        self.get_with(id, &GetOptions::default())
    }

    /// Get a record, resolving the relation fields selected by `options`.
    pub fn get_with(&self, id: &str, options: &GetOptions) -> Result<Option<Record>, ServiceError> {
        let Some(record) = self.get_raw(id) else {
            return Ok(None);
        };
        let resolver = self.resolver.read().clone();
        match resolver {
            Some(resolver) => {
                let schema = self.schema();
                resolver
                    .resolve(&schema, record, options.include.as_deref())
                    .map(Some)
            }
            None => Ok(Some(record)),
        }
    }

    /// Get a record or return NotFound.
    pub fn get_or_err(&self, id: &str) -> Result<Record, ServiceError> {
        self.get(id)?.ok_or_else(|| self.not_found(id))
    }

    /// Copy of the stored record, relations untouched.
    pub fn get_raw(&self, id: &str) -> Option<Record> {
        self.records.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.read().contains_key(id)
    }

    /// Copies of every stored record, in insertion order.
    pub fn scan(&self) -> Vec<Record> {
        self.records.read().values().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.records.read().len()
    }

    /// Records in insertion order, sliced by `offset`/`limit`.
    pub fn list(&self, options: &ListOptions) -> Vec<Record> {
        let records = self.records.read();
        let page = records.values().skip(options.offset);
        match options.limit {
            Some(limit) => page.take(limit).cloned().collect(),
            None => page.cloned().collect(),
        }
    }

    /// Records whose fields match every key/value of `filter` exactly.
    pub fn find(&self, filter: &Map<String, Value>) -> Vec<Record> {
        let schema = self.schema();
        self.records
            .read()
            .values()
            .filter(|r| matches_filter(&schema, r, filter))
            .cloned()
            .collect()
    }

    /// Case-insensitive substring search over string-valued fields.
    pub fn search(&self, query: &str) -> Vec<Record> {
        self.records
            .read()
            .values()
            .filter(|r| search::matches(r, query))
            .cloned()
            .collect()
    }

    /// Word-scored search, best matches first.
    pub fn semantic_search(&self, query: &str) -> Vec<ScoredRecord> {
        let records = self.scan();
        search::rank(records, query)
    }

    // ── Update ──────────────────────────────────────────────────────

    /// Merge `partial` over an existing record.
    ///
    /// Each top-level field of `partial` replaces the stored one whole; `null`
    /// removes it. `id` and `createdAt` are preserved, `updatedAt` is
    /// refreshed. A failing `before_update` hook leaves the record untouched.
    pub fn update(&self, id: &str, partial: Value) -> Result<Record, ServiceError> {
        let existing = self.get_raw(id).ok_or_else(|| self.not_found(id))?;
        let hooks = self.hooks();
        let mut partial = hooks.run_before_update(id, into_record(partial)?, &existing)?;

        partial.remove(ID);
        partial.remove(CREATED_AT);
        partial.remove(UPDATED_AT);

        let updated = {
            let mut records = self.records.write();
            let current = records.get_mut(id).ok_or_else(|| self.not_found(id))?;
            let previous = current.get(UPDATED_AT).cloned();
            merge_fields(current, partial);
            stamp_update(current, previous.as_ref());
            current.clone()
        };
        debug!(noun = %self.noun, id = %id, "updated");

        hooks.run_after_update(&updated)?;
        Ok(updated)
    }

    // ── Delete ──────────────────────────────────────────────────────

    /// Remove a record. `after_delete` receives the removed record.
    pub fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let existing = self.get_raw(id).ok_or_else(|| self.not_found(id))?;
        let hooks = self.hooks();
        hooks.run_before_delete(id, &existing)?;

        if self.records.write().shift_remove(id).is_none() {
            return Err(self.not_found(id));
        }
        debug!(noun = %self.noun, id = %id, "deleted");

        hooks.run_after_delete(id, &existing)
    }
}

fn default_id_prefix(noun: &str) -> String {
    noun.chars().take(3).collect::<String>().to_lowercase()
}
