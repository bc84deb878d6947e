//! Lifecycle hooks.
//!
//! Each lifecycle event has an ordered list of functions. `before_*` hooks
//! run before the store is touched; the first error aborts the operation and
//! nothing is written. `after_*` hooks run once the mutation is visible.

use std::sync::{Arc, Weak};

use nounbase_core::{ServiceError, parse_instant};
use nounbase_schema::{FieldDef, FieldKind, NounSchema, Primitive};
use serde_json::Value;

use crate::record::{Record, record_id, references, type_name};
use crate::registry::NounRegistry;

pub type BeforeCreate = Arc<dyn Fn(Record) -> Result<Record, ServiceError> + Send + Sync>;
pub type AfterCreate = Arc<dyn Fn(&Record) -> Result<(), ServiceError> + Send + Sync>;
pub type BeforeUpdate =
    Arc<dyn Fn(&str, Record, &Record) -> Result<Record, ServiceError> + Send + Sync>;
pub type AfterUpdate = Arc<dyn Fn(&Record) -> Result<(), ServiceError> + Send + Sync>;
pub type BeforeDelete = Arc<dyn Fn(&str, &Record) -> Result<(), ServiceError> + Send + Sync>;
pub type AfterDelete = Arc<dyn Fn(&str, &Record) -> Result<(), ServiceError> + Send + Sync>;

/// Expands relationship fields of a record read through `Accessor::get`.
///
/// `include: None` means every relation field in the schema.
pub trait ResolveRelations: Send + Sync {
    fn resolve(
        &self,
        schema: &NounSchema,
        record: Record,
        include: Option<&[String]>,
    ) -> Result<Record, ServiceError>;
}

impl<F> ResolveRelations for F
where
    F: Fn(&NounSchema, Record, Option<&[String]>) -> Result<Record, ServiceError> + Send + Sync,
{
    fn resolve(
        &self,
        schema: &NounSchema,
        record: Record,
        include: Option<&[String]>,
    ) -> Result<Record, ServiceError> {
        self(schema, record, include)
    }
}

/// Ordered hook lists, one per lifecycle event.
#[derive(Clone, Default)]
pub struct Hooks {
    pub before_create: Vec<BeforeCreate>,
    pub after_create: Vec<AfterCreate>,
    pub before_update: Vec<BeforeUpdate>,
    pub after_update: Vec<AfterUpdate>,
    pub before_delete: Vec<BeforeDelete>,
    pub after_delete: Vec<AfterDelete>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before_create<F>(mut self, f: F) -> Self
    where
        F: Fn(Record) -> Result<Record, ServiceError> + Send + Sync + 'static,
    {
        self.before_create.push(Arc::new(f));
        self
    }

    pub fn after_create<F>(mut self, f: F) -> Self
    where
        F: Fn(&Record) -> Result<(), ServiceError> + Send + Sync + 'static,
    {
        self.after_create.push(Arc::new(f));
        self
    }

    pub fn before_update<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Record, &Record) -> Result<Record, ServiceError> + Send + Sync + 'static,
    {
        self.before_update.push(Arc::new(f));
        self
    }

    pub fn after_update<F>(mut self, f: F) -> Self
    where
        F: Fn(&Record) -> Result<(), ServiceError> + Send + Sync + 'static,
    {
        self.after_update.push(Arc::new(f));
        self
    }

    pub fn before_delete<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &Record) -> Result<(), ServiceError> + Send + Sync + 'static,
    {
        self.before_delete.push(Arc::new(f));
        self
    }

    pub fn after_delete<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &Record) -> Result<(), ServiceError> + Send + Sync + 'static,
    {
        self.after_delete.push(Arc::new(f));
        self
    }

    /// Append every hook of `other` after the hooks already registered.
    pub fn extend(&mut self, other: Hooks) {
        self.before_create.extend(other.before_create);
        self.after_create.extend(other.after_create);
        self.before_update.extend(other.before_update);
        self.after_update.extend(other.after_update);
        self.before_delete.extend(other.before_delete);
        self.after_delete.extend(other.after_delete);
    }

    pub fn is_empty(&self) -> bool {
        self.before_create.is_empty()
            && self.after_create.is_empty()
            && self.before_update.is_empty()
            && self.after_update.is_empty()
            && self.before_delete.is_empty()
            && self.after_delete.is_empty()
    }

    pub(crate) fn run_before_create(&self, mut data: Record) -> Result<Record, ServiceError> {
        for hook in &self.before_create {
            data = hook(data)?;
        }
        Ok(data)
    }

    pub(crate) fn run_after_create(&self, record: &Record) -> Result<(), ServiceError> {
        self.after_create.iter().try_for_each(|hook| hook(record))
    }

    pub(crate) fn run_before_update(
        &self,
        id: &str,
        mut partial: Record,
        existing: &Record,
    ) -> Result<Record, ServiceError> {
        for hook in &self.before_update {
            partial = hook(id, partial, existing)?;
        }
        Ok(partial)
    }

    pub(crate) fn run_after_update(&self, record: &Record) -> Result<(), ServiceError> {
        self.after_update.iter().try_for_each(|hook| hook(record))
    }

    pub(crate) fn run_before_delete(&self, id: &str, existing: &Record) -> Result<(), ServiceError> {
        self.before_delete.iter().try_for_each(|hook| hook(id, existing))
    }

    pub(crate) fn run_after_delete(&self, id: &str, existing: &Record) -> Result<(), ServiceError> {
        self.after_delete.iter().try_for_each(|hook| hook(id, existing))
    }
}

// ── Built-in hooks ──────────────────────────────────────────────────

/// `before_create`/`before_update` hooks that check records against `schema`.
///
/// Rejects wrong primitive types, enum values outside the union, missing
/// required fields on create, non-id relation values, and writes to backward
/// relations. Fields not declared in the schema pass through untouched.
pub fn schema_validation(schema: Arc<NounSchema>) -> Hooks {
    let on_create = Arc::clone(&schema);
    Hooks::new()
        .before_create(move |data| {
            validate_record(&on_create, &data, false)?;
            Ok(data)
        })
        .before_update(move |_id, partial, _existing| {
            validate_record(&schema, &partial, true)?;
            Ok(partial)
        })
}

/// An `after_delete` hook that deletes every `dependent` record whose
/// forward relation `field` points at the deleted id.
pub fn cascade_delete(registry: Weak<NounRegistry>, dependent: &str, field: &str) -> Hooks {
    let dependent = dependent.to_string();
    let field = field.to_string();
    Hooks::new().after_delete(move |id, _existing| {
        let registry = registry
            .upgrade()
            .ok_or_else(|| ServiceError::Internal("noun registry dropped".into()))?;
        let accessor = registry.get(&dependent)?;
        let doomed: Vec<String> = accessor
            .scan()
            .into_iter()
            .filter(|r| references(r.get(&field), id))
            .filter_map(|r| record_id(&r).map(str::to_string))
            .collect();
        for dep_id in doomed {
            match accessor.delete(&dep_id) {
                Ok(()) | Err(ServiceError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    })
}

fn validate_record(schema: &NounSchema, record: &Record, partial: bool) -> Result<(), ServiceError> {
    for (name, def) in schema.fields() {
        match record.get(name) {
            None if partial => {}
            None | Some(Value::Null) => {
                if !def.optional && !def.is_relation() {
                    return Err(ServiceError::Validation(format!(
                        "{}.{} is required",
                        schema.noun(),
                        name
                    )));
                }
            }
            Some(value) => validate_value(schema, name, def, value)?,
        }
    }
    Ok(())
}

fn validate_value(
    schema: &NounSchema,
    name: &str,
    def: &FieldDef,
    value: &Value,
) -> Result<(), ServiceError> {
    if let Some((op, _)) = def.as_relation() {
        if op.is_backward() {
            return Err(ServiceError::Validation(format!(
                "{}.{} is a backward relation and cannot be written",
                schema.noun(),
                name
            )));
        }
    }
    if def.many {
        let items = value.as_array().ok_or_else(|| {
            ServiceError::Validation(format!(
                "{}.{} must be an array, got {}",
                schema.noun(),
                name,
                type_name(value)
            ))
        })?;
        return items
            .iter()
            .try_for_each(|item| validate_scalar(schema, name, &def.kind, item));
    }
    validate_scalar(schema, name, &def.kind, value)
}

fn validate_scalar(
    schema: &NounSchema,
    name: &str,
    kind: &FieldKind,
    value: &Value,
) -> Result<(), ServiceError> {
    let ok = match kind {
        FieldKind::Primitive(Primitive::String) => value.is_string(),
        FieldKind::Primitive(Primitive::Number) => value.is_number(),
        FieldKind::Primitive(Primitive::Boolean) => value.is_boolean(),
        FieldKind::Primitive(Primitive::Date | Primitive::DateTime) => {
            value.as_str().and_then(parse_instant).is_some()
        }
        FieldKind::Enum(variants) => value
            .as_str()
            .is_some_and(|s| variants.iter().any(|v| v == s)),
        FieldKind::Relation { .. } => value.is_string(),
    };
    if ok {
        return Ok(());
    }
    let expected = match kind {
        FieldKind::Primitive(p) => p.as_str().to_string(),
        FieldKind::Enum(variants) => format!("one of {}", variants.join(" | ")),
        FieldKind::Relation { target, .. } => format!("a {} id", target),
    };
    Err(ServiceError::Validation(format!(
        "{}.{} must be {}, got {}",
        schema.noun(),
        name,
        expected,
        value
    )))
}
