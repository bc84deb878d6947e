//! RelationResolver: expands relationship fields on read.
//!
//! Forward relations (`->`, `~>`) hold target ids on the source record and
//! are replaced by the target records. Backward relations (`<-`, `<~`) store
//! nothing; they are computed by scanning every record of the target noun for
//! a forward relation pointing back at the source. There is no reverse index,
//! so each backward relation costs one full scan of its target store per read.
//!
//! Fuzzy operators resolve exactly like their exact counterparts.
//!
//! A missing forward target is left as the raw id on a single relation and
//! dropped from an array relation. Embedded records are not resolved further,
//! so cyclic schemas terminate.

use std::sync::Weak;

use nounbase_core::ServiceError;
use nounbase_schema::{NounSchema, RelationField};
use serde_json::Value;
use tracing::{debug, warn};

use crate::accessor::Accessor;
use crate::hooks::ResolveRelations;
use crate::record::{Record, record_id, references};
use crate::registry::NounRegistry;

/// Resolves relations against the nouns of a registry.
///
/// Holds the registry weakly: the registry owns the accessors, which own
/// their resolver.
#[derive(Clone)]
pub struct RelationResolver {
    registry: Weak<NounRegistry>,
}

impl RelationResolver {
    pub fn new(registry: Weak<NounRegistry>) -> Self {
        Self { registry }
    }
}

impl ResolveRelations for RelationResolver {
    fn resolve(
        &self,
        schema: &NounSchema,
        mut record: Record,
        include: Option<&[String]>,
    ) -> Result<Record, ServiceError> {
        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| ServiceError::Internal("noun registry dropped".into()))?;

        for rel in schema.relations() {
            if let Some(include) = include {
                if !include.iter().any(|name| name == rel.name) {
                    continue;
                }
            }
            let Some(target) = registry.accessor(rel.target) else {
                warn!(
                    noun = schema.noun(),
                    field = rel.name,
                    target = rel.target,
                    "relation target noun is not registered"
                );
                continue;
            };
            debug!(
                noun = schema.noun(),
                field = rel.name,
                target = rel.target,
                fuzzy = rel.op.is_fuzzy(),
                "resolving relation"
            );
            if rel.op.is_forward() {
                resolve_forward(&rel, &target, &mut record);
            } else {
                resolve_backward(schema, &rel, &target, &mut record);
            }
        }
        Ok(record)
    }
}

fn resolve_forward(rel: &RelationField<'_>, target: &Accessor, record: &mut Record) {
    let Some(value) = record.get_mut(rel.name) else {
        return;
    };
    if rel.many {
        let ids: Vec<Value> = match std::mem::take(value) {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            single => vec![single],
        };
        let resolved: Vec<Value> = ids
            .into_iter()
            .filter_map(|item| match item {
                Value::String(id) => match target.get_raw(&id) {
                    Some(found) => Some(Value::Object(found)),
                    None => {
                        debug!(field = rel.name, target = rel.target, id = %id, "dropping dangling id");
                        None
                    }
                },
                other => Some(other),
            })
            .collect();
        *value = Value::Array(resolved);
    } else if let Some(id) = value.as_str().map(str::to_string) {
        match target.get_raw(&id) {
            Some(found) => *value = Value::Object(found),
            None => {
                debug!(field = rel.name, target = rel.target, id = %id, "target missing, keeping id");
            }
        }
    }
}

fn resolve_backward(
    schema: &NounSchema,
    rel: &RelationField<'_>,
    target: &Accessor,
    record: &mut Record,
) {
    let Some(source_id) = record_id(record).map(str::to_string) else {
        return;
    };
    let target_schema = target.schema();
    let back_fields: Vec<&str> = target_schema
        .forward_relations_to(schema.noun())
        .map(|r| r.name)
        .collect();
    if back_fields.is_empty() {
        warn!(
            noun = schema.noun(),
            field = rel.name,
            target = rel.target,
            "no forward relation on target points back at this noun"
        );
    }

    let related: Vec<Value> = target
        .scan()
        .into_iter()
        .filter(|candidate| {
            back_fields
                .iter()
                .any(|field| references(candidate.get(*field), &source_id))
        })
        .map(Value::Object)
        .collect();
    record.insert(rel.name.to_string(), Value::Array(related));
}
