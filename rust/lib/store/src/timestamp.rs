//! Centralized timestamp management for accessor mutations.
//!
//! `stamp_create` and `stamp_update` own `createdAt`/`updatedAt`; callers
//! never set them directly.

use nounbase_core::{now_rfc3339, parse_instant};
use serde_json::Value;

use crate::record::{CREATED_AT, Record, UPDATED_AT};

/// Stamp `createdAt` and `updatedAt` with the same instant.
pub(crate) fn stamp_create(record: &mut Record) {
    let now = now_rfc3339();
    record.insert(CREATED_AT.into(), Value::String(now.clone()));
    record.insert(UPDATED_AT.into(), Value::String(now));
}

/// Stamp a fresh `updatedAt`, never moving it backwards from `previous`.
pub(crate) fn stamp_update(record: &mut Record, previous: Option<&Value>) {
    let now = now_rfc3339();
    let stamp = match previous.and_then(Value::as_str) {
        Some(prev) => match (parse_instant(prev), parse_instant(&now)) {
            (Some(p), Some(n)) if p > n => prev.to_string(),
            _ => now,
        },
        None => now,
    };
    record.insert(UPDATED_AT.into(), Value::String(stamp));
}
