use nounbase_core::ServiceError;
use serde_json::{Map, Value};

/// A stored record: a JSON object with `id`, `createdAt`, `updatedAt`
/// and the noun's declared fields.
pub type Record = Map<String, Value>;

pub const ID: &str = "id";
pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

/// Unwrap a JSON value into a record, rejecting anything but an object.
pub fn into_record(value: Value) -> Result<Record, ServiceError> {
    match value {
        Value::Object(obj) => Ok(obj),
        other => Err(ServiceError::Validation(format!(
            "record must be a JSON object, got {}",
            type_name(&other)
        ))),
    }
}

/// The record's id, if it has a string one.
pub fn record_id(record: &Record) -> Option<&str> {
    record.get(ID).and_then(Value::as_str)
}

/// Whether a relation value references `id`, either directly or as an
/// element of an array of ids.
pub fn references(value: Option<&Value>, id: &str) -> bool {
    match value {
        Some(Value::String(s)) => s == id,
        Some(Value::Array(items)) => items.iter().any(|v| v.as_str() == Some(id)),
        _ => false,
    }
}

/// Overwrite `target`'s top-level fields with those of `partial`. A `null`
/// value removes the field; nested objects are replaced, not merged.
pub fn merge_fields(target: &mut Record, partial: Record) {
    for (key, value) in partial {
        if value.is_null() {
            target.remove(&key);
        } else {
            target.insert(key, value);
        }
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn into_record_requires_object() {
        assert!(into_record(json!({"a": 1})).is_ok());
        let err = into_record(json!([1, 2])).unwrap_err();
        assert_eq!(err.to_string(), "record must be a JSON object, got array");
    }

    #[test]
    fn merge_fields_is_shallow() {
        let mut target = into_record(json!({"a": 1, "b": 2, "c": {"d": 3}})).unwrap();
        let partial = into_record(json!({"b": null, "c": {"e": 4}, "f": 5})).unwrap();
        merge_fields(&mut target, partial);
        assert_eq!(Value::Object(target), json!({"a": 1, "c": {"e": 4}, "f": 5}));
    }

    #[test]
    fn references_single_and_array() {
        assert!(references(Some(&json!("org_1")), "org_1"));
        assert!(references(Some(&json!(["org_2", "org_1"])), "org_1"));
        assert!(!references(Some(&json!("org_2")), "org_1"));
        assert!(!references(None, "org_1"));
        assert!(!references(Some(&json!({"id": "org_1"})), "org_1"));
    }
}
