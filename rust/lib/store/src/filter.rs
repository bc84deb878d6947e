//! Exact-match filters for `Accessor::find`.

use nounbase_core::parse_instant;
use nounbase_schema::NounSchema;
use serde_json::{Map, Value};

use crate::record::{CREATED_AT, Record, UPDATED_AT};

/// True when every key/value of `filter` matches the record.
///
/// Date and datetime fields (and the timestamps) compare by instant; an
/// absent field matches `null`.
pub fn matches_filter(schema: &NounSchema, record: &Record, filter: &Map<String, Value>) -> bool {
    filter.iter().all(|(key, expected)| {
        let temporal = key == CREATED_AT
            || key == UPDATED_AT
            || schema.field(key).is_some_and(|def| def.is_temporal());
        let actual = record.get(key).unwrap_or(&Value::Null);
        values_equal(actual, expected, temporal)
    })
}

fn values_equal(actual: &Value, expected: &Value, temporal: bool) -> bool {
    match (actual, expected) {
        (Value::String(a), Value::String(b)) if temporal => {
            match (parse_instant(a), parse_instant(b)) {
                (Some(a), Some(b)) => a == b,
                _ => a == b,
            }
        }
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => actual == expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> NounSchema {
        NounSchema::parse(
            "Event",
            json!({"title": "string", "at": "datetime", "seats": "number"})
                .as_object()
                .unwrap(),
        )
        .unwrap()
    }

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(matches_filter(&schema(), &obj(json!({"title": "x"})), &Map::new()));
    }

    #[test]
    fn datetime_compared_by_instant() {
        let rec = obj(json!({"at": "2026-05-01T10:00:00Z"}));
        assert!(matches_filter(&schema(), &rec, &obj(json!({"at": "2026-05-01T12:00:00+02:00"}))));
        assert!(!matches_filter(&schema(), &rec, &obj(json!({"at": "2026-05-01T10:00:01Z"}))));
    }

    #[test]
    fn plain_strings_compared_literally() {
        let rec = obj(json!({"title": "2026-05-01T10:00:00Z"}));
        assert!(!matches_filter(&schema(), &rec, &obj(json!({"title": "2026-05-01T12:00:00+02:00"}))));
    }

    #[test]
    fn numbers_compare_by_value() {
        let rec = obj(json!({"seats": 10}));
        assert!(matches_filter(&schema(), &rec, &obj(json!({"seats": 10.0}))));
    }

    #[test]
    fn absent_field_matches_null_only() {
        let rec = obj(json!({"title": "x"}));
        assert!(matches_filter(&schema(), &rec, &obj(json!({"seats": null}))));
        assert!(!matches_filter(&schema(), &rec, &obj(json!({"seats": 0}))));
    }
}
