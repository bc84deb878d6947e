//! In-memory text search over record string values.
//!
//! `matches` is a plain case-insensitive substring test. `rank` scores each
//! record by the number of distinct query words it contains, plus a boost
//! when a multi-word query appears verbatim within a single value.

use serde::Serialize;
use serde_json::Value;

use crate::record::Record;

/// Added to the score when a multi-word query appears as a phrase.
pub const PHRASE_BOOST: f64 = 2.0;

/// A search hit with its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecord {
    #[serde(flatten)]
    pub record: Record,
    pub score: f64,
}

/// Case-insensitive substring match against any string value of the record.
///
/// System fields (`id`, timestamps) are searched like any other string. A
/// blank query matches nothing.
pub fn matches(record: &Record, query: &str) -> bool {
    let needle = normalize(query);
    if needle.is_empty() {
        return false;
    }
    string_values(record)
        .iter()
        .any(|v| v.to_lowercase().contains(&needle))
}

/// Score and sort records, best first. Records scoring zero are dropped.
/// Ties keep insertion order.
pub fn rank(records: Vec<Record>, query: &str) -> Vec<ScoredRecord> {
    let phrase = normalize(query);
    let mut words: Vec<&str> = Vec::new();
    for w in phrase.split(' ') {
        if !w.is_empty() && !words.contains(&w) {
            words.push(w);
        }
    }
    if words.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<ScoredRecord> = records
        .into_iter()
        .filter_map(|record| {
            let values: Vec<String> = string_values(&record)
                .into_iter()
                .map(str::to_lowercase)
                .collect();
            let found = words
                .iter()
                .filter(|w| values.iter().any(|v| v.contains(*w)))
                .count();
            if found == 0 {
                return None;
            }
            let mut score = found as f64;
            if words.len() > 1 && values.iter().any(|v| v.contains(&phrase)) {
                score += PHRASE_BOOST;
            }
            Some(ScoredRecord { record, score })
        })
        .collect();

    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits
}

/// Lowercase and collapse runs of whitespace.
fn normalize(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn string_values(record: &Record) -> Vec<&str> {
    let mut out = Vec::new();
    for value in record.values() {
        collect_strings(value, &mut out);
    }
    out
}

fn collect_strings<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(obj) => obj.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(v: Value) -> Record {
        v.as_object().unwrap().clone()
    }

    fn articles() -> Vec<Record> {
        vec![
            rec(json!({"id": "a1", "title": "Rust ownership", "body": "borrow checker basics"})),
            rec(json!({"id": "a2", "title": "Async Rust", "body": "the borrow checker and futures"})),
            rec(json!({"id": "a3", "title": "Gardening", "tags": ["tomatoes", "Borrow"]})),
            rec(json!({"id": "a4", "title": "Cooking", "servings": 4})),
        ]
    }

    #[test]
    fn substring_match_is_case_insensitive() {
        let hits: Vec<_> = articles().into_iter().filter(|r| matches(r, "RUST")).collect();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn arrays_are_searched() {
        assert!(matches(&articles()[2], "tomato"));
    }

    #[test]
    fn system_fields_are_searched() {
        let r = rec(json!({"id": "cus_7f3a", "createdAt": "2026-10-19T08:00:00.000Z", "title": "x"}));
        assert!(matches(&r, "CUS_7F"));
        assert!(matches(&r, "2026-10-19"));
        assert_eq!(rank(vec![r], "7f3a").len(), 1);
    }

    #[test]
    fn blank_query_matches_nothing() {
        let r = rec(json!({"id": "a", "title": "x"}));
        assert!(!matches(&r, "   "));
        assert!(rank(vec![r], " ").is_empty());
    }

    #[test]
    fn rank_by_distinct_words() {
        let hits = rank(articles(), "rust borrow rust");
        let ids: Vec<&str> = hits.iter().map(|h| h.record["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["a1", "a2", "a3"]);
        assert_eq!(hits[0].score, 2.0);
        assert_eq!(hits[2].score, 1.0);
    }

    #[test]
    fn phrase_boost_lifts_exact_phrase() {
        let hits = rank(articles(), "Borrow  Checker");
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].score, 2.0 + PHRASE_BOOST);
        assert_eq!(hits[1].score, 2.0 + PHRASE_BOOST);
        assert_eq!(hits[2].record["id"], "a3");
        assert_eq!(hits[2].score, 1.0);
    }

    #[test]
    fn phrase_split_across_fields_gets_no_boost() {
        let split = rec(json!({"id": "s", "first": "ada", "last": "lovelace"}));
        let whole = rec(json!({"id": "w", "name": "Ada Lovelace"}));
        let hits = rank(vec![split, whole], "ada lovelace");
        assert_eq!(hits[0].record["id"], "w");
        assert_eq!(hits[0].score, 2.0 + PHRASE_BOOST);
        assert_eq!(hits[1].record["id"], "s");
        assert_eq!(hits[1].score, 2.0);
    }

    #[test]
    fn scored_record_serializes_flat() {
        let hit = ScoredRecord { record: rec(json!({"id": "a"})), score: 1.5 };
        assert_eq!(serde_json::to_value(&hit).unwrap(), json!({"id": "a", "score": 1.5}));
    }
}
