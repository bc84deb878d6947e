use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Pagination for list operations.
///
/// `limit: None` returns everything after `offset`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOptions {
    /// Maximum number of results to return.
    #[serde(default)]
    pub limit: Option<usize>,

    /// Number of records to skip.
    #[serde(default)]
    pub offset: usize,
}

impl ListOptions {
    pub fn new(limit: Option<usize>, offset: usize) -> Self {
        Self { limit, offset }
    }
}

/// Generate a new random id: `{prefix}_{uuid-v4 without dashes}`.
///
/// An empty prefix yields the bare 32-character hex id.
pub fn new_id(prefix: &str) -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    if prefix.is_empty() {
        raw
    } else {
        format!("{}_{}", prefix, raw)
    }
}

/// Current time as an RFC 3339 string with millisecond precision.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a date or datetime string into an instant.
///
/// Accepts full RFC 3339 timestamps and bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id_prefixed() {
        let id = new_id("cus");
        assert!(id.starts_with("cus_"));
        assert_eq!(id.len(), 4 + 32);
        assert!(!id.contains('-'));
    }

    #[test]
    fn test_new_id_bare() {
        let id = new_id("");
        assert_eq!(id.len(), 32);
    }

    #[test]
    fn test_now_rfc3339() {
        let ts = now_rfc3339();
        assert!(ts.contains('T'));
        assert!(ts.ends_with('Z'));
        assert!(parse_instant(&ts).is_some());
    }

    #[test]
    fn test_parse_instant_same_moment_different_offsets() {
        let a = parse_instant("2026-03-01T12:00:00Z").unwrap();
        let b = parse_instant("2026-03-01T14:00:00+02:00").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_instant_bare_date() {
        let a = parse_instant("2026-03-01").unwrap();
        let b = parse_instant("2026-03-01T00:00:00Z").unwrap();
        assert_eq!(a, b);
        assert!(parse_instant("yesterday").is_none());
    }
}
