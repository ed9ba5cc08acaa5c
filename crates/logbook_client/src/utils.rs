//! Utility functions for date normalization and other common operations.

use chrono::NaiveDate;

/// Parse a record's `date` field down to a calendar date, dropping any time.
///
/// Accepts:
/// - `YYYY-MM-DD HH:MM:SS` (the logbook's own format)
/// - `YYYY-MM-DD`
/// - naive ISO datetime `YYYY-MM-DDTHH:MM:SS`
/// - RFC3339 datetime (the local date as written is kept)
pub fn parse_record_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(ndt.date());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(ndt.date());
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    None
}

/// Truncate a response body for inclusion in an error message.
pub fn body_snippet(body: &str) -> String {
    body.chars().take(256).collect()
}
