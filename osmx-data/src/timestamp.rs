//! OSM timestamps: `YYYY-MM-DDTHH:MM:SSZ` in UTC, stored as epoch seconds.

use chrono::{DateTime, NaiveDateTime, Utc};

const FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Parse an OSM timestamp. Offsets other than `Z` are accepted as RFC 3339.
pub(crate) fn parse(text: &str) -> Option<i64> {
    NaiveDateTime::parse_from_str(text, FORMAT)
        .map(|naive| naive.and_utc().timestamp())
        .or_else(|_| DateTime::parse_from_rfc3339(text).map(|dt| dt.timestamp()))
        .ok()
}

/// Format epoch seconds; `None` when out of chrono's range.
pub(crate) fn format(seconds: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(seconds, 0).map(|dt| dt.format(FORMAT).to_string())
}
