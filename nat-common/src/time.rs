//! Timestamp utilities

use chrono::{DateTime, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp as ISO-8601 with millisecond precision and a `Z` suffix
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// ISO-8601 timestamp with `:` and `.` replaced by `-`, usable in file names
pub fn file_safe_timestamp(at: DateTime<Utc>) -> String {
    iso_timestamp(at).replace([':', '.'], "-")
}
