//! Repository layer — entity-scoped database operations.
//!
//! Free functions over a borrowed `Connection`. Serialization of writes
//! is the caller's concern; see [`crate::db::RecordStore`].

mod diagnosis;
mod patient;

use chrono::{Duration, NaiveDateTime, Timelike, Utc};

use super::DatabaseError;

pub use diagnosis::*;
pub use patient::*;

/// Storage format for `created_at` / `analysis_date`. Microsecond
/// precision, lexicographically ordered.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

pub(crate) fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp. Accepts rows written with the schema
/// default (millisecond precision) as well as store-assigned ones.
pub(crate) fn parse_timestamp(s: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|e| DatabaseError::CorruptRow(format!("bad timestamp {s:?}: {e}")))
}

/// Current UTC time, bumped past `latest` so timestamps within one
/// table are strictly increasing.
pub(crate) fn next_timestamp(latest: Option<&str>) -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    let now = now
        .with_nanosecond(now.nanosecond() / 1_000 * 1_000)
        .unwrap_or(now);

    match latest.and_then(|s| parse_timestamp(s).ok()) {
        Some(prev) if prev >= now => prev + Duration::microseconds(1),
        _ => now,
    }
}

/// Blank strings are stored as NULL.
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
