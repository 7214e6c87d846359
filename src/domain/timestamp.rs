//! Serde adapter writing timestamps as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
//!
//! Use with `#[serde(with = "crate::domain::timestamp")]`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

use crate::normalize::coerce::format_timestamp;

/// Serializes a timestamp with millisecond precision in UTC.
///
/// # Errors
///
/// Propagates serializer errors.
pub fn serialize<S: Serializer>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(timestamp))
}

/// Deserializes any RFC 3339 timestamp into UTC.
///
/// # Errors
///
/// Fails when the input is not a string or not valid RFC 3339.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(serde::de::Error::custom)
}
