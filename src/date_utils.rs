// tutor-calendar/src/date_utils.rs
//! Lenient ISO-8601 timestamp parsing for lesson times.
//!
//! Clients send lesson times in several shapes (`2025-12-07T17:30:00`,
//! `2025-12-07T17:30:00.782Z`, `2025-12-07T17:30:00+03:00`). Lessons are stored
//! as wall-clock timestamps, so any zone information is dropped rather than
//! converted.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer};

const LOCAL_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid date format: {0}")]
pub struct DateParseError(pub String);

/// Parses an ISO timestamp and returns its wall-clock part.
///
/// Returns `Ok(None)` for an empty (or whitespace-only) string.
pub fn parse_local_datetime(input: &str) -> Result<Option<NaiveDateTime>, DateParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(Some(with_offset.naive_local()));
    }

    // Offsets without seconds ("2025-12-07T17:30+03:00") are not RFC 3339.
    if let Ok(with_offset) = DateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M%:z") {
        return Ok(Some(with_offset.naive_local()));
    }

    LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(Some)
        .ok_or_else(|| DateParseError(input.to_string()))
}

/// Formats a wall-clock timestamp without any zone suffix.
pub fn format_local_datetime(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%dT%H:%M:%S").to_string()
}

pub fn deserialize_local_datetime<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match parse_local_datetime(&raw) {
        Ok(Some(dt)) => Ok(dt),
        Ok(None) => Err(serde::de::Error::custom("timestamp must not be empty")),
        Err(e) => Err(serde::de::Error::custom(e)),
    }
}

// JSON null, a missing field and "" all mean "no value".
pub fn deserialize_opt_local_datetime<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_local_datetime(&raw).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}
