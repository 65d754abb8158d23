//! Lenient deserializers for service payloads
//!
//! The backend is loose with types: progress arrives as 0-100 integers or
//! 0-1 fractions, status strings carry free-form phase text while a task is
//! mid-run, and timestamps come as naive ISO strings without an offset.
//! These helpers absorb that drift so one malformed field never rejects a
//! whole payload.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

use super::model::TaskStatus;

/// Scale percent-style values into [0, 1] and clamp the result.
pub(crate) fn normalize_progress(raw: f64) -> f64 {
    let fraction = if raw > 1.0 { raw / 100.0 } else { raw };
    fraction.clamp(0.0, 1.0)
}

pub(crate) fn progress<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    Ok(normalize_progress(raw))
}

pub(crate) fn opt_progress<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(raw.map(normalize_progress))
}

/// Unrecognized status text is produced while a task executes, so a task
/// carrying one is treated as running.
pub(crate) fn status<'de, D>(deserializer: D) -> Result<TaskStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(TaskStatus::parse_lenient(&raw).unwrap_or(TaskStatus::Running))
}

/// In update payloads an unrecognized status is dropped instead, leaving
/// the stored status untouched while the rest of the update applies.
pub(crate) fn opt_status<'de, D>(deserializer: D) -> Result<Option<TaskStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(TaskStatus::parse_lenient))
}

pub(crate) fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    // Naive timestamps (no offset) are what the service actually emits
    raw.parse::<NaiveDateTime>()
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

pub(crate) fn datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(parse_datetime(&raw).unwrap_or_else(Utc::now))
}

pub(crate) fn opt_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_datetime))
}
