//! Response normalization
//!
//! Pure reshaping of backend responses into the flat structures handed back
//! to the agent. Nothing here talks to a backend except the log query wait
//! in [`logs`].

pub mod aws;
pub mod kubernetes;
pub mod logs;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::Serialize;
use serde_json::Value;

use ops_core::{Error, Result};

/// Maximum number of matching lines or rows returned by the log scans
pub const MAX_REPORTED_ERRORS: usize = 50;

/// Serialize a normalized result for the envelope body
pub fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

/// ISO-8601 text for an optional timestamp
pub fn iso8601(ts: Option<DateTime<Utc>>) -> Option<String> {
    ts.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Start of the window covering the last `hours` before `end`
pub fn window_start(end: DateTime<Utc>, hours: i64) -> Result<DateTime<Utc>> {
    TimeDelta::try_hours(hours)
        .and_then(|span| end.checked_sub_signed(span))
        .ok_or_else(|| Error::invalid("hours", format!("out of range: {}", hours)))
}

/// Round half away from zero to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
