//! Parameter contract and coercion
//!
//! Agents send every value as a string. [`Params`] keeps the raw values keyed
//! by name; [`Params::resolve`] checks them against an operation's
//! [`ParamSpec`] list, fills defaults and rejects values that do not coerce.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use ops_core::{ActionParameter, Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Expected shape of a parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    /// Comma separated or JSON array
    List,
    /// RFC 3339, `YYYY-MM-DDTHH:MM:SS` (UTC) or epoch seconds
    Timestamp,
}

/// One entry of an operation's parameter contract
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
    pub description: &'static str,
}

impl ParamSpec {
    pub const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
            description,
        }
    }

    pub const fn optional(
        name: &'static str,
        kind: ParamKind,
        default: Option<&'static str>,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind,
            required: false,
            default,
            description,
        }
    }
}

/// Raw parameters keyed by name
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: HashMap<String, Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the agent's parameter list. Later duplicates win.
    pub fn from_parameters(parameters: &[ActionParameter]) -> Self {
        let mut params = Self::new();
        for p in parameters {
            params.insert(p.name.clone(), p.value.clone());
        }
        params
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Validate against a contract and fill defaults.
    ///
    /// Blank values count as absent. Parameters not named in `specs` are
    /// carried through untouched.
    pub fn resolve(&self, specs: &[ParamSpec]) -> Result<Resolved> {
        let mut values: HashMap<String, Value> = self
            .values
            .iter()
            .filter(|(_, v)| !is_blank(v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        for spec in specs {
            match values.get(spec.name) {
                Some(value) => check_kind(spec, value)?,
                None if spec.required => return Err(Error::missing(spec.name)),
                None => {
                    if let Some(default) = spec.default {
                        values.insert(spec.name.to_string(), Value::String(default.to_string()));
                    }
                }
            }
        }

        Ok(Resolved { values })
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn check_kind(spec: &ParamSpec, value: &Value) -> Result<()> {
    match spec.kind {
        ParamKind::String => Ok(()),
        ParamKind::Integer => coerce_integer(spec.name, value).map(|_| ()),
        ParamKind::List => coerce_list(spec.name, value).map(|_| ()),
        ParamKind::Timestamp => coerce_timestamp(spec.name, value).map(|_| ()),
    }
}

/// Parameters after validation and default filling
#[derive(Debug, Clone, Default)]
pub struct Resolved {
    values: HashMap<String, Value>,
}

impl Resolved {
    /// Text form of a value, if present
    pub fn text(&self, name: &str) -> Option<String> {
        self.values.get(name).map(value_text)
    }

    pub fn require_text(&self, name: &str) -> Result<String> {
        self.text(name).ok_or_else(|| Error::missing(name))
    }

    pub fn integer(&self, name: &str) -> Result<Option<i64>> {
        self.values
            .get(name)
            .map(|v| coerce_integer(name, v))
            .transpose()
    }

    pub fn require_integer(&self, name: &str) -> Result<i64> {
        self.integer(name)?.ok_or_else(|| Error::missing(name))
    }

    pub fn list(&self, name: &str) -> Result<Option<Vec<String>>> {
        self.values.get(name).map(|v| coerce_list(name, v)).transpose()
    }

    pub fn require_list(&self, name: &str) -> Result<Vec<String>> {
        self.list(name)?.ok_or_else(|| Error::missing(name))
    }

    pub fn require_timestamp(&self, name: &str) -> Result<DateTime<Utc>> {
        let value = self.values.get(name).ok_or_else(|| Error::missing(name))?;
        coerce_timestamp(name, value)
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn coerce_integer(name: &str, value: &Value) -> Result<i64> {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    };

    parsed.ok_or_else(|| Error::invalid(name, format!("expected an integer, got {}", value)))
}

fn coerce_list(name: &str, value: &Value) -> Result<Vec<String>> {
    let items: Vec<String> = match value {
        Value::Array(items) => items.iter().map(value_text).collect(),
        Value::String(s) => split_list(s),
        Value::Number(_) | Value::Bool(_) => vec![value_text(value)],
        _ => {
            return Err(Error::invalid(
                name,
                format!("expected a list, got {}", value),
            ))
        }
    };

    Ok(items
        .into_iter()
        .map(|item| item.trim().trim_matches(|c: char| c == '"' || c == '\'').trim().to_string())
        .filter(|item| !item.is_empty())
        .collect())
}

fn split_list(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.starts_with('[') {
        if let Ok(items) = serde_json::from_str::<Vec<Value>>(raw) {
            return items.iter().map(value_text).collect();
        }
    }
    raw.trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(str::to_string)
        .collect()
}

fn coerce_timestamp(name: &str, value: &Value) -> Result<DateTime<Utc>> {
    let invalid = || Error::invalid(name, format!("expected a timestamp, got {}", value));

    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .ok_or_else(invalid),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Ok(dt.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                return Ok(Utc.from_utc_datetime(&naive));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Ok(Utc.from_utc_datetime(&naive));
            }
            s.parse::<i64>()
                .ok()
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
                .ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}
