//! Environment Configuration Loader
//!
//! Loads environment variables from the canonical location:
//! `/etc/ops-assist/environment`, then builds typed [`Settings`] from the
//! process environment.
//!
//! ## Usage
//!
//! Call `load_environment()` early in main() before reading settings:
//!
//! ```rust,no_run
//! use ops_core::config::{load_environment, Settings};
//!
//! load_environment();
//! let settings = Settings::from_env().unwrap();
//! ```

use config::{Config, Environment};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::logging::LogFormat;
use crate::{Error, Result, StatusPolicy};

/// Default path for the environment file
pub const DEFAULT_ENV_FILE: &str = "/etc/ops-assist/environment";

/// Alternative paths to check (in order of priority)
pub const ENV_FILE_PATHS: &[&str] = &[
    "/etc/ops-assist/environment",
    "/etc/ops-assist.env",
    ".env",
];

/// Region used when `AWS_REGION` is not set
pub const DEFAULT_REGION: &str = "us-gov-west-1";

/// Agent alias used when `AGENT_ALIAS_ID` is not set
pub const DEFAULT_AGENT_ALIAS: &str = "production";

/// Load environment variables from the canonical configuration file.
///
/// This function:
/// 1. Checks `OPS_ENV_FILE` if set
/// 2. Checks `/etc/ops-assist/environment` (system-wide)
/// 3. Falls back to `.env` in current directory (development)
/// 4. Does NOT override existing environment variables
///
/// Returns the path that was loaded, or None if no file was found.
pub fn load_environment() -> Option<String> {
    if let Ok(custom_path) = std::env::var("OPS_ENV_FILE") {
        if let Some(path) = try_load_env_file(&custom_path) {
            return Some(path);
        }
    }

    for path in ENV_FILE_PATHS {
        if let Some(loaded_path) = try_load_env_file(path) {
            return Some(loaded_path);
        }
    }

    debug!("No environment file found, using existing environment");
    None
}

fn try_load_env_file(path: &str) -> Option<String> {
    let path_obj = Path::new(path);

    if !path_obj.exists() {
        return None;
    }

    match fs::read_to_string(path_obj) {
        Ok(content) => {
            let mut loaded_count = 0;
            let mut skipped_count = 0;

            for line in content.lines() {
                let line = line.trim();

                if line.is_empty() || line.starts_with('#') {
                    continue;
                }

                if let Some((key, value)) = parse_env_line(line) {
                    if std::env::var(&key).is_err() {
                        std::env::set_var(&key, &value);
                        loaded_count += 1;
                        debug!(
                            "Loaded: {}={}",
                            key,
                            if is_secret_key(&key) { "***" } else { &value }
                        );
                    } else {
                        skipped_count += 1;
                        debug!("Skipped (already set): {}", key);
                    }
                }
            }

            info!(
                "Loaded {} environment variables from {} ({} skipped - already set)",
                loaded_count, path, skipped_count
            );

            Some(path.to_string())
        }
        Err(e) => {
            warn!("Failed to read environment file {}: {}", path, e);
            None
        }
    }
}

fn is_secret_key(key: &str) -> bool {
    key.contains("KEY") || key.contains("TOKEN") || key.contains("SECRET")
}

/// Parse a single environment line into key-value pair.
fn parse_env_line(line: &str) -> Option<(String, String)> {
    // KEY=VALUE, KEY="VALUE", KEY='VALUE', optionally prefixed with `export`
    let line = line.strip_prefix("export ").unwrap_or(line);
    let mut parts = line.splitn(2, '=');
    let key = parts.next()?.trim();
    let value = parts.next()?.trim();

    if key.is_empty() {
        return None;
    }

    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);

    Some((key.to_string(), value.to_string()))
}

/// Typed process settings.
///
/// Field names are the lowercased environment variable names
/// (`AWS_REGION` → `aws_region`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub aws_region: String,
    #[serde(default)]
    pub cluster_name: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
    pub agent_alias_id: String,
    #[serde(default)]
    pub secret_key: Option<String>,
    pub bind_address: String,
    pub port: u16,
    pub status_policy: StatusPolicy,
    pub log_format: LogFormat,
    pub log_query_initial_delay_ms: u64,
    pub log_query_max_delay_ms: u64,
    pub log_query_timeout_ms: u64,
    #[serde(default)]
    pub static_dir: Option<String>,
}

impl Settings {
    /// Build settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::build(None)
    }

    /// Build settings from an explicit variable map instead of the process
    /// environment
    pub fn from_map(vars: HashMap<String, String>) -> Result<Self> {
        Self::build(Some(vars))
    }

    fn build(source: Option<HashMap<String, String>>) -> Result<Self> {
        let settings: Settings = Config::builder()
            .set_default("aws_region", DEFAULT_REGION)?
            .set_default("agent_alias_id", DEFAULT_AGENT_ALIAS)?
            .set_default("bind_address", "0.0.0.0")?
            .set_default("port", 8080_i64)?
            .set_default("status_policy", "compatible")?
            .set_default("log_format", "pretty")?
            .set_default("log_query_initial_delay_ms", 250_i64)?
            .set_default("log_query_max_delay_ms", 2_000_i64)?
            .set_default("log_query_timeout_ms", 30_000_i64)?
            .add_source(Environment::default().source(source))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.aws_region.trim().is_empty() {
            return Err(Error::config("AWS_REGION cannot be empty"));
        }
        if self.log_query_initial_delay_ms == 0 {
            return Err(Error::config("LOG_QUERY_INITIAL_DELAY_MS must be positive"));
        }
        if self.log_query_max_delay_ms < self.log_query_initial_delay_ms {
            return Err(Error::config(format!(
                "LOG_QUERY_MAX_DELAY_MS ({}) must be >= LOG_QUERY_INITIAL_DELAY_MS ({})",
                self.log_query_max_delay_ms, self.log_query_initial_delay_ms
            )));
        }
        if self.log_query_timeout_ms == 0 {
            return Err(Error::config("LOG_QUERY_TIMEOUT_MS must be positive"));
        }
        Ok(())
    }

    /// Cluster name, required by every cluster-facing entry point
    pub fn require_cluster_name(&self) -> Result<&str> {
        non_empty(self.cluster_name.as_deref()).ok_or_else(|| Error::config("CLUSTER_NAME is not set"))
    }

    /// Agent id, required by every agent-facing entry point
    pub fn require_agent_id(&self) -> Result<&str> {
        non_empty(self.agent_id.as_deref()).ok_or_else(|| Error::config("AGENT_ID is not set"))
    }

    pub fn log_query_initial_delay(&self) -> Duration {
        Duration::from_millis(self.log_query_initial_delay_ms)
    }

    pub fn log_query_max_delay(&self) -> Duration {
        Duration::from_millis(self.log_query_max_delay_ms)
    }

    pub fn log_query_timeout(&self) -> Duration {
        Duration::from_millis(self.log_query_timeout_ms)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_env_line_simple() {
        let (k, v) = parse_env_line("FOO=bar").unwrap();
        assert_eq!(k, "FOO");
        assert_eq!(v, "bar");
    }

    #[test]
    fn test_parse_env_line_quoted() {
        let (k, v) = parse_env_line("FOO=\"bar baz\"").unwrap();
        assert_eq!(k, "FOO");
        assert_eq!(v, "bar baz");
    }

    #[test]
    fn test_parse_env_line_export() {
        let (k, v) = parse_env_line("export CLUSTER_NAME='prod'").unwrap();
        assert_eq!(k, "CLUSTER_NAME");
        assert_eq!(v, "prod");
    }

    #[test]
    fn test_parse_env_line_empty() {
        assert!(parse_env_line("").is_none());
        assert!(parse_env_line("=value").is_none());
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::from_map(HashMap::new()).unwrap();
        assert_eq!(settings.aws_region, DEFAULT_REGION);
        assert_eq!(settings.agent_alias_id, DEFAULT_AGENT_ALIAS);
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.status_policy, StatusPolicy::Compatible);
        assert_eq!(settings.log_format, LogFormat::Pretty);
        assert_eq!(settings.log_query_timeout(), Duration::from_secs(30));
        assert!(settings.require_cluster_name().is_err());
    }

    #[test]
    fn test_settings_from_vars() {
        let settings = Settings::from_map(vars(&[
            ("AWS_REGION", "eu-west-1"),
            ("CLUSTER_NAME", "prod-eks"),
            ("AGENT_ID", "AGENT123"),
            ("AGENT_ALIAS_ID", "TSTALIASID"),
            ("PORT", "9090"),
            ("STATUS_POLICY", "unified"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert_eq!(settings.aws_region, "eu-west-1");
        assert_eq!(settings.require_cluster_name().unwrap(), "prod-eks");
        assert_eq!(settings.require_agent_id().unwrap(), "AGENT123");
        assert_eq!(settings.agent_alias_id, "TSTALIASID");
        assert_eq!(settings.port, 9090);
        assert_eq!(settings.status_policy, StatusPolicy::Unified);
        assert_eq!(settings.log_format, LogFormat::Json);
    }

    #[test]
    fn test_settings_rejects_inverted_backoff() {
        let result = Settings::from_map(vars(&[
            ("LOG_QUERY_INITIAL_DELAY_MS", "5000"),
            ("LOG_QUERY_MAX_DELAY_MS", "100"),
        ]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_blank_agent_id_is_missing() {
        let settings = Settings::from_map(vars(&[("AGENT_ID", "  ")])).unwrap();
        assert!(settings.require_agent_id().is_err());
    }
}
