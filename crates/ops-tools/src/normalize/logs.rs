//! Log group analysis
//!
//! Builds the insights query for a set of error patterns, waits for the
//! query with exponential backoff and flattens the result rows.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use ops_core::{Error, Result, Settings};

use super::{window_start, MAX_REPORTED_ERRORS};
use crate::backend::{LogQuery, LogsApi, QueryResults, QueryStatus, ResultField};

/// Backoff settings for the query readiness wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(2),
            timeout: Duration::from_secs(30),
        }
    }
}

impl From<&Settings> for PollConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            initial_delay: settings.log_query_initial_delay(),
            max_delay: settings.log_query_max_delay(),
            timeout: settings.log_query_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogAnalysis {
    pub log_group: String,
    pub error_count: usize,
    pub errors: Vec<BTreeMap<String, String>>,
}

/// Insights query matching any pattern as a literal substring
pub fn build_query(patterns: &[String]) -> String {
    let filter = patterns
        .iter()
        .map(|p| format!("@message like /{}/", escape_pattern(p)))
        .collect::<Vec<_>>()
        .join(" or ");

    format!(
        "fields @timestamp, @message | filter {} | sort @timestamp desc | limit 100",
        filter
    )
}

fn escape_pattern(pattern: &str) -> String {
    regex::escape(pattern).replace('/', "\\/")
}

/// Run the query over the last `hours` ending at `end` and flatten the rows
pub async fn analyze(
    logs: &dyn LogsApi,
    log_group: &str,
    hours: i64,
    patterns: &[String],
    end: DateTime<Utc>,
    poll: &PollConfig,
) -> Result<LogAnalysis> {
    let query = LogQuery {
        log_group: log_group.to_string(),
        start: window_start(end, hours)?,
        end,
        query: build_query(patterns),
    };

    let query_id = logs.start_query(&query).await?;
    debug!(%query_id, log_group, "Started log query");

    let results = wait_for_results(logs, &query_id, poll).await?;
    Ok(LogAnalysis {
        log_group: log_group.to_string(),
        error_count: results.rows.len(),
        errors: results
            .rows
            .into_iter()
            .take(MAX_REPORTED_ERRORS)
            .map(flatten_row)
            .collect(),
    })
}

fn flatten_row(row: Vec<ResultField>) -> BTreeMap<String, String> {
    row.into_iter().map(|f| (f.field, f.value)).collect()
}

/// Poll until the query completes, fails or the deadline passes
pub async fn wait_for_results(
    logs: &dyn LogsApi,
    query_id: &str,
    poll: &PollConfig,
) -> Result<QueryResults> {
    let deadline = Instant::now() + poll.timeout;
    let mut delay = poll.initial_delay;
    let mut attempts = 0u32;

    loop {
        sleep(delay).await;
        attempts += 1;

        let results = logs.get_query_results(query_id).await?;
        match results.status {
            QueryStatus::Complete => {
                debug!(%query_id, attempts, rows = results.rows.len(), "Log query complete");
                return Ok(results);
            }
            status if status.is_failure() => {
                return Err(Error::upstream(format!(
                    "Log query {} finished with status {}",
                    query_id, status
                )));
            }
            status => debug!(%query_id, %status, attempts, "Log query not ready"),
        }

        let now = Instant::now();
        if now >= deadline {
            warn!(%query_id, attempts, "Log query did not complete in time");
            return Err(Error::timeout(format!(
                "log query {} did not complete within {}ms",
                query_id,
                poll.timeout.as_millis()
            )));
        }
        delay = (delay * 2).min(poll.max_delay).min(deadline - now);
    }
}
