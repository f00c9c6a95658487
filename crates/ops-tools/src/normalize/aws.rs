//! Cloud service response shapes

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use super::{iso8601, round2};
use crate::backend::{CrawlerRecord, Datapoint, Finding, JobRunRecord, ServiceNode};
use crate::operation::Category;
use crate::registry::CapabilityRegistry;

/// Bytes per gibibyte
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

// ========== Metrics ==========

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricPoint {
    pub timestamp: Option<String>,
    pub average: Option<f64>,
    pub maximum: Option<f64>,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricData {
    pub datapoints: Vec<MetricPoint>,
}

/// Average/Maximum datapoints ordered by timestamp
pub fn metric_data(mut datapoints: Vec<Datapoint>) -> MetricData {
    datapoints.sort_by_key(|d| d.timestamp);
    MetricData {
        datapoints: datapoints
            .into_iter()
            .map(|d| MetricPoint {
                timestamp: iso8601(d.timestamp),
                average: d.average,
                maximum: d.maximum,
                unit: d.unit,
            })
            .collect(),
    }
}

/// Sum of the `Sum` statistic across a window
pub fn total_sum(datapoints: &[Datapoint]) -> f64 {
    datapoints.iter().filter_map(|d| d.sum).sum()
}

/// `Average` of the most recent datapoint
pub fn latest_average(datapoints: &[Datapoint]) -> Option<f64> {
    datapoints
        .iter()
        .filter(|d| d.average.is_some())
        .max_by_key(|d| d.timestamp)
        .and_then(|d| d.average)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamMetrics {
    pub stream_name: String,
    pub time_range_hours: i64,
    pub records_sent: f64,
    pub bytes_sent: f64,
    pub put_success: f64,
    pub get_success: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterHealth {
    pub cluster_name: String,
    pub node_count: f64,
    pub failed_nodes: f64,
    pub healthy: bool,
}

impl ClusterHealth {
    pub fn new(cluster_name: impl Into<String>, node_count: f64, failed_nodes: f64) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            node_count,
            failed_nodes,
            healthy: failed_nodes == 0.0,
        }
    }
}

// ========== Security findings ==========

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FindingIds {
    pub finding_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Findings {
    pub findings: Vec<Finding>,
}

// ========== Tracing ==========

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceGraph {
    pub services: Vec<ServiceNode>,
}

// ========== Object store ==========

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectCount {
    pub bucket: String,
    pub prefix: String,
    pub object_count: u64,
    pub total_size_bytes: u64,
    pub total_size_gb: f64,
}

impl ObjectCount {
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>, count: u64, bytes: u64) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: prefix.into(),
            object_count: count,
            total_size_bytes: bytes,
            total_size_gb: round2(bytes as f64 / GIB),
        }
    }
}

// ========== ETL ==========

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRun {
    pub job_name: String,
    pub run_id: String,
    pub state: Option<String>,
    pub started: Option<String>,
    pub completed: Option<String>,
    pub execution_time: i32,
    pub error_message: Option<String>,
}

impl From<JobRunRecord> for JobRun {
    fn from(r: JobRunRecord) -> Self {
        Self {
            job_name: r.job_name,
            run_id: r.run_id,
            state: r.state,
            started: iso8601(r.started_on),
            completed: iso8601(r.completed_on),
            execution_time: r.execution_time,
            error_message: r.error_message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlerStatus {
    pub name: String,
    pub state: Option<String>,
    pub last_crawl: Option<String>,
    pub tables_created: i32,
    pub tables_updated: i32,
}

impl From<CrawlerRecord> for CrawlerStatus {
    fn from(c: CrawlerRecord) -> Self {
        Self {
            name: c.name,
            state: c.state,
            last_crawl: c.last_crawl_status,
            tables_created: c.tables_created,
            tables_updated: c.tables_updated,
        }
    }
}

// ========== Notifications ==========

/// Structured alert body published to the topic
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertMessage {
    pub timestamp: String,
    pub severity: String,
    pub cluster: String,
    pub subject: String,
    pub message: String,
}

impl AlertMessage {
    pub fn new(
        now: DateTime<Utc>,
        severity: impl Into<String>,
        cluster: impl Into<String>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: now.to_rfc3339_opts(SecondsFormat::Micros, true),
            severity: severity.into(),
            cluster: cluster.into(),
            subject: subject.into(),
            message: message.into(),
        }
    }

    /// `[SEVERITY] subject`
    pub fn subject_line(&self) -> String {
        format!("[{}] {}", self.severity, self.subject)
    }

    /// Pretty-printed JSON body
    pub fn body(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentAlert {
    pub status: &'static str,
    pub topic: String,
    pub message_id: String,
}

impl SentAlert {
    pub fn new(topic: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            status: "sent",
            topic: topic.into(),
            message_id: message_id.into(),
        }
    }
}

// ========== Tool listing ==========

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInfo {
    pub name: &'static str,
    pub api_path: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ToolCatalog {
    pub kubernetes: Vec<ToolInfo>,
    pub data_pipeline: Vec<ToolInfo>,
    pub monitoring: Vec<ToolInfo>,
    pub security: Vec<ToolInfo>,
}

/// Catalog grouped by category
pub fn tool_catalog(registry: &CapabilityRegistry) -> ToolCatalog {
    let mut catalog = ToolCatalog::default();
    for entry in registry.list() {
        let info = ToolInfo {
            name: entry.name,
            api_path: entry.api_path,
            description: entry.description,
        };
        match entry.category {
            Category::Kubernetes => catalog.kubernetes.push(info),
            Category::DataPipeline => catalog.data_pipeline.push(info),
            Category::Monitoring => catalog.monitoring.push(info),
            Category::Security => catalog.security.push(info),
        }
    }
    catalog
}
