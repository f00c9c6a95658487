//! Backend ports
//!
//! One trait per managed service. Production adapters live in `ops-backends`;
//! [`crate::stub::StubBackends`] implements every port in memory for tests.
//! Kubernetes ports hand back the native `k8s-openapi` objects, the cloud
//! ports return small records mirroring the service payloads.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Event, Node, Pod};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

// ========== Kubernetes ==========

/// Cluster API access (core and apps groups)
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>>;

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod>;

    /// Trailing `tail_lines` lines of the pod's log
    async fn pod_logs(&self, namespace: &str, name: &str, tail_lines: i64) -> Result<String>;

    /// Events whose involved object is the named pod
    async fn list_pod_events(&self, namespace: &str, name: &str) -> Result<Vec<Event>>;

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>>;

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment>;

    async fn list_nodes(&self) -> Result<Vec<Node>>;
}

// ========== Metrics ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    Average,
    Maximum,
    Minimum,
    Sum,
    SampleCount,
}

impl Statistic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Statistic::Average => "Average",
            Statistic::Maximum => "Maximum",
            Statistic::Minimum => "Minimum",
            Statistic::Sum => "Sum",
            Statistic::SampleCount => "SampleCount",
        }
    }
}

/// Parameters of a single statistics request
#[derive(Debug, Clone, PartialEq)]
pub struct MetricQuery {
    pub namespace: String,
    pub metric_name: String,
    /// `(name, value)` pairs
    pub dimensions: Vec<(String, String)>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub period_secs: i32,
    pub statistics: Vec<Statistic>,
}

impl MetricQuery {
    pub fn new(
        namespace: impl Into<String>,
        metric_name: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        period_secs: i32,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            metric_name: metric_name.into(),
            dimensions: Vec::new(),
            start,
            end,
            period_secs,
            statistics: Vec::new(),
        }
    }

    pub fn dimension(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.dimensions.push((name.into(), value.into()));
        self
    }

    pub fn statistic(mut self, statistic: Statistic) -> Self {
        self.statistics.push(statistic);
        self
    }
}

/// One datapoint as returned by the metrics service
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Datapoint {
    pub timestamp: Option<DateTime<Utc>>,
    pub sum: Option<f64>,
    pub average: Option<f64>,
    pub maximum: Option<f64>,
    pub minimum: Option<f64>,
    pub sample_count: Option<f64>,
    pub unit: Option<String>,
}

#[async_trait]
pub trait MetricsApi: Send + Sync {
    async fn get_metric_statistics(&self, query: &MetricQuery) -> Result<Vec<Datapoint>>;
}

// ========== Log queries ==========

#[derive(Debug, Clone, PartialEq)]
pub struct LogQuery {
    pub log_group: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub query: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Scheduled,
    Running,
    Complete,
    Failed,
    Cancelled,
    Timeout,
    Unknown,
}

impl QueryStatus {
    /// Terminal without results
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            QueryStatus::Failed | QueryStatus::Cancelled | QueryStatus::Timeout
        )
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryStatus::Scheduled => "Scheduled",
            QueryStatus::Running => "Running",
            QueryStatus::Complete => "Complete",
            QueryStatus::Failed => "Failed",
            QueryStatus::Cancelled => "Cancelled",
            QueryStatus::Timeout => "Timeout",
            QueryStatus::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultField {
    pub field: String,
    pub value: String,
}

impl ResultField {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResults {
    pub status: QueryStatus,
    pub rows: Vec<Vec<ResultField>>,
}

#[async_trait]
pub trait LogsApi: Send + Sync {
    /// Start an insights query, returning its id
    async fn start_query(&self, query: &LogQuery) -> Result<String>;

    async fn get_query_results(&self, query_id: &str) -> Result<QueryResults>;
}

// ========== Security findings ==========

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Finding {
    pub id: String,
    #[serde(rename = "type")]
    pub finding_type: Option<String>,
    pub severity: Option<f64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub region: Option<String>,
    pub resource_type: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[async_trait]
pub trait FindingsApi: Send + Sync {
    async fn list_detectors(&self) -> Result<Vec<String>>;

    async fn list_findings(&self, detector_id: &str, max_results: i32) -> Result<Vec<String>>;

    async fn get_findings(&self, detector_id: &str, finding_ids: &[String]) -> Result<Vec<Finding>>;
}

// ========== Tracing ==========

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceEdge {
    pub reference_id: Option<i32>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceNode {
    pub reference_id: Option<i32>,
    pub name: Option<String>,
    pub names: Vec<String>,
    #[serde(rename = "type")]
    pub service_type: Option<String>,
    pub state: Option<String>,
    pub root: Option<bool>,
    pub edges: Vec<ServiceEdge>,
}

#[async_trait]
pub trait TraceApi: Send + Sync {
    async fn get_service_graph(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ServiceNode>>;
}

// ========== Object store ==========

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
}

/// One page of a prefix listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectPage {
    pub objects: Vec<ObjectEntry>,
    pub next_continuation_token: Option<String>,
}

#[async_trait]
pub trait ObjectStoreApi: Send + Sync {
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage>;
}

// ========== ETL ==========

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobRunRecord {
    pub job_name: String,
    pub run_id: String,
    pub state: Option<String>,
    pub started_on: Option<DateTime<Utc>>,
    pub completed_on: Option<DateTime<Utc>>,
    pub execution_time: i32,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlerRecord {
    pub name: String,
    pub state: Option<String>,
    pub last_crawl_status: Option<String>,
    pub tables_created: i32,
    pub tables_updated: i32,
}

#[async_trait]
pub trait EtlApi: Send + Sync {
    /// Names of the defined jobs, in service order
    async fn list_jobs(&self) -> Result<Vec<String>>;

    async fn job_runs(&self, job_name: &str, max_results: i32) -> Result<Vec<JobRunRecord>>;

    async fn get_crawler(&self, name: &str) -> Result<CrawlerRecord>;

    async fn list_crawlers(&self) -> Result<Vec<CrawlerRecord>>;
}

// ========== Notifications ==========

#[async_trait]
pub trait NotificationApi: Send + Sync {
    /// Publish to a topic, returning the message id
    async fn publish(&self, topic_arn: &str, subject: &str, message: &str) -> Result<String>;
}

/// Every backend port, shared behind `Arc`s
#[derive(Clone)]
pub struct Backends {
    pub cluster: Arc<dyn ClusterApi>,
    pub metrics: Arc<dyn MetricsApi>,
    pub logs: Arc<dyn LogsApi>,
    pub findings: Arc<dyn FindingsApi>,
    pub traces: Arc<dyn TraceApi>,
    pub objects: Arc<dyn ObjectStoreApi>,
    pub etl: Arc<dyn EtlApi>,
    pub notifications: Arc<dyn NotificationApi>,
}

impl fmt::Debug for Backends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backends").finish_non_exhaustive()
    }
}
