//! In-memory backends
//!
//! [`StubBackends`] implements every port over fixture data. Used by the
//! router tests, the web tests and `ops dispatch --stub`.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, DeploymentStatus};
use k8s_openapi::api::core::v1::{
    ContainerStatus, Event, Node, NodeCondition, NodeStatus, ObjectReference, Pod, PodStatus,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::backend::*;

/// A message captured by the notification stub
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic_arn: String,
    pub subject: String,
    pub message: String,
}

/// Fixture-backed implementation of every backend port
#[derive(Debug, Default)]
pub struct StubBackends {
    /// Pods keyed by namespace
    pub pods: HashMap<String, Vec<Pod>>,
    /// Log text keyed by pod name; other pods get an empty log
    pub logs: HashMap<String, String>,
    pub events: Vec<Event>,
    /// Deployments keyed by namespace
    pub deployments: HashMap<String, Vec<Deployment>>,
    pub nodes: Vec<Node>,
    /// Datapoints keyed by metric name
    pub datapoints: HashMap<String, Vec<Datapoint>>,
    pub detectors: Vec<String>,
    pub finding_ids: Vec<String>,
    pub findings: Vec<Finding>,
    pub services: Vec<ServiceNode>,
    /// Listing pages served in order; keys are filtered by prefix
    pub object_pages: Vec<Vec<ObjectEntry>>,
    pub jobs: Vec<String>,
    /// Runs keyed by job name
    pub job_runs: HashMap<String, Vec<JobRunRecord>>,
    pub crawlers: Vec<CrawlerRecord>,
    pub query_rows: Vec<Vec<ResultField>>,
    /// When set, every call fails with this message
    pub failure: Option<String>,
    query_statuses: Mutex<VecDeque<QueryStatus>>,
    started_queries: Mutex<Vec<LogQuery>>,
    metric_queries: Mutex<Vec<MetricQuery>>,
    published: Mutex<Vec<PublishedMessage>>,
}

impl StubBackends {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enough data for every operation to succeed
    pub fn sample() -> Self {
        let mut stub = Self::new();

        stub.pods.insert(
            "default".into(),
            vec![
                pod("web-1", "Running", &[true], &[0]),
                pod("web-2", "Running", &[true, true], &[1, 1]),
                pod("worker-1", "Pending", &[false], &[0]),
            ],
        );
        stub.logs.insert(
            "web-1".into(),
            "INFO started\nERROR connection refused\nINFO retrying\nFATAL giving up\n".into(),
        );
        stub.events.push(pod_event("web-1", "Scheduled", "Successfully assigned"));
        stub.deployments.insert(
            "default".into(),
            vec![deployment("web", "default", 2, Some(2))],
        );
        stub.nodes.push(node("ip-10-0-1-10", "4", "16Gi", "110"));

        for metric in [
            "IncomingRecords",
            "IncomingBytes",
            "PutRecord.Success",
            "GetRecords.Success",
            "CPUUtilization",
        ] {
            stub.datapoints.insert(
                metric.into(),
                vec![datapoint(1, 10.0), datapoint(2, 20.0)],
            );
        }
        stub.datapoints
            .insert("cluster_node_count".into(), vec![datapoint(1, 3.0)]);
        stub.datapoints
            .insert("cluster_failed_node_count".into(), vec![datapoint(1, 0.0)]);

        stub.detectors.push("det-1".into());
        stub.finding_ids = vec!["f-1".into(), "f-2".into()];
        stub.findings.push(Finding {
            id: "f-1".into(),
            finding_type: Some("UnauthorizedAccess:EC2/SSHBruteForce".into()),
            severity: Some(8.0),
            title: Some("SSH brute force".into()),
            ..Default::default()
        });
        stub.services.push(ServiceNode {
            reference_id: Some(0),
            name: Some("api".into()),
            names: vec!["api".into()],
            service_type: Some("AWS::EKS::Container".into()),
            ..Default::default()
        });
        stub.object_pages = vec![vec![
            ObjectEntry { key: "bronze/a.json".into(), size: 512 },
            ObjectEntry { key: "bronze/b.json".into(), size: 512 },
        ]];
        stub.jobs = vec!["ingest".into()];
        stub.job_runs.insert(
            "ingest".into(),
            vec![JobRunRecord {
                job_name: "ingest".into(),
                run_id: "jr_1".into(),
                state: Some("SUCCEEDED".into()),
                started_on: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).single(),
                completed_on: Utc.with_ymd_and_hms(2024, 6, 1, 0, 5, 0).single(),
                execution_time: 300,
                error_message: None,
            }],
        );
        stub.crawlers.push(CrawlerRecord {
            name: "bronze-crawler".into(),
            state: Some("READY".into()),
            last_crawl_status: Some("SUCCEEDED".into()),
            tables_created: 1,
            tables_updated: 2,
        });
        stub.query_rows = vec![vec![
            ResultField::new("@timestamp", "2024-06-01 00:00:00.000"),
            ResultField::new("@message", "ERROR upstream timeout"),
        ]];

        stub
    }

    /// Make every call fail with `message`
    pub fn fail_with(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Statuses returned by successive result polls before `Complete`
    pub fn with_query_statuses(self, statuses: Vec<QueryStatus>) -> Self {
        Self {
            query_statuses: Mutex::new(statuses.into()),
            ..self
        }
    }

    pub fn with_query_rows(mut self, rows: Vec<Vec<ResultField>>) -> Self {
        self.query_rows = rows;
        self
    }

    pub fn with_object_pages(mut self, pages: Vec<Vec<ObjectEntry>>) -> Self {
        self.object_pages = pages;
        self
    }

    /// Share the stub as a full backend set, keeping a handle for inspection
    pub fn into_backends(self) -> (Arc<Self>, Backends) {
        let stub = Arc::new(self);
        let backends = Backends {
            cluster: stub.clone(),
            metrics: stub.clone(),
            logs: stub.clone(),
            findings: stub.clone(),
            traces: stub.clone(),
            objects: stub.clone(),
            etl: stub.clone(),
            notifications: stub.clone(),
        };
        (stub, backends)
    }

    pub async fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().await.clone()
    }

    pub async fn started_queries(&self) -> Vec<LogQuery> {
        self.started_queries.lock().await.clone()
    }

    pub async fn metric_queries(&self) -> Vec<MetricQuery> {
        self.metric_queries.lock().await.clone()
    }

    fn check(&self) -> Result<()> {
        match &self.failure {
            Some(message) => Err(anyhow!("{}", message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ClusterApi for StubBackends {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>> {
        self.check()?;
        Ok(self.pods.get(namespace).cloned().unwrap_or_default())
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod> {
        self.check()?;
        self.pods
            .get(namespace)
            .and_then(|pods| pods.iter().find(|p| p.metadata.name.as_deref() == Some(name)))
            .cloned()
            .ok_or_else(|| anyhow!("pods \"{}\" not found", name))
    }

    async fn pod_logs(&self, _namespace: &str, name: &str, tail_lines: i64) -> Result<String> {
        self.check()?;
        let text = self.logs.get(name).cloned().unwrap_or_default();
        let lines: Vec<&str> = text.lines().collect();
        let skip = lines.len().saturating_sub(tail_lines.max(0) as usize);
        Ok(lines[skip..].join("\n"))
    }

    async fn list_pod_events(&self, _namespace: &str, name: &str) -> Result<Vec<Event>> {
        self.check()?;
        Ok(self
            .events
            .iter()
            .filter(|e| e.involved_object.name.as_deref() == Some(name))
            .cloned()
            .collect())
    }

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>> {
        self.check()?;
        Ok(self.deployments.get(namespace).cloned().unwrap_or_default())
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment> {
        self.check()?;
        self.deployments
            .get(namespace)
            .and_then(|deps| deps.iter().find(|d| d.metadata.name.as_deref() == Some(name)))
            .cloned()
            .ok_or_else(|| anyhow!("deployments.apps \"{}\" not found", name))
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        self.check()?;
        Ok(self.nodes.clone())
    }
}

#[async_trait]
impl MetricsApi for StubBackends {
    async fn get_metric_statistics(&self, query: &MetricQuery) -> Result<Vec<Datapoint>> {
        self.check()?;
        self.metric_queries.lock().await.push(query.clone());
        Ok(self
            .datapoints
            .get(&query.metric_name)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl LogsApi for StubBackends {
    async fn start_query(&self, query: &LogQuery) -> Result<String> {
        self.check()?;
        let mut started = self.started_queries.lock().await;
        started.push(query.clone());
        Ok(format!("query-{}", started.len()))
    }

    async fn get_query_results(&self, _query_id: &str) -> Result<QueryResults> {
        self.check()?;
        let status = self
            .query_statuses
            .lock()
            .await
            .pop_front()
            .unwrap_or(QueryStatus::Complete);
        let rows = match status {
            QueryStatus::Complete => self.query_rows.clone(),
            _ => Vec::new(),
        };
        Ok(QueryResults { status, rows })
    }
}

#[async_trait]
impl FindingsApi for StubBackends {
    async fn list_detectors(&self) -> Result<Vec<String>> {
        self.check()?;
        Ok(self.detectors.clone())
    }

    async fn list_findings(&self, _detector_id: &str, max_results: i32) -> Result<Vec<String>> {
        self.check()?;
        Ok(self
            .finding_ids
            .iter()
            .take(max_results.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn get_findings(&self, _detector_id: &str, finding_ids: &[String]) -> Result<Vec<Finding>> {
        self.check()?;
        Ok(self
            .findings
            .iter()
            .filter(|f| finding_ids.contains(&f.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TraceApi for StubBackends {
    async fn get_service_graph(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<ServiceNode>> {
        self.check()?;
        Ok(self.services.clone())
    }
}

#[async_trait]
impl ObjectStoreApi for StubBackends {
    async fn list_objects(
        &self,
        _bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage> {
        self.check()?;
        let index = match continuation_token {
            Some(token) => token
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| anyhow!("The continuation token provided is incorrect"))?,
            None => 0,
        };

        let objects = self
            .object_pages
            .get(index)
            .map(|page| {
                page.iter()
                    .filter(|o| o.key.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let next_continuation_token =
            (index + 1 < self.object_pages.len()).then(|| format!("page-{}", index + 1));

        Ok(ObjectPage {
            objects,
            next_continuation_token,
        })
    }
}

#[async_trait]
impl EtlApi for StubBackends {
    async fn list_jobs(&self) -> Result<Vec<String>> {
        self.check()?;
        Ok(self.jobs.clone())
    }

    async fn job_runs(&self, job_name: &str, max_results: i32) -> Result<Vec<JobRunRecord>> {
        self.check()?;
        Ok(self
            .job_runs
            .get(job_name)
            .map(|runs| runs.iter().take(max_results.max(0) as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn get_crawler(&self, name: &str) -> Result<CrawlerRecord> {
        self.check()?;
        self.crawlers
            .iter()
            .find(|c| c.name == name)
            .cloned()
            .ok_or_else(|| anyhow!("Crawler entry with name {} does not exist", name))
    }

    async fn list_crawlers(&self) -> Result<Vec<CrawlerRecord>> {
        self.check()?;
        Ok(self.crawlers.clone())
    }
}

#[async_trait]
impl NotificationApi for StubBackends {
    async fn publish(&self, topic_arn: &str, subject: &str, message: &str) -> Result<String> {
        self.check()?;
        let mut published = self.published.lock().await;
        published.push(PublishedMessage {
            topic_arn: topic_arn.to_string(),
            subject: subject.to_string(),
            message: message.to_string(),
        });
        Ok(format!("msg-{}", published.len()))
    }
}

// ========== Fixture builders ==========

/// Pod with one container status per entry of `ready`/`restarts`
pub fn pod(name: &str, phase: &str, ready: &[bool], restarts: &[i32]) -> Pod {
    let statuses: Vec<ContainerStatus> = ready
        .iter()
        .zip(restarts.iter().chain(std::iter::repeat(&0)))
        .enumerate()
        .map(|(i, (ready, restarts))| ContainerStatus {
            name: format!("c{}", i),
            ready: *ready,
            restart_count: *restarts,
            ..Default::default()
        })
        .collect();

    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            ..Default::default()
        },
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            container_statuses: (!statuses.is_empty()).then_some(statuses),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn pod_event(pod: &str, reason: &str, message: &str) -> Event {
    Event {
        metadata: ObjectMeta {
            name: Some(format!("{}.{}", pod, reason.to_lowercase())),
            ..Default::default()
        },
        involved_object: ObjectReference {
            kind: Some("Pod".to_string()),
            name: Some(pod.to_string()),
            ..Default::default()
        },
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        ..Default::default()
    }
}

pub fn deployment(name: &str, namespace: &str, replicas: i32, ready: Option<i32>) -> Deployment {
    Deployment {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(replicas),
            ..Default::default()
        }),
        status: Some(DeploymentStatus {
            ready_replicas: ready,
            available_replicas: ready,
            ..Default::default()
        }),
    }
}

pub fn node(name: &str, cpu: &str, memory: &str, pods: &str) -> Node {
    let quantities: BTreeMap<String, Quantity> = [("cpu", cpu), ("memory", memory), ("pods", pods)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), Quantity(v.to_string())))
        .collect();

    Node {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        status: Some(NodeStatus {
            capacity: Some(quantities.clone()),
            allocatable: Some(quantities),
            conditions: Some(vec![NodeCondition {
                type_: "Ready".to_string(),
                status: "True".to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Datapoint at `hour` past midnight 2024-06-01 with every statistic set to `value`
pub fn datapoint(hour: u32, value: f64) -> Datapoint {
    Datapoint {
        timestamp: Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).single(),
        sum: Some(value),
        average: Some(value),
        maximum: Some(value),
        minimum: Some(value),
        sample_count: Some(1.0),
        unit: Some("Count".to_string()),
    }
}
