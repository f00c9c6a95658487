//! Action router
//!
//! Resolves an invocation against the [`CapabilityRegistry`], validates its
//! parameters, runs the operation against the injected [`Backends`] and wraps
//! the outcome in the response envelope.

use chrono::Utc;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use ops_core::{ActionInvocation, ActionResponse, Error, Result, Settings, StatusPolicy};

use crate::backend::{Backends, MetricQuery, Statistic};
use crate::normalize::aws::{self, AlertMessage, ClusterHealth, ObjectCount, SentAlert, StreamMetrics};
use crate::normalize::kubernetes::{self, ObjectListing, PodDescription, PodLogs};
use crate::normalize::logs;
use crate::normalize::{to_json, window_start};
use crate::operation::Operation;
use crate::params::{Params, Resolved};
use crate::registry::CapabilityRegistry;

pub use crate::normalize::logs::PollConfig;

const KINESIS_NAMESPACE: &str = "AWS/Kinesis";
const KINESIS_METRICS: [&str; 4] = [
    "IncomingRecords",
    "IncomingBytes",
    "PutRecord.Success",
    "GetRecords.Success",
];
const CONTAINER_INSIGHTS_NAMESPACE: &str = "ContainerInsights";
const HOURLY: i32 = 3600;
const MAX_FINDING_IDS: i32 = 10;
const NAMED_JOB_RUNS: i32 = 10;
const LISTED_JOBS: usize = 5;
const LISTED_JOB_RUNS: i32 = 5;

/// Router settings
#[derive(Debug, Clone, Default)]
pub struct RouterConfig {
    /// Cluster reported by alerts and used for Container Insights queries
    pub cluster_name: String,
    pub poll: PollConfig,
    pub status_policy: StatusPolicy,
}

impl RouterConfig {
    pub fn new(cluster_name: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            ..Default::default()
        }
    }

    /// Build from settings; the cluster name is required
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            cluster_name: settings.require_cluster_name()?.to_string(),
            poll: PollConfig::from(settings),
            status_policy: settings.status_policy,
        })
    }

    pub fn with_status_policy(mut self, policy: StatusPolicy) -> Self {
        self.status_policy = policy;
        self
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }
}

/// Dispatches action invocations onto backend calls
pub struct ActionRouter {
    registry: CapabilityRegistry,
    backends: Backends,
    config: RouterConfig,
}

impl ActionRouter {
    pub fn new(backends: Backends, config: RouterConfig) -> Self {
        Self {
            registry: CapabilityRegistry::new(),
            backends,
            config,
        }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Run one operation and return its normalized result
    pub async fn dispatch(&self, action_group: &str, api_path: &str, params: &Params) -> Result<Value> {
        let entry = self.registry.resolve(action_group, api_path)?;
        let args = params.resolve(entry.params)?;
        debug!(operation = ?entry.operation, "Resolved action");
        self.execute(entry.operation, &args).await
    }

    /// Handle a full invocation, always producing a well-formed envelope
    pub async fn respond(&self, invocation: &ActionInvocation) -> ActionResponse {
        let action_group = invocation.action_group.as_str();
        let api_path = invocation.api_path.as_str();
        info!(action_group, api_path, "Dispatching action");

        let params = Params::from_parameters(&invocation.parameters);
        let (status, body) = match self.dispatch(action_group, api_path, &params).await {
            Ok(value) => {
                debug!(action_group, api_path, "Action succeeded");
                (200, value)
            }
            Err(err) => {
                let status = err.status_code(self.config.status_policy);
                warn!(action_group, api_path, status, error = %err, "Action failed");
                (status, json!({ "error": err.to_string() }))
            }
        };

        let mut response = ActionResponse::new(action_group, api_path, status, body.to_string());
        response.session_attributes = invocation.session_attributes.clone();
        response.prompt_session_attributes = invocation.prompt_session_attributes.clone();
        response
    }

    async fn execute(&self, operation: Operation, args: &Resolved) -> Result<Value> {
        match operation {
            Operation::KubectlGet => self.kubectl_get(args).await,
            Operation::KubectlLogs => self.kubectl_logs(args).await,
            Operation::KubectlDescribe => self.kubectl_describe(args).await,
            Operation::PodHealth => self.pod_health(args).await,
            Operation::ScanLogs => self.scan_logs(args).await,
            Operation::DeploymentStatus => self.deployment_status(args).await,
            Operation::NodeResources => self.node_resources().await,
            Operation::MetricData => self.metric_data(args).await,
            Operation::SecurityFindings => self.security_findings(args).await,
            Operation::ServiceGraph => self.service_graph(args).await,
            Operation::StreamMetrics => self.stream_metrics(args).await,
            Operation::ObjectCount => self.object_count(args).await,
            Operation::JobStatus => self.job_status(args).await,
            Operation::CrawlerStatus => self.crawler_status(args).await,
            Operation::SendAlert => self.send_alert(args).await,
            Operation::AnalyzeLogs => self.analyze_logs(args).await,
            Operation::ClusterHealth => self.cluster_health().await,
            Operation::ListTools => to_json(&aws::tool_catalog(&self.registry)),
        }
    }

    // ========== Kubernetes ==========

    async fn kubectl_get(&self, args: &Resolved) -> Result<Value> {
        let resource = args.require_text("resource")?;
        let namespace = args.require_text("namespace")?;
        let cluster = &self.backends.cluster;

        let listing = match (resource.as_str(), args.text("name")) {
            ("pods", Some(name)) => ObjectListing::Pod(Box::new(cluster.get_pod(&namespace, &name).await?)),
            ("pods", None) => ObjectListing::Pods(cluster.list_pods(&namespace).await?),
            ("deployments", Some(name)) => {
                ObjectListing::Deployment(Box::new(cluster.get_deployment(&namespace, &name).await?))
            }
            ("deployments", None) => ObjectListing::Deployments(cluster.list_deployments(&namespace).await?),
            (other, _) => return Err(unsupported_resource(other)),
        };
        to_json(&listing)
    }

    async fn kubectl_logs(&self, args: &Resolved) -> Result<Value> {
        let pod = args.require_text("pod")?;
        let namespace = args.require_text("namespace")?;
        let tail = args.require_integer("tail")?;

        let logs = self.backends.cluster.pod_logs(&namespace, &pod, tail).await?;
        to_json(&PodLogs { logs })
    }

    async fn kubectl_describe(&self, args: &Resolved) -> Result<Value> {
        let resource = args.require_text("resource")?;
        if resource != "pod" {
            return Err(unsupported_resource(&resource));
        }
        let name = args.require_text("name")?;
        let namespace = args.require_text("namespace")?;

        let pod = self.backends.cluster.get_pod(&namespace, &name).await?;
        let events = self.backends.cluster.list_pod_events(&namespace, &name).await?;
        to_json(&PodDescription { pod, events })
    }

    async fn pod_health(&self, args: &Resolved) -> Result<Value> {
        let mut health = BTreeMap::new();
        for namespace in args.require_list("namespaces")? {
            let pods = self.backends.cluster.list_pods(&namespace).await?;
            health.insert(namespace, kubernetes::namespace_health(&pods));
        }
        to_json(&health)
    }

    async fn scan_logs(&self, args: &Resolved) -> Result<Value> {
        let namespace = args.require_text("namespace")?;
        let pod = args.require_text("pod_name")?;
        let patterns = args.require_list("error_patterns")?;
        let tail = args.require_integer("tail")?;

        let logs = self.backends.cluster.pod_logs(&namespace, &pod, tail).await?;
        to_json(&kubernetes::scan_logs(&pod, &namespace, &logs, &patterns))
    }

    async fn deployment_status(&self, args: &Resolved) -> Result<Value> {
        let namespace = args.require_text("namespace")?;
        let deployments = match args.text("deployment_name") {
            Some(name) => vec![self.backends.cluster.get_deployment(&namespace, &name).await?],
            None => self.backends.cluster.list_deployments(&namespace).await?,
        };

        let summaries: Vec<_> = deployments.iter().map(kubernetes::deployment_summary).collect();
        to_json(&summaries)
    }

    async fn node_resources(&self) -> Result<Value> {
        let nodes = self.backends.cluster.list_nodes().await?;
        let summaries: Vec<_> = nodes.iter().map(kubernetes::node_summary).collect();
        to_json(&summaries)
    }

    // ========== Metrics and tracing ==========

    async fn metric_data(&self, args: &Resolved) -> Result<Value> {
        let query = MetricQuery::new(
            args.require_text("namespace")?,
            args.require_text("metric")?,
            args.require_timestamp("start_time")?,
            args.require_timestamp("end_time")?,
            to_i32("period", args.require_integer("period")?)?,
        )
        .statistic(Statistic::Average)
        .statistic(Statistic::Maximum);

        let datapoints = self.backends.metrics.get_metric_statistics(&query).await?;
        to_json(&aws::metric_data(datapoints))
    }

    async fn service_graph(&self, args: &Resolved) -> Result<Value> {
        let start = args.require_timestamp("start_time")?;
        let end = args.require_timestamp("end_time")?;

        let services = self.backends.traces.get_service_graph(start, end).await?;
        to_json(&aws::ServiceGraph { services })
    }

    async fn stream_metrics(&self, args: &Resolved) -> Result<Value> {
        let stream_name = args.require_text("stream_name")?;
        let hours = positive("hours", args.require_integer("hours")?)?;
        let end = Utc::now();
        let start = window_start(end, hours)?;

        let mut totals = [0.0; 4];
        for (total, metric) in totals.iter_mut().zip(KINESIS_METRICS) {
            let query = MetricQuery::new(KINESIS_NAMESPACE, metric, start, end, HOURLY)
                .dimension("StreamName", stream_name.as_str())
                .statistic(Statistic::Sum);
            *total = aws::total_sum(&self.backends.metrics.get_metric_statistics(&query).await?);
        }

        let [records_sent, bytes_sent, put_success, get_success] = totals;
        to_json(&StreamMetrics {
            stream_name,
            time_range_hours: hours,
            records_sent,
            bytes_sent,
            put_success,
            get_success,
        })
    }

    async fn cluster_health(&self) -> Result<Value> {
        let cluster_name = self.config.cluster_name.as_str();
        let end = Utc::now();
        let start = window_start(end, 1)?;

        let latest = |metric: &'static str| {
            let query = MetricQuery::new(CONTAINER_INSIGHTS_NAMESPACE, metric, start, end, HOURLY)
                .dimension("ClusterName", cluster_name)
                .statistic(Statistic::Average);
            async move {
                let points = self.backends.metrics.get_metric_statistics(&query).await?;
                Ok::<_, Error>(aws::latest_average(&points).unwrap_or(0.0))
            }
        };

        let failed_nodes = latest("cluster_failed_node_count").await?;
        let node_count = latest("cluster_node_count").await?;
        to_json(&ClusterHealth::new(cluster_name, node_count, failed_nodes))
    }

    // ========== Security ==========

    async fn security_findings(&self, args: &Resolved) -> Result<Value> {
        let findings = &self.backends.findings;
        let detector_id = findings
            .list_detectors()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::unsupported("No GuardDuty detector found"))?;

        let ids = args.list("finding_ids")?.unwrap_or_default();
        if ids.is_empty() {
            let finding_ids = findings.list_findings(&detector_id, MAX_FINDING_IDS).await?;
            to_json(&aws::FindingIds { finding_ids })
        } else {
            let findings = findings.get_findings(&detector_id, &ids).await?;
            to_json(&aws::Findings { findings })
        }
    }

    // ========== Data pipeline ==========

    async fn object_count(&self, args: &Resolved) -> Result<Value> {
        let bucket = args.require_text("bucket")?;
        let prefix = args.text("prefix").unwrap_or_default();

        let mut count = 0u64;
        let mut bytes = 0u64;
        let mut token = None;
        let mut pages = 0usize;
        loop {
            let page = self.backends.objects.list_objects(&bucket, &prefix, token).await?;
            pages += 1;
            count += page.objects.len() as u64;
            bytes += page.objects.iter().map(|o| o.size).sum::<u64>();
            match page.next_continuation_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        debug!(%bucket, %prefix, pages, count, "Counted objects");
        to_json(&ObjectCount::new(bucket, prefix, count, bytes))
    }

    async fn job_status(&self, args: &Resolved) -> Result<Value> {
        let etl = &self.backends.etl;
        let runs = match args.text("job_name") {
            Some(job) => etl.job_runs(&job, NAMED_JOB_RUNS).await?,
            None => {
                let mut runs = Vec::new();
                for job in etl.list_jobs().await?.into_iter().take(LISTED_JOBS) {
                    runs.extend(etl.job_runs(&job, LISTED_JOB_RUNS).await?);
                }
                runs
            }
        };

        let runs: Vec<aws::JobRun> = runs.into_iter().map(Into::into).collect();
        to_json(&runs)
    }

    async fn crawler_status(&self, args: &Resolved) -> Result<Value> {
        let crawlers = match args.text("crawler_name") {
            Some(name) => vec![self.backends.etl.get_crawler(&name).await?],
            None => self.backends.etl.list_crawlers().await?,
        };

        let statuses: Vec<aws::CrawlerStatus> = crawlers.into_iter().map(Into::into).collect();
        to_json(&statuses)
    }

    // ========== Monitoring and alerting ==========

    async fn send_alert(&self, args: &Resolved) -> Result<Value> {
        let topic = args.require_text("topic_arn")?;
        let alert = AlertMessage::new(
            Utc::now(),
            args.require_text("severity")?,
            self.config.cluster_name.as_str(),
            args.require_text("subject")?,
            args.require_text("message")?,
        );

        let message_id = self
            .backends
            .notifications
            .publish(&topic, &alert.subject_line(), &alert.body()?)
            .await?;
        info!(%topic, %message_id, severity = %alert.severity, "Alert published");
        to_json(&SentAlert::new(topic, message_id))
    }

    async fn analyze_logs(&self, args: &Resolved) -> Result<Value> {
        let log_group = args.require_text("log_group")?;
        let hours = positive("hours", args.require_integer("hours")?)?;
        let patterns = args.require_list("error_patterns")?;
        if patterns.is_empty() {
            return Err(Error::invalid("error_patterns", "at least one pattern is required"));
        }

        let analysis = logs::analyze(
            self.backends.logs.as_ref(),
            &log_group,
            hours,
            &patterns,
            Utc::now(),
            &self.config.poll,
        )
        .await?;
        to_json(&analysis)
    }
}

fn unsupported_resource(resource: &str) -> Error {
    Error::unsupported(format!("Unsupported resource type: {}", resource))
}

fn positive(name: &str, value: i64) -> Result<i64> {
    if value > 0 {
        Ok(value)
    } else {
        Err(Error::invalid(name, format!("must be positive, got {}", value)))
    }
}

fn to_i32(name: &str, value: i64) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::invalid(name, format!("out of range: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubBackends;
    use pretty_assertions::assert_eq;

    fn router(stub: StubBackends) -> ActionRouter {
        let (_, backends) = stub.into_backends();
        ActionRouter::new(backends, RouterConfig::new("prod-eks"))
    }

    #[tokio::test]
    async fn test_get_unsupported_resource() {
        let router = router(StubBackends::sample());
        let params = Params::new().with("resource", "services");
        let err = router
            .dispatch("kubernetes-operations", "/kubectl/get", &params)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unsupported resource type: services");
    }

    #[tokio::test]
    async fn test_get_single_pod() {
        let router = router(StubBackends::sample());
        let params = Params::new().with("resource", "pods").with("name", "web-1");
        let value = router
            .dispatch("kubernetes-operations", "/kubectl/get", &params)
            .await
            .unwrap();
        assert_eq!(value["pod"]["metadata"]["name"], "web-1");
    }

    #[tokio::test]
    async fn test_no_detector_is_refusal() {
        let mut stub = StubBackends::sample();
        stub.detectors.clear();
        let router = router(stub);
        let err = router
            .dispatch("aws-operations", "/guardduty/get-findings", &Params::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
        assert_eq!(err.to_string(), "No GuardDuty detector found");
    }

    #[tokio::test]
    async fn test_findings_by_id() {
        let router = router(StubBackends::sample());
        let params = Params::new().with("finding_ids", "[\"f-1\"]");
        let value = router
            .dispatch("aws-operations", "/guardduty/get-findings", &params)
            .await
            .unwrap();
        assert_eq!(value["findings"][0]["id"], "f-1");
        assert_eq!(value["findings"][0]["severity"], 8.0);
    }

    #[tokio::test]
    async fn test_stream_metrics_queries_each_metric() {
        let (stub, backends) = StubBackends::sample().into_backends();
        let router = ActionRouter::new(backends, RouterConfig::new("prod-eks"));
        let params = Params::new().with("stream_name", "events").with("hours", "6");
        let value = router
            .dispatch("aws-operations", "/kinesis/get-metrics", &params)
            .await
            .unwrap();

        assert_eq!(value["records_sent"], 30.0);
        assert_eq!(value["time_range_hours"], 6);
        let queries = stub.metric_queries().await;
        assert_eq!(queries.len(), 4);
        assert!(queries.iter().all(|q| q.namespace == "AWS/Kinesis"
            && q.period_secs == 3600
            && q.dimensions == vec![("StreamName".to_string(), "events".to_string())]));
    }

    #[tokio::test]
    async fn test_cluster_health_uses_configured_cluster() {
        let router = router(StubBackends::sample());
        let value = router
            .dispatch("aws-operations", "/eks/cluster-health", &Params::new())
            .await
            .unwrap();
        assert_eq!(
            value,
            json!({
                "cluster_name": "prod-eks",
                "node_count": 3.0,
                "failed_nodes": 0.0,
                "healthy": true
            })
        );
    }

    #[tokio::test]
    async fn test_send_alert_publishes_structured_message() {
        let (stub, backends) = StubBackends::sample().into_backends();
        let router = ActionRouter::new(backends, RouterConfig::new("prod-eks"));
        let params = Params::new()
            .with("topic_arn", "arn:aws:sns:us-gov-west-1:123:ops")
            .with("subject", "Pods crashlooping")
            .with("message", "web-2 restarted 5 times")
            .with("severity", "HIGH");
        let value = router
            .dispatch("aws-operations", "/sns/send-alert", &params)
            .await
            .unwrap();

        assert_eq!(value["status"], "sent");
        assert_eq!(value["message_id"], "msg-1");
        let published = stub.published().await;
        assert_eq!(published[0].subject, "[HIGH] Pods crashlooping");
        let body: Value = serde_json::from_str(&published[0].message).unwrap();
        assert_eq!(body["cluster"], "prod-eks");
        assert_eq!(body["message"], "web-2 restarted 5 times");
    }

    #[tokio::test]
    async fn test_job_status_without_name_limits_jobs() {
        let mut stub = StubBackends::sample();
        stub.jobs = (0..8).map(|i| format!("job-{}", i)).collect();
        for job in stub.jobs.clone() {
            let runs = (0..7)
                .map(|i| crate::backend::JobRunRecord {
                    job_name: job.clone(),
                    run_id: format!("jr_{}", i),
                    ..Default::default()
                })
                .collect();
            stub.job_runs.insert(job, runs);
        }
        let router = router(stub);

        let value = router
            .dispatch("aws-operations", "/glue/job-status", &Params::new())
            .await
            .unwrap();
        let runs = value.as_array().unwrap();
        assert_eq!(runs.len(), 25);
        assert!(runs.iter().all(|r| r["job_name"] != "job-5"));
        assert_eq!(runs[0]["started"], Value::Null);

        let params = Params::new().with("job_name", "job-7");
        let value = router
            .dispatch("aws-operations", "/glue/job-status", &params)
            .await
            .unwrap();
        assert_eq!(value.as_array().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_respond_echoes_session_attributes() {
        let router = router(StubBackends::sample());
        let mut invocation = ActionInvocation::new("aws-operations", "/tools/list");
        invocation.session_attributes = Some(json!({"team": "sre"}));
        let response = router.respond(&invocation).await;
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.session_attributes, Some(json!({"team": "sre"})));
    }

    #[tokio::test]
    async fn test_unified_policy_returns_500_for_refusals() {
        let (_, backends) = StubBackends::sample().into_backends();
        let router = ActionRouter::new(
            backends,
            RouterConfig::new("prod-eks").with_status_policy(StatusPolicy::Unified),
        );
        let invocation = ActionInvocation::new("kubernetes-operations", "/kubectl/nope");
        let response = router.respond(&invocation).await;
        assert_eq!(response.status_code(), 500);
    }

    #[tokio::test]
    async fn test_non_positive_hours_rejected() {
        let router = router(StubBackends::sample());
        let params = Params::new().with("log_group", "/aws/eks").with("hours", "0");
        let err = router
            .dispatch("aws-operations", "/cloudwatch/analyze-logs", &params)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { ref name, .. } if name == "hours"));
    }
}
