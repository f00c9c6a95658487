//! Operation catalog
//!
//! Every operation the agent can call is a variant of [`Operation`]. Paths,
//! groups and parameter contracts are attached through exhaustive matches, so
//! adding a variant without wiring it up fails to compile.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::params::{ParamKind, ParamSpec};

/// Patterns used by the log scans when the agent does not pass any
pub const DEFAULT_ERROR_PATTERNS: &str = "ERROR,FATAL,Exception";

/// Named category of operations exposed to the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ActionGroup {
    #[serde(rename = "kubernetes-operations")]
    Kubernetes,
    #[serde(rename = "aws-operations")]
    Aws,
}

impl ActionGroup {
    pub const ALL: [ActionGroup; 2] = [ActionGroup::Kubernetes, ActionGroup::Aws];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionGroup::Kubernetes => "kubernetes-operations",
            ActionGroup::Aws => "aws-operations",
        }
    }
}

impl fmt::Display for ActionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionGroup {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ActionGroup::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| format!("Unknown action group: {}", s))
    }
}

/// Grouping used by the tool listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Kubernetes,
    DataPipeline,
    Monitoring,
    Security,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Kubernetes,
        Category::DataPipeline,
        Category::Monitoring,
        Category::Security,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Kubernetes => "kubernetes",
            Category::DataPipeline => "data_pipeline",
            Category::Monitoring => "monitoring",
            Category::Security => "security",
        }
    }
}

/// Every operation the agent can invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    KubectlGet,
    KubectlLogs,
    KubectlDescribe,
    PodHealth,
    ScanLogs,
    DeploymentStatus,
    NodeResources,
    MetricData,
    SecurityFindings,
    ServiceGraph,
    StreamMetrics,
    ObjectCount,
    JobStatus,
    CrawlerStatus,
    SendAlert,
    AnalyzeLogs,
    ClusterHealth,
    ListTools,
}

impl Operation {
    pub const ALL: [Operation; 18] = [
        Operation::KubectlGet,
        Operation::KubectlLogs,
        Operation::KubectlDescribe,
        Operation::PodHealth,
        Operation::ScanLogs,
        Operation::DeploymentStatus,
        Operation::NodeResources,
        Operation::MetricData,
        Operation::SecurityFindings,
        Operation::ServiceGraph,
        Operation::StreamMetrics,
        Operation::ObjectCount,
        Operation::JobStatus,
        Operation::CrawlerStatus,
        Operation::SendAlert,
        Operation::AnalyzeLogs,
        Operation::ClusterHealth,
        Operation::ListTools,
    ];

    pub fn action_group(&self) -> ActionGroup {
        match self {
            Operation::KubectlGet
            | Operation::KubectlLogs
            | Operation::KubectlDescribe
            | Operation::PodHealth
            | Operation::ScanLogs
            | Operation::DeploymentStatus
            | Operation::NodeResources => ActionGroup::Kubernetes,
            Operation::MetricData
            | Operation::SecurityFindings
            | Operation::ServiceGraph
            | Operation::StreamMetrics
            | Operation::ObjectCount
            | Operation::JobStatus
            | Operation::CrawlerStatus
            | Operation::SendAlert
            | Operation::AnalyzeLogs
            | Operation::ClusterHealth
            | Operation::ListTools => ActionGroup::Aws,
        }
    }

    pub fn api_path(&self) -> &'static str {
        match self {
            Operation::KubectlGet => "/kubectl/get",
            Operation::KubectlLogs => "/kubectl/logs",
            Operation::KubectlDescribe => "/kubectl/describe",
            Operation::PodHealth => "/kubectl/pod-health",
            Operation::ScanLogs => "/kubectl/probe-logs",
            Operation::DeploymentStatus => "/kubectl/deployment-status",
            Operation::NodeResources => "/kubectl/node-resources",
            Operation::MetricData => "/cloudwatch/get-metric-data",
            Operation::SecurityFindings => "/guardduty/get-findings",
            Operation::ServiceGraph => "/xray/get-service-graph",
            Operation::StreamMetrics => "/kinesis/get-metrics",
            Operation::ObjectCount => "/s3/get-object-count",
            Operation::JobStatus => "/glue/job-status",
            Operation::CrawlerStatus => "/glue/crawler-status",
            Operation::SendAlert => "/sns/send-alert",
            Operation::AnalyzeLogs => "/cloudwatch/analyze-logs",
            Operation::ClusterHealth => "/eks/cluster-health",
            Operation::ListTools => "/tools/list",
        }
    }

    /// Name shown in the tool listing
    pub fn tool_name(&self) -> &'static str {
        match self {
            Operation::KubectlGet => "kubectl_get",
            Operation::KubectlLogs => "kubectl_logs",
            Operation::KubectlDescribe => "kubectl_describe",
            Operation::PodHealth => "get_pod_health",
            Operation::ScanLogs => "probe_logs_for_errors",
            Operation::DeploymentStatus => "get_deployment_status",
            Operation::NodeResources => "get_node_resources",
            Operation::MetricData => "get_cloudwatch_metrics",
            Operation::SecurityFindings => "get_guardduty_findings",
            Operation::ServiceGraph => "get_xray_service_graph",
            Operation::StreamMetrics => "get_kinesis_metrics",
            Operation::ObjectCount => "get_s3_object_count",
            Operation::JobStatus => "get_glue_job_status",
            Operation::CrawlerStatus => "check_glue_crawler_status",
            Operation::SendAlert => "send_sns_alert",
            Operation::AnalyzeLogs => "analyze_cloudwatch_logs",
            Operation::ClusterHealth => "get_eks_cluster_health",
            Operation::ListTools => "get_available_tools",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Operation::KubectlGet
            | Operation::KubectlLogs
            | Operation::KubectlDescribe
            | Operation::PodHealth
            | Operation::ScanLogs
            | Operation::DeploymentStatus
            | Operation::NodeResources => Category::Kubernetes,
            Operation::StreamMetrics
            | Operation::ObjectCount
            | Operation::JobStatus
            | Operation::CrawlerStatus => Category::DataPipeline,
            Operation::MetricData
            | Operation::ServiceGraph
            | Operation::SendAlert
            | Operation::AnalyzeLogs
            | Operation::ClusterHealth
            | Operation::ListTools => Category::Monitoring,
            Operation::SecurityFindings => Category::Security,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Operation::KubectlGet => "Get pods or deployments, one by name or all in a namespace",
            Operation::KubectlLogs => "Tail the logs of a pod",
            Operation::KubectlDescribe => "Describe a pod together with its events",
            Operation::PodHealth => "Pod phase counts, readiness and restarts per namespace",
            Operation::ScanLogs => "Scan a pod's recent logs for error patterns",
            Operation::DeploymentStatus => "Replica counts and conditions of deployments",
            Operation::NodeResources => "Capacity, allocatable resources and conditions of nodes",
            Operation::MetricData => "Average and maximum statistics of a CloudWatch metric",
            Operation::SecurityFindings => "List GuardDuty finding ids or fetch findings by id",
            Operation::ServiceGraph => "X-Ray service graph for a time window",
            Operation::StreamMetrics => "Kinesis stream throughput totals over recent hours",
            Operation::ObjectCount => "Object count and total size under an S3 prefix",
            Operation::JobStatus => "Recent Glue job runs",
            Operation::CrawlerStatus => "Glue crawler state and last crawl",
            Operation::SendAlert => "Publish a structured alert to an SNS topic",
            Operation::AnalyzeLogs => "Search a CloudWatch log group for error patterns",
            Operation::ClusterHealth => "EKS node counts and overall health from Container Insights",
            Operation::ListTools => "List every available operation",
        }
    }

    pub fn params(&self) -> &'static [ParamSpec] {
        match self {
            Operation::KubectlGet => KUBECTL_GET,
            Operation::KubectlLogs => KUBECTL_LOGS,
            Operation::KubectlDescribe => KUBECTL_DESCRIBE,
            Operation::PodHealth => POD_HEALTH,
            Operation::ScanLogs => SCAN_LOGS,
            Operation::DeploymentStatus => DEPLOYMENT_STATUS,
            Operation::MetricData => METRIC_DATA,
            Operation::SecurityFindings => SECURITY_FINDINGS,
            Operation::ServiceGraph => SERVICE_GRAPH,
            Operation::StreamMetrics => STREAM_METRICS,
            Operation::ObjectCount => OBJECT_COUNT,
            Operation::JobStatus => JOB_STATUS,
            Operation::CrawlerStatus => CRAWLER_STATUS,
            Operation::SendAlert => SEND_ALERT,
            Operation::AnalyzeLogs => ANALYZE_LOGS,
            Operation::NodeResources | Operation::ClusterHealth | Operation::ListTools => &[],
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.action_group(), self.api_path())
    }
}

const KUBECTL_GET: &[ParamSpec] = &[
    ParamSpec::required("resource", ParamKind::String, "pods or deployments"),
    ParamSpec::optional("namespace", ParamKind::String, Some("default"), "Namespace"),
    ParamSpec::optional("name", ParamKind::String, None, "Object name; all objects when omitted"),
];

const KUBECTL_LOGS: &[ParamSpec] = &[
    ParamSpec::required("pod", ParamKind::String, "Pod name"),
    ParamSpec::optional("namespace", ParamKind::String, Some("default"), "Namespace"),
    ParamSpec::optional("tail", ParamKind::Integer, Some("100"), "Number of trailing lines"),
];

const KUBECTL_DESCRIBE: &[ParamSpec] = &[
    ParamSpec::required("resource", ParamKind::String, "pod"),
    ParamSpec::required("name", ParamKind::String, "Object name"),
    ParamSpec::optional("namespace", ParamKind::String, Some("default"), "Namespace"),
];

const POD_HEALTH: &[ParamSpec] = &[ParamSpec::optional(
    "namespaces",
    ParamKind::List,
    Some("default"),
    "Namespaces to inspect",
)];

const SCAN_LOGS: &[ParamSpec] = &[
    ParamSpec::required("namespace", ParamKind::String, "Namespace"),
    ParamSpec::required("pod_name", ParamKind::String, "Pod name"),
    ParamSpec::optional(
        "error_patterns",
        ParamKind::List,
        Some(DEFAULT_ERROR_PATTERNS),
        "Substrings that mark a line as an error",
    ),
    ParamSpec::optional("tail", ParamKind::Integer, Some("1000"), "Number of trailing lines to scan"),
];

const DEPLOYMENT_STATUS: &[ParamSpec] = &[
    ParamSpec::required("namespace", ParamKind::String, "Namespace"),
    ParamSpec::optional("deployment_name", ParamKind::String, None, "Deployment; all when omitted"),
];

const METRIC_DATA: &[ParamSpec] = &[
    ParamSpec::required("namespace", ParamKind::String, "CloudWatch namespace"),
    ParamSpec::required("metric", ParamKind::String, "Metric name"),
    ParamSpec::required("start_time", ParamKind::Timestamp, "Window start"),
    ParamSpec::required("end_time", ParamKind::Timestamp, "Window end"),
    ParamSpec::optional("period", ParamKind::Integer, Some("300"), "Granularity in seconds"),
];

const SECURITY_FINDINGS: &[ParamSpec] = &[ParamSpec::optional(
    "finding_ids",
    ParamKind::List,
    None,
    "Finding ids to fetch; lists recent ids when omitted",
)];

const SERVICE_GRAPH: &[ParamSpec] = &[
    ParamSpec::required("start_time", ParamKind::Timestamp, "Window start"),
    ParamSpec::required("end_time", ParamKind::Timestamp, "Window end"),
];

const STREAM_METRICS: &[ParamSpec] = &[
    ParamSpec::required("stream_name", ParamKind::String, "Kinesis stream name"),
    ParamSpec::optional("hours", ParamKind::Integer, Some("1"), "Window length in hours"),
];

const OBJECT_COUNT: &[ParamSpec] = &[
    ParamSpec::required("bucket", ParamKind::String, "Bucket name"),
    ParamSpec::optional("prefix", ParamKind::String, None, "Key prefix"),
];

const JOB_STATUS: &[ParamSpec] = &[ParamSpec::optional(
    "job_name",
    ParamKind::String,
    None,
    "Glue job; the first five jobs when omitted",
)];

const CRAWLER_STATUS: &[ParamSpec] = &[ParamSpec::optional(
    "crawler_name",
    ParamKind::String,
    None,
    "Glue crawler; all crawlers when omitted",
)];

const SEND_ALERT: &[ParamSpec] = &[
    ParamSpec::required("topic_arn", ParamKind::String, "SNS topic ARN"),
    ParamSpec::required("subject", ParamKind::String, "Alert subject"),
    ParamSpec::required("message", ParamKind::String, "Alert body"),
    ParamSpec::optional("severity", ParamKind::String, Some("INFO"), "Severity label"),
];

const ANALYZE_LOGS: &[ParamSpec] = &[
    ParamSpec::required("log_group", ParamKind::String, "CloudWatch log group"),
    ParamSpec::optional("hours", ParamKind::Integer, Some("1"), "Window length in hours"),
    ParamSpec::optional(
        "error_patterns",
        ParamKind::List,
        Some(DEFAULT_ERROR_PATTERNS),
        "Substrings that mark a line as an error",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_paths_unique_within_group() {
        let mut seen = HashSet::new();
        for op in Operation::ALL {
            assert!(
                seen.insert((op.action_group(), op.api_path())),
                "duplicate path {}",
                op
            );
        }
    }

    #[test]
    fn test_action_group_round_trip() {
        for group in ActionGroup::ALL {
            assert_eq!(group.as_str().parse::<ActionGroup>().unwrap(), group);
        }
        assert!("Kubernetes-Operations".parse::<ActionGroup>().is_err());
    }

    #[test]
    fn test_defaults_only_on_optional_params() {
        for op in Operation::ALL {
            for spec in op.params() {
                assert!(
                    !(spec.required && spec.default.is_some()),
                    "{} declares a default for required {}",
                    op,
                    spec.name
                );
            }
        }
    }
}
