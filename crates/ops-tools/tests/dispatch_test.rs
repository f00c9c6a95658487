//! End-to-end dispatch through the router against stub backends

use ops_core::{ActionInvocation, ActionResponse};
use ops_tools::backend::ObjectEntry;
use ops_tools::stub::StubBackends;
use ops_tools::{ActionRouter, Operation, RouterConfig};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn router_with(stub: StubBackends) -> ActionRouter {
    let (_, backends) = stub.into_backends();
    ActionRouter::new(backends, RouterConfig::new("prod-eks"))
}

/// Minimal parameters satisfying each operation's contract
fn sample_invocation(op: Operation) -> ActionInvocation {
    let inv = ActionInvocation::new(op.action_group().as_str(), op.api_path());
    match op {
        Operation::KubectlGet => inv.with_param("resource", "pods"),
        Operation::KubectlLogs => inv.with_param("pod", "web-1"),
        Operation::KubectlDescribe => inv.with_param("resource", "pod").with_param("name", "web-1"),
        Operation::ScanLogs => inv
            .with_param("namespace", "default")
            .with_param("pod_name", "web-1"),
        Operation::DeploymentStatus => inv.with_param("namespace", "default"),
        Operation::MetricData => inv
            .with_param("namespace", "AWS/EC2")
            .with_param("metric", "CPUUtilization")
            .with_param("start_time", "2024-06-01T00:00:00Z")
            .with_param("end_time", "2024-06-01T06:00:00Z"),
        Operation::ServiceGraph => inv
            .with_param("start_time", "2024-06-01T00:00:00")
            .with_param("end_time", "2024-06-01T01:00:00"),
        Operation::StreamMetrics => inv.with_param("stream_name", "events"),
        Operation::ObjectCount => inv.with_param("bucket", "datalake-raw"),
        Operation::SendAlert => inv
            .with_param("topic_arn", "arn:aws:sns:us-gov-west-1:123456789012:ops")
            .with_param("subject", "test")
            .with_param("message", "hello"),
        Operation::AnalyzeLogs => inv.with_param("log_group", "/aws/eks/prod/application"),
        Operation::PodHealth
        | Operation::NodeResources
        | Operation::SecurityFindings
        | Operation::JobStatus
        | Operation::CrawlerStatus
        | Operation::ClusterHealth
        | Operation::ListTools => inv,
    }
}

fn body(response: &ActionResponse) -> Value {
    response.body_json().unwrap()
}

/// Object whose keys document an operation's normalized shape: the body
/// itself, or the first element of a list body
fn shape_record(op: Operation, body: &Value) -> Value {
    match op {
        Operation::PodHealth => body["default"].clone(),
        Operation::MetricData => body["datapoints"][0].clone(),
        Operation::ServiceGraph => body["services"][0].clone(),
        Operation::DeploymentStatus
        | Operation::NodeResources
        | Operation::JobStatus
        | Operation::CrawlerStatus => body[0].clone(),
        _ => body.clone(),
    }
}

fn expected_keys(op: Operation) -> &'static [&'static str] {
    match op {
        Operation::KubectlGet => &["pods"],
        Operation::KubectlLogs => &["logs"],
        Operation::KubectlDescribe => &["pod", "events"],
        Operation::PodHealth => &["total", "running", "pending", "failed", "pods"],
        Operation::ScanLogs => &["pod", "namespace", "error_count", "errors"],
        Operation::DeploymentStatus => &[
            "name",
            "namespace",
            "replicas",
            "ready_replicas",
            "available_replicas",
            "unavailable_replicas",
            "conditions",
        ],
        Operation::NodeResources => &["name", "capacity", "allocatable", "conditions"],
        Operation::MetricData => &["timestamp", "average", "maximum", "unit"],
        Operation::SecurityFindings => &["finding_ids"],
        Operation::ServiceGraph => &["reference_id", "name", "names", "type", "state", "root", "edges"],
        Operation::StreamMetrics => &[
            "stream_name",
            "time_range_hours",
            "records_sent",
            "bytes_sent",
            "put_success",
            "get_success",
        ],
        Operation::ObjectCount => &["bucket", "prefix", "object_count", "total_size_bytes", "total_size_gb"],
        Operation::JobStatus => &[
            "job_name",
            "run_id",
            "state",
            "started",
            "completed",
            "execution_time",
            "error_message",
        ],
        Operation::CrawlerStatus => &["name", "state", "last_crawl", "tables_created", "tables_updated"],
        Operation::SendAlert => &["status", "topic", "message_id"],
        Operation::AnalyzeLogs => &["log_group", "error_count", "errors"],
        Operation::ClusterHealth => &["cluster_name", "node_count", "failed_nodes", "healthy"],
        Operation::ListTools => &["kubernetes", "data_pipeline", "monitoring", "security"],
    }
}

#[tokio::test]
async fn every_operation_returns_documented_shape() {
    let router = router_with(StubBackends::sample());

    for op in Operation::ALL {
        let response = router.respond(&sample_invocation(op)).await;
        assert_eq!(response.status_code(), 200, "{}", op);
        assert_eq!(response.message_version, "1.0");
        assert_eq!(response.response.http_method, "POST");
        assert_eq!(response.response.api_path, op.api_path());
        let body = body(&response);
        assert!(body.get("error").is_none(), "{} failed: {}", op, body);

        let record = shape_record(op, &body);
        let record = record
            .as_object()
            .unwrap_or_else(|| panic!("{} has no record in {}", op, body));
        for key in expected_keys(op) {
            assert!(record.contains_key(*key), "{} lacks `{}`: {}", op, key, body);
        }
    }
}

#[tokio::test]
async fn oversized_hours_is_invalid_parameter_envelope() {
    let router = router_with(StubBackends::sample());
    let invocations = [
        ActionInvocation::new("aws-operations", "/kinesis/get-metrics")
            .with_param("stream_name", "events")
            .with_param("hours", "10000000000"),
        ActionInvocation::new("aws-operations", "/cloudwatch/analyze-logs")
            .with_param("log_group", "/aws/eks/prod/application")
            .with_param("hours", i64::MAX.to_string()),
    ];

    for invocation in invocations {
        let response = router.respond(&invocation).await;
        assert_eq!(response.status_code(), 200);
        let error = body(&response)["error"].as_str().unwrap().to_string();
        assert!(error.starts_with("Invalid parameter hours"), "{}", error);
    }
}

#[tokio::test]
async fn unknown_path_names_path_in_error() {
    let router = router_with(StubBackends::sample());
    let response = router
        .respond(&ActionInvocation::new("kubernetes-operations", "/kubectl/delete"))
        .await;

    assert_eq!(response.status_code(), 200);
    let error = body(&response)["error"].as_str().unwrap().to_string();
    assert!(error.contains("/kubectl/delete"), "{}", error);
}

#[tokio::test]
async fn unknown_action_group_is_reported() {
    let router = router_with(StubBackends::sample());
    let response = router
        .respond(&ActionInvocation::new("database-operations", "/tools/list"))
        .await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(
        body(&response)["error"],
        "Unknown action group database-operations for operation /tools/list"
    );
}

#[tokio::test]
async fn missing_parameter_is_named() {
    let router = router_with(StubBackends::sample());
    let response = router
        .respond(&ActionInvocation::new("aws-operations", "/s3/get-object-count"))
        .await;

    assert_eq!(response.status_code(), 200);
    let error = body(&response)["error"].as_str().unwrap().to_string();
    assert!(error.contains("bucket"), "{}", error);
}

#[tokio::test]
async fn invalid_parameter_is_named() {
    let router = router_with(StubBackends::sample());
    let invocation = ActionInvocation::new("kubernetes-operations", "/kubectl/logs")
        .with_param("pod", "web-1")
        .with_param("tail", "many");
    let response = router.respond(&invocation).await;

    assert_eq!(response.status_code(), 200);
    let error = body(&response)["error"].as_str().unwrap().to_string();
    assert!(error.contains("tail"), "{}", error);
}

#[tokio::test]
async fn backend_failure_is_500_with_verbatim_message() {
    let message = "An error occurred (AccessDeniedException) when calling ListDetectors";
    let router = router_with(StubBackends::sample().fail_with(message));
    let response = router
        .respond(&ActionInvocation::new("aws-operations", "/guardduty/get-findings"))
        .await;

    assert_eq!(response.status_code(), 500);
    assert_eq!(body(&response), json!({ "error": message }));
}

#[tokio::test]
async fn unsupported_resource_is_200_with_error() {
    let router = router_with(StubBackends::sample());
    let invocation = ActionInvocation::new("kubernetes-operations", "/kubectl/describe")
        .with_param("resource", "node")
        .with_param("name", "ip-10-0-1-10");
    let response = router.respond(&invocation).await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(
        body(&response),
        json!({ "error": "Unsupported resource type: node" })
    );
}

#[tokio::test]
async fn pod_health_example() {
    let router = router_with(StubBackends::sample());
    let invocation = ActionInvocation::new("kubernetes-operations", "/kubectl/pod-health")
        .with_param("namespaces", "[\"default\"]");
    let response = router.respond(&invocation).await;

    assert_eq!(
        body(&response),
        json!({
            "default": {
                "total": 3,
                "running": 2,
                "pending": 1,
                "failed": 0,
                "pods": [
                    {"name": "web-1", "status": "Running", "ready": 1, "restarts": 0},
                    {"name": "web-2", "status": "Running", "ready": 2, "restarts": 2},
                    {"name": "worker-1", "status": "Pending", "ready": 0, "restarts": 0}
                ]
            }
        })
    );
}

#[tokio::test]
async fn scan_logs_caps_errors_but_counts_all() {
    let mut stub = StubBackends::sample();
    let logs: Vec<String> = (0..75).map(|i| format!("ERROR failure {}", i)).collect();
    stub.logs.insert("noisy".into(), logs.join("\n"));
    let router = router_with(stub);

    let invocation = ActionInvocation::new("kubernetes-operations", "/kubectl/probe-logs")
        .with_param("namespace", "default")
        .with_param("pod_name", "noisy");
    let body = body(&router.respond(&invocation).await);

    assert_eq!(body["error_count"], 75);
    assert_eq!(body["errors"].as_array().unwrap().len(), 50);
    assert_eq!(body["pod"], "noisy");
}

#[tokio::test]
async fn object_count_sums_across_pages() {
    let gib = 1024 * 1024 * 1024;
    let stub = StubBackends::sample().with_object_pages(vec![
        vec![
            ObjectEntry { key: "bronze/a".into(), size: gib },
            ObjectEntry { key: "silver/x".into(), size: 7 },
        ],
        vec![ObjectEntry { key: "bronze/b".into(), size: gib / 4 }],
        vec![ObjectEntry { key: "bronze/c".into(), size: gib / 4 }],
    ]);
    let router = router_with(stub);

    let invocation = ActionInvocation::new("aws-operations", "/s3/get-object-count")
        .with_param("bucket", "datalake-raw")
        .with_param("prefix", "bronze/");
    let body = body(&router.respond(&invocation).await);

    assert_eq!(
        body,
        json!({
            "bucket": "datalake-raw",
            "prefix": "bronze/",
            "object_count": 3,
            "total_size_bytes": gib + gib / 2,
            "total_size_gb": 1.5
        })
    );
}

#[tokio::test]
async fn analyze_logs_returns_rows_as_maps() {
    let (stub, backends) = StubBackends::sample().into_backends();
    let router = ActionRouter::new(backends, RouterConfig::new("prod-eks"));

    let invocation = ActionInvocation::new("aws-operations", "/cloudwatch/analyze-logs")
        .with_param("log_group", "/aws/eks/prod/application")
        .with_param("error_patterns", "OOMKilled");
    let body = body(&router.respond(&invocation).await);

    assert_eq!(body["error_count"], 1);
    assert_eq!(body["errors"][0]["@message"], "ERROR upstream timeout");
    let queries = stub.started_queries().await;
    assert!(queries[0].query.contains("@message like /OOMKilled/"));
    assert_eq!((queries[0].end - queries[0].start).num_hours(), 1);
}

#[tokio::test]
async fn tools_list_groups_by_category() {
    let router = router_with(StubBackends::sample());
    let body = body(&router.respond(&ActionInvocation::new("aws-operations", "/tools/list")).await);

    let total: usize = ["kubernetes", "data_pipeline", "monitoring", "security"]
        .iter()
        .map(|c| body[c].as_array().unwrap().len())
        .sum();
    assert_eq!(total, Operation::ALL.len());
    assert_eq!(body["security"][0]["name"], "get_guardduty_findings");
}
