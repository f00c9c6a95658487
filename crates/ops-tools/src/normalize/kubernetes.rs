//! Kubernetes response shapes

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Event, Node, Pod};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use serde::Serialize;
use std::collections::BTreeMap;

use super::MAX_REPORTED_ERRORS;

/// Raw object output of `/kubectl/get`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectListing {
    Pod(Box<Pod>),
    Pods(Vec<Pod>),
    Deployment(Box<Deployment>),
    Deployments(Vec<Deployment>),
}

#[derive(Debug, Clone, Serialize)]
pub struct PodLogs {
    pub logs: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PodDescription {
    pub pod: Pod,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodSummary {
    pub name: Option<String>,
    pub status: Option<String>,
    pub ready: usize,
    pub restarts: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamespaceHealth {
    pub total: usize,
    pub running: usize,
    pub pending: usize,
    pub failed: usize,
    pub pods: Vec<PodSummary>,
}

/// Phase counts and per-pod readiness for one namespace
pub fn namespace_health(pods: &[Pod]) -> NamespaceHealth {
    let phase_count =
        |phase: &str| pods.iter().filter(|p| pod_phase(p) == Some(phase)).count();

    NamespaceHealth {
        total: pods.len(),
        running: phase_count("Running"),
        pending: phase_count("Pending"),
        failed: phase_count("Failed"),
        pods: pods.iter().map(pod_summary).collect(),
    }
}

fn pod_phase(pod: &Pod) -> Option<&str> {
    pod.status.as_ref()?.phase.as_deref()
}

fn pod_summary(pod: &Pod) -> PodSummary {
    let statuses = pod
        .status
        .as_ref()
        .and_then(|s| s.container_statuses.as_deref())
        .unwrap_or_default();

    PodSummary {
        name: pod.metadata.name.clone(),
        status: pod_phase(pod).map(str::to_string),
        ready: statuses.iter().filter(|c| c.ready).count(),
        restarts: statuses.iter().map(|c| c.restart_count).sum(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogScan {
    pub pod: String,
    pub namespace: String,
    pub error_count: usize,
    pub errors: Vec<String>,
}

/// Lines containing any of `patterns` as a plain substring.
///
/// `errors` keeps the first [`MAX_REPORTED_ERRORS`] matches while
/// `error_count` reports every match.
pub fn scan_logs(pod: &str, namespace: &str, logs: &str, patterns: &[String]) -> LogScan {
    let matches: Vec<&str> = logs
        .split('\n')
        .filter(|line| patterns.iter().any(|p| line.contains(p.as_str())))
        .collect();

    LogScan {
        pod: pod.to_string(),
        namespace: namespace.to_string(),
        error_count: matches.len(),
        errors: matches
            .into_iter()
            .take(MAX_REPORTED_ERRORS)
            .map(str::to_string)
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentCondition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentSummary {
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub replicas: i32,
    pub ready_replicas: i32,
    pub available_replicas: i32,
    pub unavailable_replicas: i32,
    pub conditions: Vec<DeploymentCondition>,
}

pub fn deployment_summary(deployment: &Deployment) -> DeploymentSummary {
    let status = deployment.status.clone().unwrap_or_default();

    DeploymentSummary {
        name: deployment.metadata.name.clone(),
        namespace: deployment.metadata.namespace.clone(),
        replicas: deployment
            .spec
            .as_ref()
            .and_then(|s| s.replicas)
            .unwrap_or(0),
        ready_replicas: status.ready_replicas.unwrap_or(0),
        available_replicas: status.available_replicas.unwrap_or(0),
        unavailable_replicas: status.unavailable_replicas.unwrap_or(0),
        conditions: status
            .conditions
            .unwrap_or_default()
            .into_iter()
            .map(|c| DeploymentCondition {
                condition_type: c.type_,
                status: c.status,
                reason: c.reason,
            })
            .collect(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceSet {
    pub cpu: Option<String>,
    pub memory: Option<String>,
    pub pods: Option<String>,
}

impl ResourceSet {
    fn from_quantities(quantities: Option<&BTreeMap<String, Quantity>>) -> Self {
        let get = |key: &str| quantities.and_then(|q| q.get(key)).map(|q| q.0.clone());
        Self {
            cpu: get("cpu"),
            memory: get("memory"),
            pods: get("pods"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeCondition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSummary {
    pub name: Option<String>,
    pub capacity: ResourceSet,
    pub allocatable: ResourceSet,
    pub conditions: Vec<NodeCondition>,
}

pub fn node_summary(node: &Node) -> NodeSummary {
    let status = node.status.as_ref();

    NodeSummary {
        name: node.metadata.name.clone(),
        capacity: ResourceSet::from_quantities(status.and_then(|s| s.capacity.as_ref())),
        allocatable: ResourceSet::from_quantities(status.and_then(|s| s.allocatable.as_ref())),
        conditions: status
            .and_then(|s| s.conditions.as_deref())
            .unwrap_or_default()
            .iter()
            .map(|c| NodeCondition {
                condition_type: c.type_.clone(),
                status: c.status.clone(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::{deployment, node, pod};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_namespace_health_counts() {
        let pods = vec![
            pod("a", "Running", &[true, true], &[1, 2]),
            pod("b", "Pending", &[false], &[0]),
            pod("c", "Failed", &[], &[]),
        ];
        let health = namespace_health(&pods);
        assert_eq!(health.total, 3);
        assert_eq!((health.running, health.pending, health.failed), (1, 1, 1));
        assert_eq!(
            health.pods[0],
            PodSummary {
                name: Some("a".into()),
                status: Some("Running".into()),
                ready: 2,
                restarts: 3,
            }
        );
        assert_eq!(health.pods[2].ready, 0);
        assert_eq!(health.pods[2].restarts, 0);
    }

    #[test]
    fn test_scan_caps_reported_lines() {
        let logs: String = (0..120)
            .map(|i| format!("line {} ERROR boom\nline {} ok\n", i, i))
            .collect();
        let scan = scan_logs("web", "default", &logs, &["ERROR".to_string()]);
        assert_eq!(scan.error_count, 120);
        assert_eq!(scan.errors.len(), MAX_REPORTED_ERRORS);
        assert_eq!(scan.errors[0], "line 0 ERROR boom");
    }

    #[test]
    fn test_scan_is_case_sensitive_substring() {
        let logs = "error lower\nFATAL upper\nNullPointerException thrown";
        let patterns = vec!["ERROR".to_string(), "FATAL".to_string(), "Exception".to_string()];
        let scan = scan_logs("web", "default", logs, &patterns);
        assert_eq!(scan.error_count, 2);
    }

    #[test]
    fn test_deployment_missing_counts_are_zero() {
        let dep = deployment("api", "prod", 3, None);
        let summary = deployment_summary(&dep);
        assert_eq!(summary.replicas, 3);
        assert_eq!(summary.ready_replicas, 0);
        assert_eq!(summary.unavailable_replicas, 0);
        assert!(summary.conditions.is_empty());
    }

    #[test]
    fn test_node_summary() {
        let summary = node_summary(&node("ip-10-0-0-1", "4", "16Gi", "110"));
        assert_eq!(summary.capacity.cpu.as_deref(), Some("4"));
        assert_eq!(summary.allocatable.pods.as_deref(), Some("110"));
        assert_eq!(summary.conditions[0].condition_type, "Ready");
    }
}
