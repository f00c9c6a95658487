//! Cluster adapter over `kube`

use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Event, Node, Pod};
use kube::api::{Api, ListParams, LogParams};
use kube::Client;
use tracing::debug;

use ops_tools::backend::ClusterApi;

/// Talks to the API server with kubeconfig or in-cluster credentials
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Infer credentials from the environment
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default().await?;
        debug!("Kubernetes client ready");
        Ok(Self::new(client))
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn deployments(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>> {
        Ok(self.pods(namespace).list(&ListParams::default()).await?.items)
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod> {
        Ok(self.pods(namespace).get(name).await?)
    }

    async fn pod_logs(&self, namespace: &str, name: &str, tail_lines: i64) -> Result<String> {
        let params = LogParams {
            tail_lines: Some(tail_lines),
            ..Default::default()
        };
        Ok(self.pods(namespace).logs(name, &params).await?)
    }

    async fn list_pod_events(&self, namespace: &str, name: &str) -> Result<Vec<Event>> {
        let events: Api<Event> = Api::namespaced(self.client.clone(), namespace);
        let selector = format!("involvedObject.name={}", name);
        Ok(events
            .list(&ListParams::default().fields(&selector))
            .await?
            .items)
    }

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>> {
        Ok(self
            .deployments(namespace)
            .list(&ListParams::default())
            .await?
            .items)
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment> {
        Ok(self.deployments(namespace).get(name).await?)
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        Ok(nodes.list(&ListParams::default()).await?.items)
    }
}
