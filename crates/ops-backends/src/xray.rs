//! Service graph adapter over X-Ray

use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_xray::types::{Edge, Service};
use chrono::{DateTime, Utc};

use ops_tools::backend::{ServiceEdge, ServiceNode, TraceApi};

use crate::convert::{from_smithy, sdk_error, to_smithy, Items, Maybe, Owned};

#[derive(Clone)]
pub struct XRayTraces {
    client: aws_sdk_xray::Client,
}

impl XRayTraces {
    pub fn new(client: aws_sdk_xray::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TraceApi for XRayTraces {
    async fn get_service_graph(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ServiceNode>> {
        let output = self
            .client
            .get_service_graph()
            .start_time(to_smithy(start))
            .end_time(to_smithy(end))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(output.services().items().iter().map(service_node).collect())
    }
}

fn service_node(s: &Service) -> ServiceNode {
    ServiceNode {
        reference_id: s.reference_id().owned(),
        name: s.name().owned(),
        names: s.names().items().to_vec(),
        service_type: s.r#type().owned(),
        state: s.state().owned(),
        root: s.root().owned(),
        edges: s.edges().items().iter().map(service_edge).collect(),
    }
}

fn service_edge(e: &Edge) -> ServiceEdge {
    ServiceEdge {
        reference_id: e.reference_id().owned(),
        start_time: e.start_time().maybe().and_then(from_smithy),
        end_time: e.end_time().maybe().and_then(from_smithy),
    }
}
