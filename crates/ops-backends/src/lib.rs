//! ops-backends: Production adapters for the backend ports
//!
//! # Modules
//!
//! - `cluster`: Kubernetes API over the `kube` client
//! - `cloudwatch`: metric statistics and Logs Insights queries
//! - `guardduty`: detectors and findings
//! - `xray`: service graph
//! - `s3`: prefix listings
//! - `glue`: job runs and crawlers
//! - `sns`: topic publishing

pub mod cloudwatch;
pub mod cluster;
mod convert;
pub mod glue;
pub mod guardduty;
pub mod s3;
pub mod sns;
pub mod xray;

use anyhow::Result;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use std::sync::Arc;
use tracing::info;

use ops_core::Settings;
use ops_tools::Backends;

pub use cloudwatch::{CloudWatchLogs, CloudWatchMetrics};
pub use glue::GlueJobs;
pub use guardduty::GuardDutyFindings;
pub use cluster::KubeCluster;
pub use s3::S3Objects;
pub use sns::SnsNotifier;
pub use xray::XRayTraces;

/// Shared SDK configuration for the configured region
pub async fn load_aws_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await
}

/// Build every production adapter from one SDK config and a cluster client
pub fn from_config(sdk_config: &SdkConfig, cluster: KubeCluster) -> Backends {
    Backends {
        cluster: Arc::new(cluster),
        metrics: Arc::new(CloudWatchMetrics::new(aws_sdk_cloudwatch::Client::new(sdk_config))),
        logs: Arc::new(CloudWatchLogs::new(aws_sdk_cloudwatchlogs::Client::new(sdk_config))),
        findings: Arc::new(GuardDutyFindings::new(aws_sdk_guardduty::Client::new(sdk_config))),
        traces: Arc::new(XRayTraces::new(aws_sdk_xray::Client::new(sdk_config))),
        objects: Arc::new(S3Objects::new(aws_sdk_s3::Client::new(sdk_config))),
        etl: Arc::new(GlueJobs::new(aws_sdk_glue::Client::new(sdk_config))),
        notifications: Arc::new(SnsNotifier::new(aws_sdk_sns::Client::new(sdk_config))),
    }
}

/// Connect to the cluster and the AWS services in the configured region
pub async fn connect(settings: &Settings) -> Result<Backends> {
    let sdk_config = load_aws_config(&settings.aws_region).await;
    let cluster = KubeCluster::try_default().await?;
    info!(region = %settings.aws_region, "Backends connected");
    Ok(from_config(&sdk_config, cluster))
}
