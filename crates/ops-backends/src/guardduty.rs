//! Security findings adapter over GuardDuty

use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_guardduty::types::Finding as SdkFinding;

use ops_tools::backend::{Finding, FindingsApi};

use crate::convert::{sdk_error, Items, Maybe, Owned};

#[derive(Clone)]
pub struct GuardDutyFindings {
    client: aws_sdk_guardduty::Client,
}

impl GuardDutyFindings {
    pub fn new(client: aws_sdk_guardduty::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FindingsApi for GuardDutyFindings {
    async fn list_detectors(&self) -> Result<Vec<String>> {
        let output = self
            .client
            .list_detectors()
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(output.detector_ids().items().to_vec())
    }

    async fn list_findings(&self, detector_id: &str, max_results: i32) -> Result<Vec<String>> {
        let output = self
            .client
            .list_findings()
            .detector_id(detector_id)
            .max_results(max_results)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(output.finding_ids().items().to_vec())
    }

    async fn get_findings(&self, detector_id: &str, finding_ids: &[String]) -> Result<Vec<Finding>> {
        let output = self
            .client
            .get_findings()
            .detector_id(detector_id)
            .set_finding_ids(Some(finding_ids.to_vec()))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(output.findings().items().iter().map(finding).collect())
    }
}

fn finding(f: &SdkFinding) -> Finding {
    Finding {
        id: f.id().owned().unwrap_or_default(),
        finding_type: f.r#type().owned(),
        severity: f.severity().owned(),
        title: f.title().owned(),
        description: f.description().owned(),
        region: f.region().owned(),
        resource_type: f
            .resource()
            .maybe()
            .and_then(|r| r.resource_type().owned()),
        created_at: f.created_at().owned(),
        updated_at: f.updated_at().owned(),
    }
}
