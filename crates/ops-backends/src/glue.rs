//! ETL job and crawler adapter over Glue

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aws_sdk_glue::types::{Crawler, JobRun};
use std::collections::HashMap;

use ops_tools::backend::{CrawlerRecord, EtlApi, JobRunRecord};

use crate::convert::{from_smithy, sdk_error, Items, Maybe, Owned};

#[derive(Clone)]
pub struct GlueJobs {
    client: aws_sdk_glue::Client,
}

impl GlueJobs {
    pub fn new(client: aws_sdk_glue::Client) -> Self {
        Self { client }
    }

    /// `(tables_created, tables_updated)` of the last crawl, keyed by crawler
    async fn crawler_table_counts(&self, names: Vec<String>) -> Result<HashMap<String, (i32, i32)>> {
        if names.is_empty() {
            return Ok(HashMap::new());
        }

        let output = self
            .client
            .get_crawler_metrics()
            .set_crawler_name_list(Some(names))
            .send()
            .await
            .map_err(sdk_error)?;

        Ok(output
            .crawler_metrics_list()
            .items()
            .iter()
            .filter_map(|m| {
                let name: String = m.crawler_name().owned()?;
                let created = m.tables_created().owned().unwrap_or(0);
                let updated = m.tables_updated().owned().unwrap_or(0);
                Some((name, (created, updated)))
            })
            .collect())
    }

    async fn crawler_records(&self, crawlers: &[Crawler]) -> Result<Vec<CrawlerRecord>> {
        let names = crawlers.iter().filter_map(|c| c.name().owned()).collect();
        let counts = self.crawler_table_counts(names).await?;

        Ok(crawlers
            .iter()
            .map(|c| {
                let name: String = c.name().owned().unwrap_or_default();
                let (tables_created, tables_updated) = counts.get(&name).copied().unwrap_or((0, 0));
                CrawlerRecord {
                    state: c.state().maybe().map(|s| s.as_str().to_string()),
                    last_crawl_status: c
                        .last_crawl()
                        .maybe()
                        .and_then(|l| l.status().maybe())
                        .map(|s| s.as_str().to_string()),
                    tables_created,
                    tables_updated,
                    name,
                }
            })
            .collect())
    }
}

#[async_trait]
impl EtlApi for GlueJobs {
    async fn list_jobs(&self) -> Result<Vec<String>> {
        let output = self.client.get_jobs().send().await.map_err(sdk_error)?;
        Ok(output
            .jobs()
            .items()
            .iter()
            .filter_map(|j| j.name().owned())
            .collect())
    }

    async fn job_runs(&self, job_name: &str, max_results: i32) -> Result<Vec<JobRunRecord>> {
        let output = self
            .client
            .get_job_runs()
            .job_name(job_name)
            .max_results(max_results)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(output.job_runs().items().iter().map(job_run).collect())
    }

    async fn get_crawler(&self, name: &str) -> Result<CrawlerRecord> {
        let output = self
            .client
            .get_crawler()
            .name(name)
            .send()
            .await
            .map_err(sdk_error)?;
        let crawler = output
            .crawler()
            .maybe()
            .cloned()
            .ok_or_else(|| anyhow!("Crawler {} not found", name))?;

        self.crawler_records(&[crawler])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Crawler {} not found", name))
    }

    async fn list_crawlers(&self) -> Result<Vec<CrawlerRecord>> {
        let output = self.client.get_crawlers().send().await.map_err(sdk_error)?;
        self.crawler_records(output.crawlers().items()).await
    }
}

fn job_run(r: &JobRun) -> JobRunRecord {
    JobRunRecord {
        job_name: r.job_name().owned().unwrap_or_default(),
        run_id: r.id().owned().unwrap_or_default(),
        state: r.job_run_state().maybe().map(|s| s.as_str().to_string()),
        started_on: r.started_on().maybe().and_then(from_smithy),
        completed_on: r.completed_on().maybe().and_then(from_smithy),
        execution_time: r.execution_time().owned().unwrap_or(0),
        error_message: r.error_message().owned(),
    }
}
