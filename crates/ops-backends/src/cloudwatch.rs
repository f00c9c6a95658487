//! Metrics and log query adapters over CloudWatch

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aws_sdk_cloudwatch::types::{Dimension, Statistic as SdkStatistic};
use aws_sdk_cloudwatchlogs::types::ResultField as SdkResultField;

use ops_tools::backend::{
    Datapoint, LogQuery, LogsApi, MetricQuery, MetricsApi, QueryResults, QueryStatus, ResultField,
};

use crate::convert::{from_smithy, sdk_error, to_smithy, Items, Maybe, Owned};

#[derive(Clone)]
pub struct CloudWatchMetrics {
    client: aws_sdk_cloudwatch::Client,
}

impl CloudWatchMetrics {
    pub fn new(client: aws_sdk_cloudwatch::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetricsApi for CloudWatchMetrics {
    async fn get_metric_statistics(&self, query: &MetricQuery) -> Result<Vec<Datapoint>> {
        let mut request = self
            .client
            .get_metric_statistics()
            .namespace(&query.namespace)
            .metric_name(&query.metric_name)
            .start_time(to_smithy(query.start))
            .end_time(to_smithy(query.end))
            .period(query.period_secs);

        for (name, value) in &query.dimensions {
            request = request.dimensions(dimension(name, value));
        }
        for statistic in &query.statistics {
            request = request.statistics(SdkStatistic::from(statistic.as_str()));
        }

        let output = request.send().await.map_err(sdk_error)?;
        Ok(output
            .datapoints()
            .items()
            .iter()
            .map(|d| Datapoint {
                timestamp: d.timestamp().maybe().and_then(from_smithy),
                sum: d.sum().owned(),
                average: d.average().owned(),
                maximum: d.maximum().owned(),
                minimum: d.minimum().owned(),
                sample_count: d.sample_count().owned(),
                unit: d.unit().maybe().map(|u| u.as_str().to_string()),
            })
            .collect())
    }
}

#[derive(Clone)]
pub struct CloudWatchLogs {
    client: aws_sdk_cloudwatchlogs::Client,
}

impl CloudWatchLogs {
    pub fn new(client: aws_sdk_cloudwatchlogs::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LogsApi for CloudWatchLogs {
    async fn start_query(&self, query: &LogQuery) -> Result<String> {
        let output = self
            .client
            .start_query()
            .log_group_name(&query.log_group)
            .start_time(query.start.timestamp())
            .end_time(query.end.timestamp())
            .query_string(&query.query)
            .send()
            .await
            .map_err(sdk_error)?;

        output
            .query_id()
            .owned()
            .ok_or_else(|| anyhow!("StartQuery returned no query id"))
    }

    async fn get_query_results(&self, query_id: &str) -> Result<QueryResults> {
        let output = self
            .client
            .get_query_results()
            .query_id(query_id)
            .send()
            .await
            .map_err(sdk_error)?;

        let status = output
            .status()
            .maybe()
            .map(|s| query_status(s.as_str()))
            .unwrap_or(QueryStatus::Unknown);
        let rows = output
            .results()
            .items()
            .iter()
            .map(|row| row.iter().filter_map(result_field).collect())
            .collect();

        Ok(QueryResults { status, rows })
    }
}

fn dimension(name: &str, value: &str) -> Dimension {
    Dimension::builder().name(name).value(value).build()
}

fn result_field(field: &SdkResultField) -> Option<ResultField> {
    Some(ResultField {
        field: field.field().owned()?,
        value: field.value().owned().unwrap_or_default(),
    })
}

fn query_status(status: &str) -> QueryStatus {
    match status {
        "Scheduled" => QueryStatus::Scheduled,
        "Running" => QueryStatus::Running,
        "Complete" => QueryStatus::Complete,
        "Failed" => QueryStatus::Failed,
        "Cancelled" => QueryStatus::Cancelled,
        "Timeout" => QueryStatus::Timeout,
        _ => QueryStatus::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_status_mapping() {
        assert_eq!(query_status("Complete"), QueryStatus::Complete);
        assert_eq!(query_status("Timeout"), QueryStatus::Timeout);
        assert_eq!(query_status("Paused"), QueryStatus::Unknown);
    }

    #[test]
    fn test_dimension_carries_pair() {
        let dim = dimension("StreamName", "events");
        assert_eq!(dim.name(), Some("StreamName"));
        assert_eq!(dim.value(), Some("events"));
    }

    #[test]
    fn test_result_field_requires_name() {
        let field = SdkResultField::builder().field("@message").value("ERROR x").build();
        assert_eq!(
            result_field(&field),
            Some(ResultField::new("@message", "ERROR x"))
        );
        let unnamed = SdkResultField::builder().value("orphan").build();
        assert_eq!(result_field(&unnamed), None);
    }
}
