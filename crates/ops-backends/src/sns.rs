//! Notification adapter over SNS

use anyhow::Result;
use async_trait::async_trait;

use ops_tools::backend::NotificationApi;

use crate::convert::{sdk_error, Owned};

#[derive(Clone)]
pub struct SnsNotifier {
    client: aws_sdk_sns::Client,
}

impl SnsNotifier {
    pub fn new(client: aws_sdk_sns::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NotificationApi for SnsNotifier {
    async fn publish(&self, topic_arn: &str, subject: &str, message: &str) -> Result<String> {
        let output = self
            .client
            .publish()
            .topic_arn(topic_arn)
            .subject(subject)
            .message(message)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(output.message_id().owned().unwrap_or_default())
    }
}
