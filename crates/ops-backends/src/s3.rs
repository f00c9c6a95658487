//! Object listing adapter over S3

use anyhow::Result;
use async_trait::async_trait;

use ops_tools::backend::{ObjectEntry, ObjectPage, ObjectStoreApi};

use crate::convert::{sdk_error, Items, Owned};

#[derive(Clone)]
pub struct S3Objects {
    client: aws_sdk_s3::Client,
}

impl S3Objects {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStoreApi for S3Objects {
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(sdk_error)?;

        let objects = output
            .contents()
            .items()
            .iter()
            .map(|o| ObjectEntry {
                key: o.key().owned().unwrap_or_default(),
                size: o.size().owned().unwrap_or(0).max(0) as u64,
            })
            .collect();

        Ok(ObjectPage {
            objects,
            next_continuation_token: output.next_continuation_token().owned(),
        })
    }
}
