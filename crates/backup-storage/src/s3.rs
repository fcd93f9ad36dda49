//! S3-compatible destination
//!
//! Implements [`Blob`] against any S3-compatible object store via
//! `aws-sdk-s3`. Uploads stream from the source's `AsyncRead` without
//! buffering the whole object in memory.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::StorageClass;
use aws_sdk_s3::Client;
use aws_smithy_types::body::SdkBody;
use backup_core::ports::blob::{Blob, BodyStream, HeadResult};
use futures_util::TryStreamExt;
use http_body::Frame;
use http_body_util::StreamBody;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// S3-compatible destination, scoped to one bucket and key prefix.
pub struct S3Blob {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3Blob {
    /// Construct from an already-configured `aws-sdk-s3` client.
    pub fn new(client: Client, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    /// Build a client from the default AWS credential chain (environment,
    /// profile, IMDS), optionally pointed at a custom endpoint for
    /// S3-compatible stores.
    pub async fn from_env(
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        region: Option<String>,
        endpoint_url: Option<String>,
    ) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_sdk_s3::config::Region::new(region));
        }
        if let Some(endpoint) = endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let config = loader.load().await;
        let client = Client::new(&config);
        Self::new(client, bucket, prefix)
    }

    fn full_key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.prefix.trim_end_matches('/'), key)
        }
    }
}

#[async_trait]
impl Blob for S3Blob {
    async fn head(&self, key: &str) -> anyhow::Result<HeadResult> {
        let full_key = self.full_key(key);
        debug!(bucket = %self.bucket, key = %full_key, "head");

        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let size = output.content_length().unwrap_or(0).max(0) as u64;
                let metadata = output.metadata().cloned().unwrap_or_default();
                Ok(HeadResult::Present { size, metadata })
            }
            Err(SdkError::ServiceError(e)) if matches!(e.err(), HeadObjectError::NotFound(_)) => {
                Ok(HeadResult::Absent)
            }
            Err(e) => Err(anyhow::anyhow!("S3 head_object failed: {e}")),
        }
    }

    async fn put(
        &self,
        key: &str,
        body: BodyStream,
        size: u64,
        content_type: &str,
        metadata: HashMap<String, String>,
        storage_class: Option<&str>,
    ) -> anyhow::Result<()> {
        let full_key = self.full_key(key);
        debug!(bucket = %self.bucket, key = %full_key, size, "put");

        let stream = ReaderStream::new(body)
            .map_ok(Frame::data)
            .map_err(std::io::Error::other);
        let sdk_body = SdkBody::from_body_1_x(StreamBody::new(stream));
        let byte_stream = ByteStream::new(sdk_body);

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .body(byte_stream)
            .content_length(size as i64)
            .content_type(content_type)
            .set_metadata(Some(metadata));

        if let Some(class) = storage_class {
            let class = StorageClass::from(class);
            request = request.storage_class(class);
        }

        request
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("S3 put_object failed: {e}"))?;

        Ok(())
    }

    async fn put_json(&self, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
        let full_key = self.full_key(key);
        let bytes = serde_json::to_vec_pretty(value)?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .body(ByteStream::from(bytes))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("S3 put_object (json) failed: {e}"))?;

        Ok(())
    }

    async fn get_json(&self, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
        let full_key = self.full_key(key);

        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let bytes = output.body.collect().await?.into_bytes();
                let value = serde_json::from_slice(&bytes)?;
                Ok(Some(value))
            }
            Err(SdkError::ServiceError(e)) if matches!(e.err(), GetObjectError::NoSuchKey(_)) => {
                Ok(None)
            }
            Err(e) => Err(anyhow::anyhow!("S3 get_object failed: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> Client {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new("us-east-1"))
            .credentials_provider(aws_credential_types::Credentials::new(
                "a", "b", None, None, "t",
            ))
            .build();
        Client::from_conf(config)
    }

    #[test]
    fn test_full_key_with_prefix() {
        let blob = S3Blob::new(test_client(), "bucket", "backups/onedrive");
        assert_eq!(blob.full_key("alice/file.txt"), "backups/onedrive/alice/file.txt");
    }

    #[test]
    fn test_full_key_without_prefix() {
        let blob = S3Blob::new(test_client(), "bucket", "");
        assert_eq!(blob.full_key("alice/file.txt"), "alice/file.txt");
    }
}
