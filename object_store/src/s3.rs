//! S3-backed `ObjectStore`: the production backend for `storage: S3` jobs.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::{error::ObjectStoreError, ObjectMeta, ObjectStore};

#[derive(Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    /// Builds a client from the ambient AWS config (endpoint, region, and
    /// credentials are all environment-driven, per `spec.md` §6's storage
    /// env vars) plus any overrides the caller applies to `loader` before
    /// calling this.
    pub async fn from_env() -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(aws_sdk_s3::Client::new(&config))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Bytes) -> Result<(), ObjectStoreError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| ObjectStoreError::Put(e.to_string()))?;
        Ok(())
    }

    async fn signed_url(&self, bucket: &str, key: &str, ttl_days: u32) -> Result<String, ObjectStoreError> {
        let expires_in = Duration::from_secs(u64::from(ttl_days) * 24 * 60 * 60);
        let presigning_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| ObjectStoreError::Presign(e.to_string()))?;
        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| ObjectStoreError::Presign(e.to_string()))?;
        Ok(presigned.uri().to_string())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, ObjectStoreError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|_| ObjectStoreError::NotFound(bucket.to_string(), key.to_string()))?;
        let data = output
            .body
            .collect()
            .await
            .map_err(|e| ObjectStoreError::Put(e.to_string()))?;
        Ok(data.into_bytes())
    }

    async fn list(&self, bucket: &str) -> Result<Vec<ObjectMeta>, ObjectStoreError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Put(e.to_string()))?;
        Ok(output
            .contents()
            .iter()
            .filter_map(|obj| {
                let key = obj.key()?.to_string();
                let last_modified: DateTime<Utc> = obj
                    .last_modified()
                    .and_then(|dt| DateTime::from_timestamp(dt.secs(), 0))
                    .unwrap_or_else(Utc::now);
                Some(ObjectMeta { key, last_modified })
            })
            .collect())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Put(e.to_string()))?;
        Ok(())
    }
}
