//! The Object Store: an optional large-artifact sink returning
//! time-bounded signed URLs, per `spec.md` §2/§6.
//!
//! Two backends: [`LocalObjectStore`] writes to a directory on disk and
//! hands back a `file://` URL (used when a deployment's `storage` header
//! defaults to `Local` but still wants a uniform signed-URL contract for
//! tests), and [`S3ObjectStore`] writes to a real bucket and presigns a
//! time-bounded `https://` URL via `aws-sdk-s3`, pinned to the same
//! version the pack's `golemcloud-golem` blob storage layer uses.

mod error;
mod local;
mod s3;

pub use error::ObjectStoreError;
pub use local::LocalObjectStore;
pub use s3::S3ObjectStore;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// One stored blob's bucket-relative identity and age, as returned by
/// [`ObjectStore::list`] for the Scheduler's prune sweep (`spec.md` §4.8).
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes `bytes` under `bucket/key` (the bucket name is the sanitized
    /// job-type string, per `spec.md` §6 and §9's canonical
    /// `type -> bucket name` mapping in `JobType::bucket_name`).
    async fn put(&self, bucket: &str, key: &str, bytes: Bytes) -> Result<(), ObjectStoreError>;

    /// Returns a signed URL for `bucket/key` valid for `ttl_days` days.
    async fn signed_url(&self, bucket: &str, key: &str, ttl_days: u32) -> Result<String, ObjectStoreError>;

    /// Fetches the raw bytes at `bucket/key`, used by the API Gateway's
    /// `Accept: image/png`/`audio/wav` reformatting path (`spec.md`
    /// §4.1 point 7) when storage was `S3`.
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, ObjectStoreError>;

    /// Lists every object in `bucket`, used by the Scheduler's pruner.
    async fn list(&self, bucket: &str) -> Result<Vec<ObjectMeta>, ObjectStoreError>;

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError>;
}
