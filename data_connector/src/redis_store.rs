//! Redis-backed `JobStore` implementation.
//!
//! Grounded in the connector crate's pre-existing `RedisStore` shape: a
//! cloneable wrapper around a `deadpool_redis::Pool`, with every operation
//! borrowing a connection for the duration of one call rather than holding
//! one open. A dropped or reset Redis connection is therefore repaired by
//! the next operation's `pool.get()`, with no explicit reconnect logic
//! needed in this crate.

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use smi_protocol::{JobId, JobStatus};

use crate::error::JobStoreError;

fn status_key(id: JobId) -> String {
    format!("{id}:status")
}

fn result_key(id: JobId) -> String {
    format!("{id}:result")
}

/// The status document stored at `{id}:status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub status: JobStatus,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub error: Option<String>,
}

impl JobRecord {
    pub fn new(status: JobStatus) -> Self {
        Self {
            status,
            updated_at: chrono::Utc::now(),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            updated_at: chrono::Utc::now(),
            error: Some(message.into()),
        }
    }
}

/// Durable KV storage for job status and results, independent of the
/// Message Broker: a job's status is queryable even while its message sits
/// unconsumed in a queue.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn set_status(&self, id: JobId, record: JobRecord) -> Result<(), JobStoreError>;
    async fn get_status(&self, id: JobId) -> Result<Option<JobRecord>, JobStoreError>;
    async fn set_result(&self, id: JobId, result: &[u8]) -> Result<(), JobStoreError>;
    async fn get_result(&self, id: JobId) -> Result<Option<Vec<u8>>, JobStoreError>;
    async fn delete(&self, id: JobId) -> Result<(), JobStoreError>;
}

#[derive(Clone)]
pub struct RedisJobStore {
    pool: Pool,
    ttl_seconds: Option<u64>,
}

impl RedisJobStore {
    pub fn new(redis_url: &str, pool_max: usize, ttl_seconds: Option<u64>) -> Result<Self, JobStoreError> {
        let mut cfg = Config::from_url(redis_url);
        cfg.pool = Some(deadpool_redis::PoolConfig::new(pool_max));
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| JobStoreError::Command(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "failed to build redis pool",
                e.to_string(),
            ))))?;
        Ok(Self { pool, ttl_seconds })
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn set_status(&self, id: JobId, record: JobRecord) -> Result<(), JobStoreError> {
        let mut conn = self.pool.get().await?;
        let encoded = serde_json::to_string(&record)?;
        let key = status_key(id);
        match self.ttl_seconds {
            Some(ttl) => conn.set_ex::<_, _, ()>(&key, encoded, ttl).await?,
            None => conn.set::<_, _, ()>(&key, encoded).await?,
        }
        Ok(())
    }

    async fn get_status(&self, id: JobId) -> Result<Option<JobRecord>, JobStoreError> {
        let mut conn = self.pool.get().await?;
        let raw: Option<String> = conn.get(status_key(id)).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn set_result(&self, id: JobId, result: &[u8]) -> Result<(), JobStoreError> {
        let mut conn = self.pool.get().await?;
        let key = result_key(id);
        match self.ttl_seconds {
            Some(ttl) => conn.set_ex::<_, _, ()>(&key, result, ttl).await?,
            None => conn.set::<_, _, ()>(&key, result).await?,
        }
        Ok(())
    }

    async fn get_result(&self, id: JobId) -> Result<Option<Vec<u8>>, JobStoreError> {
        let mut conn = self.pool.get().await?;
        let raw: Option<Vec<u8>> = conn.get(result_key(id)).await?;
        Ok(raw)
    }

    async fn delete(&self, id: JobId) -> Result<(), JobStoreError> {
        let mut conn = self.pool.get().await?;
        conn.del::<_, ()>(&[status_key(id), result_key(id)]).await?;
        Ok(())
    }
}

/// Encodes a result payload into the compact binary wrapper the Job Store
/// persists, mirroring the original's `msgpack.packb` framing.
pub fn encode_result<T: Serialize>(value: &T) -> Result<Vec<u8>, JobStoreError> {
    Ok(rmp_serde::to_vec(value)?)
}

pub fn decode_result<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, JobStoreError> {
    Ok(rmp_serde::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_and_result_keys_are_distinct_and_stable() {
        let id = JobId::new();
        assert_ne!(status_key(id), result_key(id));
        assert_eq!(status_key(id), format!("{id}:status"));
    }

    #[test]
    fn result_round_trips_through_msgpack() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Payload {
            text: String,
        }
        let payload = Payload { text: "hello".into() };
        let encoded = encode_result(&payload).unwrap();
        let decoded: Payload = decode_result(&encoded).unwrap();
        assert_eq!(payload, decoded);
    }

    #[test]
    fn job_record_failed_sets_terminal_status_and_message() {
        let record = JobRecord::failed("worker crashed");
        assert_eq!(record.status, JobStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("worker crashed"));
    }
}
