use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobStoreError {
    #[error("redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("redis command error: {0}")]
    Command(#[from] redis::RedisError),

    #[error("failed to encode job record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to encode result envelope: {0}")]
    EncodeResult(#[from] rmp_serde::encode::Error),

    #[error("failed to decode result envelope: {0}")]
    DecodeResult(#[from] rmp_serde::decode::Error),

    #[error("job {0} not found")]
    NotFound(String),
}
