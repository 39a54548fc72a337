//! Job Store: durable key/value tracking of job status and results.
//!
//! Backed by Redis via `deadpool-redis`. Two keys per job:
//! `{id}:status` (a small JSON document, polled frequently) and
//! `{id}:result` (a length-bounded msgpack envelope, written once and read
//! at most a handful of times). Splitting them means a client polling
//! status never pays for deserializing a potentially large result body.

mod error;
mod redis_store;

pub use error::JobStoreError;
pub use redis_store::{decode_result, encode_result, JobRecord, JobStore, RedisJobStore};
