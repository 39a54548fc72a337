//! Wire types shared across the gateway, dispatcher, and worker services.
//!
//! Every type in this crate is plain data: `Serialize`/`Deserialize` structs
//! and enums with no I/O and no async. The gateway, dispatcher, and worker
//! service crates all depend on this crate so that a job's shape only has to
//! be agreed on in one place.

pub mod audio;
pub mod envelope;
pub mod error;
pub mod gpu;
pub mod image;
pub mod job;
pub mod llm;
pub mod worker_config;

pub use envelope::{Envelope, MethodCallError};
pub use error::ProtocolError;
pub use job::{Job, JobId, JobStatus, JobType, Priority, Storage};
pub use worker_config::{WorkerConfig, WorkerConfigs};
