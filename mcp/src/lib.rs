//! The Service: owns a pool of in-process model Workers for one job type
//! and exposes them to the Dispatcher over gRPC.
//!
//! A Service process is launched per modality (text, image, audio,
//! embeddings). It lazily instantiates Workers on first use, reuses idle
//! ones, and reaps Workers that have sat idle past their configured
//! keep-alive window.

pub mod error;
pub mod pool;
pub mod reaper;
pub mod rpc;
pub mod stream;
pub mod worker;
pub mod workers;

pub use error::ServiceError;
pub use pool::{WorkerPool, WorkerPoolConfig};
pub use reaper::ServiceKeepAlive;
pub use rpc::GenericServiceImpl;
pub use stream::{run_worker_stream, StreamCancel};
pub use worker::{StreamFrameType, Worker, WorkerHandle, WorkerState};
