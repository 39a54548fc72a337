//! The Worker trait: a stateful, in-process model wrapper.
//!
//! Mirrors the original `Worker` base class's lifecycle: `work` for a
//! single request/response call, `start_stream`/`stream` for a bound
//! ZeroMQ session, and `cleanup` to release model resources. Concrete
//! model loading is intentionally out of scope here; see [`crate::workers`]
//! for the deterministic reference implementations this workspace ships
//! instead of real model backends.

use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Working,
    Streaming,
}

/// One modality's frame encoding on a ZeroMQ stream leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFrameType {
    Text,
    Bytes,
    Json,
}

#[async_trait]
pub trait Worker: Send + Sync {
    /// Human-readable name, used in logs and metrics.
    fn name(&self) -> &str;

    /// Handle one request/response RPC call. `data` and the return value
    /// are both the JSON-encoded inner payload of an
    /// [`smi_protocol::Envelope`] — the envelope tagging itself is applied
    /// by the caller, not by the worker.
    async fn work(&self, data: Value) -> Result<Value, ServiceError>;

    /// Transform one message on an active stream. The default forwards the
    /// message unchanged, matching the original base class's passthrough.
    async fn stream(&self, data: Value) -> Result<Value, ServiceError> {
        Ok(data)
    }

    /// Release any model resources. Called when a Worker is reaped.
    async fn cleanup(&self) {}
}

/// Runtime state wrapped around a `Worker` trait object: status, start
/// time, and the bits the pool needs for reaping and streaming bookkeeping.
/// Kept as its own type (rather than letting every `Worker` impl track
/// this) so the pool's accounting logic lives in one place.
pub struct WorkerHandle {
    pub worker_class: String,
    pub worker: std::sync::Arc<dyn Worker>,
    state: parking_lot::Mutex<WorkerState>,
    start_time: parking_lot::Mutex<Option<Instant>>,
}

impl WorkerHandle {
    pub fn new(worker_class: impl Into<String>, worker: Box<dyn Worker>) -> Self {
        Self {
            worker_class: worker_class.into(),
            worker: std::sync::Arc::from(worker),
            state: parking_lot::Mutex::new(WorkerState::Idle),
            start_time: parking_lot::Mutex::new(None),
        }
    }

    /// An owned, clonable handle to the underlying worker, independent of
    /// this `WorkerHandle`'s own lifetime — used to hand a worker off to a
    /// spawned streaming task (`spec.md` §4.7) that outlives the RPC call
    /// that started it.
    pub fn worker_arc(&self) -> std::sync::Arc<dyn Worker> {
        std::sync::Arc::clone(&self.worker)
    }

    pub fn status(&self) -> WorkerState {
        *self.state.lock()
    }

    pub fn set_status(&self, status: WorkerState) {
        *self.state.lock() = status;
        let mut start = self.start_time.lock();
        match status {
            WorkerState::Idle => *start = None,
            WorkerState::Working | WorkerState::Streaming => *start = Some(Instant::now()),
        }
    }

    /// Seconds since this worker entered its current non-idle state, or
    /// `0.0` while idle — matching the original's `get_duration`.
    pub fn duration_seconds(&self) -> f64 {
        let start = *self.start_time.lock();
        start.map(|s| s.elapsed().as_secs_f64()).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoWorker;

    #[async_trait]
    impl Worker for EchoWorker {
        fn name(&self) -> &str {
            "echo"
        }

        async fn work(&self, data: Value) -> Result<Value, ServiceError> {
            Ok(data)
        }
    }

    #[test]
    fn idle_worker_reports_zero_duration() {
        let handle = WorkerHandle::new("echo", Box::new(EchoWorker));
        assert_eq!(handle.status(), WorkerState::Idle);
        assert_eq!(handle.duration_seconds(), 0.0);
    }

    #[test]
    fn working_worker_reports_nonzero_duration_after_set() {
        let handle = WorkerHandle::new("echo", Box::new(EchoWorker));
        handle.set_status(WorkerState::Working);
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(handle.duration_seconds() > 0.0);
        handle.set_status(WorkerState::Idle);
        assert_eq!(handle.duration_seconds(), 0.0);
    }
}
