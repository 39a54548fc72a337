//! The Worker-side half of a streaming session: a bound PUSH socket and a
//! connected PULL socket shuttling frames through one [`Worker::stream`]
//! call per frame.
//!
//! Mirrors `spt/api/stream.py`'s ZeroMQ wiring, but from the Service's end
//! of the pair — the API Gateway's Streaming Bridge (`spec.md` §4.7) is a
//! separate, client-facing hop that connects to the ports this module
//! opens. `zmq`'s socket API is synchronous, so the whole session runs
//! inside `spawn_blocking`; cancellation is a polled `AtomicBool` rather
//! than an awaited future since the blocking thread cannot `.await`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::error::ServiceError;
use crate::worker::{StreamFrameType, Worker};

/// Shared stop flag for one streaming session. Cloning is cheap; the
/// gRPC handler keeps one half to cancel the session on `StreamStop`, the
/// blocking task polls the other half once per `timeout` window.
#[derive(Clone, Default)]
pub struct StreamCancel(Arc<AtomicBool>);

impl StreamCancel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

fn recv_frame(socket: &zmq::Socket, frame_type: StreamFrameType) -> Result<Value, ServiceError> {
    Ok(match frame_type {
        StreamFrameType::Text => {
            let bytes = socket.recv_bytes(0)?;
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        }
        StreamFrameType::Bytes => Value::String(base64_encode(&socket.recv_bytes(0)?)),
        StreamFrameType::Json => serde_json::from_slice(&socket.recv_bytes(0)?)?,
    })
}

fn send_frame(socket: &zmq::Socket, frame_type: StreamFrameType, value: &Value) -> Result<(), ServiceError> {
    match frame_type {
        StreamFrameType::Text => socket.send(value.as_str().unwrap_or_default(), 0)?,
        StreamFrameType::Bytes => socket.send(&base64_decode(value.as_str().unwrap_or_default()), 0)?,
        StreamFrameType::Json => socket.send(serde_json::to_vec(value)?, 0)?,
    }
    Ok(())
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn base64_decode(s: &str) -> Vec<u8> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.decode(s).unwrap_or_default()
}

/// Runs one streaming session to completion: binds a PUSH socket on
/// `in_port`, connects a PULL socket to `peer_ip:out_port`, then loops
/// receiving an `intype` frame, transforming it with `worker.stream`, and
/// forwarding an `outtype` frame out. Returns when no frame arrives within
/// `timeout`, on a socket error, or when `cancel` is set.
pub async fn run_worker_stream(
    worker: Arc<dyn Worker>,
    peer_ip: String,
    in_port: u16,
    out_port: u16,
    intype: StreamFrameType,
    outtype: StreamFrameType,
    timeout: Duration,
    cancel: StreamCancel,
) -> Result<(), ServiceError> {
    tokio::task::spawn_blocking(move || {
        let ctx = zmq::Context::new();
        let push = ctx.socket(zmq::PUSH)?;
        push.bind(&format!("tcp://*:{in_port}"))?;
        let pull = ctx.socket(zmq::PULL)?;
        pull.connect(&format!("tcp://{peer_ip}:{out_port}"))?;
        pull.set_rcvtimeo(timeout.as_millis() as i32)?;

        let handle = tokio::runtime::Handle::current();
        loop {
            if cancel.is_cancelled() {
                break;
            }
            let frame = match recv_frame(&pull, intype) {
                Ok(frame) => frame,
                Err(ServiceError::Zmq(zmq::Error::EAGAIN)) => break,
                Err(e) => return Err(e),
            };
            let transformed = handle.block_on(worker.stream(frame))?;
            send_frame(&push, outtype, &transformed)?;
        }
        Ok(())
    })
    .await
    .map_err(|e| ServiceError::WorkerFailed(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_flag_starts_clear_and_latches_once_set() {
        let cancel = StreamCancel::new();
        assert!(!cancel.is_cancelled());
        cancel.cancel();
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn cancel_handle_is_shared_across_clones() {
        let cancel = StreamCancel::new();
        let cloned = cancel.clone();
        cloned.cancel();
        assert!(cancel.is_cancelled());
    }
}
