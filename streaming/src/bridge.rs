//! The Streaming Bridge: two cooperative tasks shuttling frames between a
//! client WebSocket and a Worker's ZeroMQ PUSH/PULL pair (`spec.md` §4.7).
//!
//! Grounds the original `stream()` coroutine's `receive_from_ws`/
//! `send_to_ws` pair. ZeroMQ's socket API is synchronous, so each socket
//! gets its own blocking OS thread; the two async-facing tasks only ever
//! touch the WebSocket and a pair of channels. A shared stop flag lets
//! either side end the session cleanly and have the other notice within
//! one poll tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::WebSocket;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::error::StreamingError;
use crate::frame::{decode_frame, encode_frame};
use crate::session::StreamSession;

/// How often the blocking ZeroMQ threads wake up to check the stop flag
/// when no frame is available. Matches the original's `poller.poll(timeout=1000)`
/// tick on the egress side.
const POLL_TICK: Duration = Duration::from_millis(500);

/// Runs one session to completion. Returns once the WebSocket disconnects,
/// the client's per-frame inactivity timeout elapses, or either ZeroMQ
/// socket errors. Never propagates an error that should affect other
/// concurrent sessions — callers log the result and move on.
pub async fn run_bridge(socket: WebSocket, session: StreamSession) -> Result<(), StreamingError> {
    let stop = Arc::new(AtomicBool::new(false));
    let (ws_sink, ws_stream) = socket.split();

    let (to_worker_tx, to_worker_rx) = std::sync::mpsc::channel::<Vec<u8>>();
    let (from_worker_tx, from_worker_rx) = tokio::sync::mpsc::channel::<Vec<u8>>(64);

    let push_stop = stop.clone();
    let client_port = session.client_port;
    let push_task = tokio::task::spawn_blocking(move || run_push_loop(client_port, to_worker_rx, push_stop));

    let pull_stop = stop.clone();
    let worker_addr = session.worker_addr.clone();
    let worker_port = session.worker_port;
    let pull_task =
        tokio::task::spawn_blocking(move || run_pull_loop(&worker_addr, worker_port, from_worker_tx, pull_stop));

    let ingress_stop = stop.clone();
    let ingress = ingress_loop(ws_stream, to_worker_tx, session.intype, session.timeout, ingress_stop);

    let egress_stop = stop.clone();
    let egress = egress_loop(ws_sink, from_worker_rx, session.outtype, egress_stop);

    tokio::join!(ingress, egress);
    stop.store(true, Ordering::SeqCst);

    if let Err(e) = push_task.await.unwrap_or(Ok(())) {
        warn!(worker_id = %session.worker_id, error = %e, "push socket ended with an error");
    }
    if let Err(e) = pull_task.await.unwrap_or(Ok(())) {
        warn!(worker_id = %session.worker_id, error = %e, "pull socket ended with an error");
    }
    info!(worker_id = %session.worker_id, "streaming session ended");
    Ok(())
}

fn run_push_loop(
    client_port: u16,
    rx: std::sync::mpsc::Receiver<Vec<u8>>,
    stop: Arc<AtomicBool>,
) -> Result<(), StreamingError> {
    let ctx = zmq::Context::new();
    let push = ctx.socket(zmq::PUSH)?;
    push.bind(&format!("tcp://*:{client_port}"))?;

    loop {
        match rx.recv_timeout(POLL_TICK) {
            Ok(bytes) => push.send(bytes, 0)?,
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                if stop.load(Ordering::SeqCst) {
                    return Ok(());
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => return Ok(()),
        }
    }
}

fn run_pull_loop(
    worker_addr: &str,
    worker_port: u16,
    tx: tokio::sync::mpsc::Sender<Vec<u8>>,
    stop: Arc<AtomicBool>,
) -> Result<(), StreamingError> {
    let ctx = zmq::Context::new();
    let pull = ctx.socket(zmq::PULL)?;
    pull.connect(&format!("tcp://{worker_addr}:{worker_port}"))?;
    pull.set_rcvtimeo(POLL_TICK.as_millis() as i32)?;

    loop {
        if stop.load(Ordering::SeqCst) {
            return Ok(());
        }
        match pull.recv_bytes(0) {
            Ok(bytes) => {
                if tx.blocking_send(bytes).is_err() {
                    return Ok(());
                }
            }
            Err(zmq::Error::EAGAIN) => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

async fn ingress_loop(
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    to_worker_tx: std::sync::mpsc::Sender<Vec<u8>>,
    intype: crate::frame::FrameType,
    timeout: Duration,
    stop: Arc<AtomicBool>,
) {
    loop {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        let next = tokio::time::timeout(timeout, ws_stream.next()).await;
        match next {
            Ok(Some(Ok(message))) => match encode_frame(intype, message) {
                Ok(bytes) => {
                    if to_worker_tx.send(bytes).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "dropping a malformed ingress frame");
                }
            },
            Ok(Some(Err(e))) => {
                debug!(error = %e, "websocket ingress error, closing session");
                break;
            }
            Ok(None) => {
                debug!("client disconnected");
                break;
            }
            Err(_elapsed) => {
                info!("websocket timed out due to inactivity");
                break;
            }
        }
    }
    stop.store(true, Ordering::SeqCst);
}

async fn egress_loop(
    mut ws_sink: futures::stream::SplitSink<WebSocket, axum::extract::ws::Message>,
    mut from_worker_rx: tokio::sync::mpsc::Receiver<Vec<u8>>,
    outtype: crate::frame::FrameType,
    stop: Arc<AtomicBool>,
) {
    loop {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        match tokio::time::timeout(POLL_TICK, from_worker_rx.recv()).await {
            Ok(Some(bytes)) => match decode_frame(outtype, bytes) {
                Ok(message) => {
                    if ws_sink.send(message).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "dropping a malformed egress frame");
                }
            },
            Ok(None) => break,
            Err(_elapsed) => continue,
        }
    }
    stop.store(true, Ordering::SeqCst);
    let _ = ws_sink.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_tick_is_well_under_a_second_so_timeouts_stay_responsive() {
        assert!(POLL_TICK < Duration::from_secs(1));
    }
}
