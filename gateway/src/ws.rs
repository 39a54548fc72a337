//! `/ws/v1/speech-to-text` — streaming STT over WebSocket (`spec.md` §4.7,
//! §6). The handshake resolves the worker, starts a streaming session on
//! the Service via the Dispatcher's `StreamStart` RPC at `High` priority
//! (bypassing the broker, since a live session can't wait in a queue),
//! then hands the upgraded socket to [`smi_streaming::run_bridge`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, Query, State};
use axum::response::Response;
use serde::Deserialize;
use smi_protocol::{Job, JobType, Priority};
use smi_streaming::{run_bridge, FrameType, StreamSession};
use tracing::{error, info, warn};

use crate::error::GatewayError;
use crate::handlers::common::resolve_worker;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    worker_id: String,
    #[serde(default = "default_timeout")]
    timeout: u32,
}

fn default_timeout() -> u32 {
    30
}

pub async fn stream_speech_to_text(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StreamQuery>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Result<Response, GatewayError> {
    resolve_worker(&state, &query.worker_id, JobType::SpeechToText)?;

    let mut job = Job::new(JobType::SpeechToText, query.worker_id.clone());
    job.priority = Priority::High;

    let worker_host = state.config.service_host(JobType::SpeechToText).to_string();
    let session = StreamSession::allocate(
        query.worker_id.clone(),
        peer.ip().to_string(),
        worker_host,
        FrameType::Bytes,
        FrameType::Json,
        Duration::from_secs(query.timeout as u64),
        state.config.stream_port_lo,
        state.config.stream_port_hi,
    )
    .map_err(|e| GatewayError::StreamClosed(e.to_string()))?;

    // `StreamStartRequest.input_port` is where the *worker* binds its PUSH
    // socket (our bridge connects a PULL to `worker_addr:input_port`), and
    // `output_port` is where *we* bind ours for the worker to connect its
    // PULL to (`spec.md` §4.7) — the reverse of the session's own
    // client/worker port naming, since those name which side binds, not
    // which direction the data flows.
    let accepted = state
        .dispatcher(JobType::SpeechToText)
        .start_stream(
            job.id,
            &query.worker_id,
            &session.client_addr,
            session.worker_port,
            session.client_port,
            query.timeout,
            session.intype.as_str(),
            session.outtype.as_str(),
        )
        .await
        .map_err(|e| GatewayError::DispatchFailed(e.to_string()))?;

    if !accepted.accepted {
        return Err(GatewayError::WorkerFailure(format!(
            "worker {} did not accept the stream session",
            query.worker_id
        )));
    }

    let dispatcher = state.dispatcher(JobType::SpeechToText).clone();
    let job_id = job.id;
    Ok(ws.on_upgrade(move |socket| async move {
        if let Err(e) = run_bridge(socket, session).await {
            warn!(%job_id, error = %e, "streaming bridge ended with an error");
        } else {
            info!(%job_id, "streaming bridge ended cleanly");
        }
        if let Err(e) = dispatcher.stop_stream(job_id).await {
            error!(%job_id, error = %e, "failed to notify worker of stream end");
        }
    }))
}
