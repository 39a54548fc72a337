//! gRPC server implementation: the Service side of the Dispatcher <->
//! Service RPC boundary defined by `smi-dispatcher`'s generated proto.

use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use smi_dispatcher::proto::generic_service_server::GenericService;
use smi_dispatcher::proto::{
    GenericRequest, GenericResponse, StreamStartRequest, StreamStartResponse, StreamStopRequest,
    StreamStopResponse, WorkerStatusRequest, WorkerStatusResponse,
};
use smi_protocol::envelope::{Envelope, MethodCallError};
use tonic::{Request, Response, Status};
use tracing::{error, info};

use crate::pool::WorkerPool;
use crate::worker::{StreamFrameType, WorkerState};
use crate::{run_worker_stream, StreamCancel};

fn parse_frame_type(raw: &str) -> Result<StreamFrameType, Status> {
    match raw {
        "text" => Ok(StreamFrameType::Text),
        "bytes" => Ok(StreamFrameType::Bytes),
        "json" => Ok(StreamFrameType::Json),
        other => Err(Status::invalid_argument(format!("unknown stream frame type: {other}"))),
    }
}

/// The Service's gRPC-facing half of the worker pool: invokes `process`
/// calls against pooled workers and owns the bookkeeping for in-flight
/// streaming sessions (`spec.md` §4.4/§4.5).
pub struct GenericServiceImpl {
    pool: Arc<WorkerPool>,
    active_streams: DashMap<String, StreamCancel>,
}

impl GenericServiceImpl {
    pub fn new(pool: Arc<WorkerPool>) -> Self {
        Self {
            pool,
            active_streams: DashMap::new(),
        }
    }
}

#[tonic::async_trait]
impl GenericService for GenericServiceImpl {
    async fn process(
        &self,
        request: Request<GenericRequest>,
    ) -> Result<Response<GenericResponse>, Status> {
        let req = request.into_inner();
        let envelope: Envelope = serde_json::from_slice(&req.payload)
            .map_err(|e| Status::invalid_argument(e.to_string()))?;

        let handle = self.pool.acquire(&req.worker_class, 0).map_err(Status::from)?;
        let result = handle.worker.work(envelope.payload).await;
        self.pool.release(&handle);

        let response_envelope = match result {
            Ok(payload) => Envelope::ok(req.remote_method.clone(), payload)
                .map_err(|e| Status::internal(e.to_string()))?,
            Err(e) => Envelope::error(MethodCallError::new("worker_error", e.to_string())),
        };

        Ok(Response::new(GenericResponse {
            job_id: req.job_id,
            payload: serde_json::to_vec(&response_envelope)
                .map_err(|e| Status::internal(e.to_string()))?,
        }))
    }

    async fn stream_start(
        &self,
        request: Request<StreamStartRequest>,
    ) -> Result<Response<StreamStartResponse>, Status> {
        let req = request.into_inner();
        let handle = self.pool.acquire(&req.worker_class, 0).map_err(Status::from)?;
        handle.set_status(WorkerState::Streaming);

        let intype = parse_frame_type(&req.input_type)?;
        let outtype = parse_frame_type(&req.output_type)?;
        IpAddr::from_str(&req.peer_ip)
            .map_err(|e| Status::invalid_argument(format!("invalid peer_ip: {e}")))?;

        let cancel = StreamCancel::new();
        self.active_streams.insert(req.job_id.clone(), cancel.clone());

        let job_id = req.job_id.clone();
        let worker = handle.worker_arc();
        let peer_ip = req.peer_ip.clone();
        let in_port = req.input_port as u16;
        let out_port = req.output_port as u16;
        let timeout = Duration::from_secs(req.timeout_seconds as u64);

        tokio::spawn(async move {
            let result =
                run_worker_stream(worker, peer_ip, in_port, out_port, intype, outtype, timeout, cancel).await;
            if let Err(e) = result {
                error!(job_id, error = %e, "streaming session ended with an error");
            } else {
                info!(job_id, "streaming session ended cleanly");
            }
            handle.set_status(WorkerState::Idle);
        });

        Ok(Response::new(StreamStartResponse { accepted: true }))
    }

    async fn stream_stop(
        &self,
        request: Request<StreamStopRequest>,
    ) -> Result<Response<StreamStopResponse>, Status> {
        let req = request.into_inner();
        let stopped = match self.active_streams.remove(&req.job_id) {
            Some((_, cancel)) => {
                cancel.cancel();
                true
            }
            None => false,
        };
        Ok(Response::new(StreamStopResponse { stopped }))
    }

    async fn get_worker_status(
        &self,
        request: Request<WorkerStatusRequest>,
    ) -> Result<Response<WorkerStatusResponse>, Status> {
        let req = request.into_inner();
        let count = self.pool.worker_count(&req.worker_class);
        let status = if count == 0 { "unknown" } else { "registered" };
        Ok(Response::new(WorkerStatusResponse {
            status: status.to_string(),
            duration_seconds: 0.0,
        }))
    }
}
