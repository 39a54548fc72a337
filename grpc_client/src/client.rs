//! `DispatcherClient`: the Dispatcher's RPC call site.
//!
//! `call_function` and `execute_job` mirror the original `Dispatcher`'s two
//! entry points: a generic synchronous-style remote call used for things
//! like `/v1/gpu/info`, and the per-job `execute_job` path that carries a
//! tagged [`smi_protocol::Envelope`].

use smi_protocol::{Envelope, JobId};
use thiserror::Error;
use tonic::codec::CompressionEncoding;
use tonic::transport::Channel;

use crate::proto::{
    generic_service_client::GenericServiceClient, GenericRequest, StreamStartRequest,
    StreamStartResponse, StreamStopRequest, WorkerStatusRequest, WorkerStatusResponse,
};
use crate::{BoxedTraceInjector, NoopTraceInjector};

#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("failed to connect to service at {0}: {1}")]
    Connect(String, #[source] tonic::transport::Error),

    #[error("rpc failed: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A connected client for one job type's Service.
#[derive(Clone)]
pub struct DispatcherClient {
    inner: GenericServiceClient<Channel>,
    trace_injector: BoxedTraceInjector,
}

impl DispatcherClient {
    pub async fn connect(endpoint: impl Into<String>) -> Result<Self, DispatcherError> {
        let endpoint_str = endpoint.into();
        let channel = Channel::from_shared(endpoint_str.clone())
            .map_err(|e| DispatcherError::Connect(endpoint_str.clone(), tonic::transport::Error::from(e)))?
            .connect()
            .await
            .map_err(|e| DispatcherError::Connect(endpoint_str, e))?;
        let inner = GenericServiceClient::new(channel)
            .send_compressed(CompressionEncoding::Gzip)
            .accept_compressed(CompressionEncoding::Gzip);
        Ok(Self {
            inner,
            trace_injector: std::sync::Arc::new(NoopTraceInjector),
        })
    }

    pub fn with_trace_injector(mut self, injector: BoxedTraceInjector) -> Self {
        self.trace_injector = injector;
        self
    }

    /// Dispatch one job's envelope to the Service and await its response
    /// envelope. Timeout enforcement is the caller's responsibility (the
    /// Job Manager applies the configured polling deadline).
    pub async fn execute_job(
        &self,
        job_id: JobId,
        worker_class: &str,
        remote_class: &str,
        remote_method: &str,
        request: Envelope,
    ) -> Result<Envelope, DispatcherError> {
        let payload = serde_json::to_vec(&request)?;
        let mut req = tonic::Request::new(GenericRequest {
            job_id: job_id.to_string(),
            worker_class: worker_class.to_string(),
            remote_class: remote_class.to_string(),
            remote_method: remote_method.to_string(),
            payload,
        });
        self.trace_injector
            .inject(req.metadata_mut())
            .map_err(|e| DispatcherError::Rpc(tonic::Status::internal(e.to_string())))?;

        let mut client = self.inner.clone();
        let resp = client.process(req).await?.into_inner();
        let envelope: Envelope = serde_json::from_slice(&resp.payload)?;
        Ok(envelope)
    }

    /// Generic remote function call used for side endpoints such as
    /// `/v1/gpu/info` or worker introspection, where no job envelope is
    /// in play.
    pub async fn call_function(
        &self,
        worker_class: &str,
        remote_class: &str,
        remote_method: &str,
        request: Envelope,
    ) -> Result<Envelope, DispatcherError> {
        self.execute_job(JobId::new(), worker_class, remote_class, remote_method, request)
            .await
    }

    pub async fn start_stream(
        &self,
        job_id: JobId,
        worker_class: &str,
        peer_ip: &str,
        input_port: u16,
        output_port: u16,
        timeout_seconds: u32,
        input_type: &str,
        output_type: &str,
    ) -> Result<StreamStartResponse, DispatcherError> {
        let mut client = self.inner.clone();
        let resp = client
            .stream_start(StreamStartRequest {
                job_id: job_id.to_string(),
                worker_class: worker_class.to_string(),
                peer_ip: peer_ip.to_string(),
                input_port: input_port as u32,
                output_port: output_port as u32,
                timeout_seconds,
                input_type: input_type.to_string(),
                output_type: output_type.to_string(),
            })
            .await?;
        Ok(resp.into_inner())
    }

    /// Cancels an active streaming session. The Service tears down its
    /// ZeroMQ sockets and transitions the owning worker back to `Idle`;
    /// called by the Dispatcher when the client side of the bridge
    /// (`spec.md` §4.7) ends the session for any reason.
    pub async fn stop_stream(&self, job_id: JobId) -> Result<bool, DispatcherError> {
        let mut client = self.inner.clone();
        let resp = client
            .stream_stop(StreamStopRequest {
                job_id: job_id.to_string(),
            })
            .await?;
        Ok(resp.into_inner().stopped)
    }

    pub async fn worker_status(
        &self,
        worker_class: &str,
    ) -> Result<WorkerStatusResponse, DispatcherError> {
        let mut client = self.inner.clone();
        let resp = client
            .get_worker_status(WorkerStatusRequest {
                worker_class: worker_class.to_string(),
            })
            .await?;
        Ok(resp.into_inner())
    }
}
