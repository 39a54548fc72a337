//! Shared request/response plumbing used by every modality handler:
//! header parsing (`spec.md` §4.1), job construction, the high-priority
//! direct-dispatch path, and the synchronous polling loop.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{de::DeserializeOwned, Serialize};
use smi_protocol::{Envelope, Job, JobId, JobStatus, JobType, Priority, Storage};

use crate::error::GatewayError;
use crate::job_manager::DispatchTarget;
use crate::state::AppState;

/// Implemented by response bodies that may carry a large binary artifact
/// (images, audio). [`StorageAware::store_if_large`] moves that artifact
/// into the configured Object Store and replaces it with a signed URL,
/// giving such responses the "uniform signed-URL contract" the Object
/// Store backends promise rather than leaving big payloads inlined as
/// base64 forever. Text/embeddings responses have no artifact to move, so
/// they take the default no-op.
#[async_trait]
pub trait StorageAware: Sized + Send {
    async fn store_if_large(self, _ctx: &StorageContext<'_>) -> Result<Self, GatewayError> {
        Ok(self)
    }
}

pub struct StorageContext<'a> {
    pub object_store: &'a dyn smi_object_store::ObjectStore,
    pub bucket: &'static str,
    pub key: String,
    pub ttl_days: u32,
}

/// The per-request header set from `spec.md` §4.1, parsed once at the top
/// of every modality handler.
#[derive(Debug, Clone, Copy)]
pub struct RequestHeaders {
    pub async_mode: bool,
    pub keep_alive: u32,
    pub storage: Storage,
    pub priority: Priority,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn is_truthy(raw: &str) -> bool {
    matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

/// Parses the `async`/`keep-alive`/`storage`/`priority` headers. An
/// absent `storage`/`priority` header falls back to its documented
/// default; a present-but-unrecognized value is rejected as
/// `Unauthorized`, matching `spec.md` §4.1's header contract verbatim.
pub fn parse_request_headers(headers: &HeaderMap) -> Result<RequestHeaders, GatewayError> {
    let async_mode = header_str(headers, "async").map(is_truthy).unwrap_or(false);

    let keep_alive = header_str(headers, "keep-alive")
        .map(|raw| {
            raw.parse::<u32>()
                .map_err(|_| GatewayError::ValidationFailed(format!("invalid keep-alive header: {raw}")))
        })
        .transpose()?
        .unwrap_or(0);

    let storage = match header_str(headers, "storage") {
        None => Storage::Local,
        Some(raw) => raw
            .parse()
            .map_err(|_| GatewayError::AuthFailed(format!("invalid storage header: {raw}")))?,
    };

    let priority = match header_str(headers, "priority") {
        None => Priority::Low,
        Some(raw) => raw
            .parse()
            .map_err(|_| GatewayError::AuthFailed(format!("invalid priority header: {raw}")))?,
    };

    Ok(RequestHeaders { async_mode, keep_alive, storage, priority })
}

/// The API Gateway's typed envelope around a job's outcome: always an id
/// and a status, plus the decoded modality response once one is
/// available. Mirrors `spec.md` §4.1's `JobResponse`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub id: JobId,
    pub status: JobStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
}

/// What one modality endpoint needs to submit a job: the routing target,
/// the declared request/response model class names (carried on the wire
/// for the Dispatcher/Service, `spec.md` §4.3), and the job type itself.
pub struct SubmissionTarget {
    pub job_type: JobType,
    pub remote_class: &'static str,
    pub remote_method: &'static str,
    pub request_model_class: &'static str,
    pub response_model_class: &'static str,
}

/// Resolves `worker_id` against the loaded roster and confirms it serves
/// the endpoint's job type. Fails with `UnknownWorker` (404) otherwise,
/// per `spec.md` §4.1 step 1.
pub fn resolve_worker(state: &AppState, worker_id: &str, job_type: JobType) -> Result<(), GatewayError> {
    match state.worker_configs.get(worker_id) {
        Some(config) if config.job_type == job_type => Ok(()),
        _ => Err(GatewayError::UnknownWorker(worker_id.to_string())),
    }
}

/// Submits one job end to end: validates the worker, builds the `Job`,
/// and either dispatches it directly (priority `High`, `spec.md` §4.1
/// step 3) or hands it to the type's Job Manager and either returns
/// immediately (`async`) or polls the Job Store for a terminal status
/// (`spec.md` §4.1 steps 4-5).
pub async fn submit_job<Req, Resp>(
    state: &AppState,
    worker_id: String,
    req_headers: RequestHeaders,
    target: SubmissionTarget,
    payload: Req,
) -> Result<(StatusCode, Json<ApiResponse<Resp>>), GatewayError>
where
    Req: Serialize,
    Resp: DeserializeOwned + Serialize + StorageAware,
{
    resolve_worker(state, &worker_id, target.job_type)?;

    let mut job = Job::new(target.job_type, worker_id.clone());
    job.priority = req_headers.priority;
    job.keep_alive = req_headers.keep_alive;
    job.storage = req_headers.storage;

    if job.priority == Priority::High {
        let envelope = Envelope {
            response_model_class: target.request_model_class.to_string(),
            payload: serde_json::to_value(&payload)
                .map_err(|e| GatewayError::ValidationFailed(e.to_string()))?,
        };
        let outcome = state
            .dispatcher(target.job_type)
            .execute_job(job.id, &worker_id, target.remote_class, target.remote_method, envelope)
            .await
            .map_err(|e| GatewayError::DispatchFailed(e.to_string()))?;
        return terminal_from_envelope(state, job.id, target.job_type, outcome).await;
    }

    let dispatch_target = DispatchTarget {
        remote_class: target.remote_class.to_string(),
        remote_method: target.remote_method.to_string(),
        request_model_class: target.request_model_class.to_string(),
        response_model_class: target.response_model_class.to_string(),
    };
    let body = serde_json::to_vec(&payload).map_err(|e| GatewayError::ValidationFailed(e.to_string()))?;
    state
        .job_manager(target.job_type)
        .submit(&job, &dispatch_target, body)
        .await
        .map_err(|e| GatewayError::BrokerUnavailable(e.to_string()))?;

    if req_headers.async_mode {
        let status = state
            .job_manager(target.job_type)
            .get_status(job.id)
            .await
            .map_err(|e| GatewayError::StorageFailed(e.to_string()))?;
        return Ok((
            StatusCode::CREATED,
            Json(ApiResponse { id: job.id, status, message: "job accepted".to_string(), result: None }),
        ));
    }

    poll_until_terminal(state, target.job_type, job.id, state.config.polling_deadline_seconds).await
}

fn storage_context<'a>(state: &'a AppState, job_type: JobType, id: JobId) -> StorageContext<'a> {
    StorageContext {
        object_store: state.object_store.as_ref(),
        bucket: job_type.bucket_name(),
        key: id.to_string(),
        ttl_days: state.config.storage_ttl_days,
    }
}

async fn terminal_from_envelope<Resp>(
    state: &AppState,
    id: JobId,
    job_type: JobType,
    envelope: Envelope,
) -> Result<(StatusCode, Json<ApiResponse<Resp>>), GatewayError>
where
    Resp: DeserializeOwned + StorageAware,
{
    if envelope.is_error() {
        let message = envelope
            .into_error()
            .map(|e| e.message)
            .unwrap_or_else(|| "worker failed".to_string());
        return Ok((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse { id, status: JobStatus::Failed, message, result: None }),
        ));
    }
    let result: Resp =
        serde_json::from_value(envelope.payload).map_err(|e| GatewayError::ValidationFailed(e.to_string()))?;
    let ctx = storage_context(state, job_type, id);
    let result = result.store_if_large(&ctx).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse { id, status: JobStatus::Completed, message: "completed".to_string(), result: Some(result) }),
    ))
}

/// `spec.md` §4.1 step 5: poll the Job Store at 1 s intervals up to the
/// configured deadline. Returns `Timeout` on expiry without cancelling
/// the underlying job — the reaper, not the poller, is responsible for
/// eventually terminating a stalled worker (`spec.md` §5).
async fn poll_until_terminal<Resp>(
    state: &AppState,
    job_type: JobType,
    id: JobId,
    deadline_seconds: u64,
) -> Result<(StatusCode, Json<ApiResponse<Resp>>), GatewayError>
where
    Resp: DeserializeOwned + StorageAware,
{
    let deadline = Duration::from_secs(deadline_seconds);
    let started = Instant::now();

    loop {
        let record = state
            .job_manager(job_type)
            .get_record(id)
            .await
            .map_err(|e| GatewayError::StorageFailed(e.to_string()))?;

        match record.status {
            JobStatus::Completed => {
                let raw = state
                    .job_manager(job_type)
                    .get_result(id)
                    .await
                    .map_err(|e| GatewayError::StorageFailed(e.to_string()))?
                    .ok_or_else(|| GatewayError::WorkerFailure("completed job has no result".to_string()))?;
                let result: Resp = smi_job_store::decode_result(&raw)
                    .map_err(|e| GatewayError::ValidationFailed(e.to_string()))?;
                let ctx = storage_context(state, job_type, id);
                let result = result.store_if_large(&ctx).await?;
                return Ok((
                    StatusCode::CREATED,
                    Json(ApiResponse {
                        id,
                        status: JobStatus::Completed,
                        message: "completed".to_string(),
                        result: Some(result),
                    }),
                ));
            }
            JobStatus::Failed => {
                let message = record.error.unwrap_or_else(|| "job failed".to_string());
                return Ok((
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(ApiResponse { id, status: JobStatus::Failed, message, result: None }),
                ));
            }
            _ => {}
        }

        if started.elapsed() >= deadline {
            return Err(GatewayError::Timeout);
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

/// Serves a completed binary artifact straight out of the Object Store,
/// bypassing JSON entirely — the `Accept: image/png`/`audio/wav`
/// reformatting path (`spec.md` §4.1 point 7).
///
/// Consumes the job's Job Store records the same way `fetch_job`'s
/// `Completed` branch does, so a repeated fetch reports `Unknown` per
/// `spec.md` §8's idempotence property regardless of which retrieval path
/// a client happens to take.
pub async fn fetch_raw_bytes(
    state: &AppState,
    job_type: JobType,
    id: JobId,
    key_suffix: &str,
    content_type: &'static str,
) -> Result<axum::response::Response, GatewayError> {
    let key = format!("{id}{key_suffix}");
    let bytes = state
        .object_store
        .get(job_type.bucket_name(), &key)
        .await
        .map_err(|e| GatewayError::StorageFailed(e.to_string()))?;
    let _ = state.job_store.delete(id).await;
    Ok(([(axum::http::header::CONTENT_TYPE, content_type)], bytes).into_response())
}

/// Reads a previously-submitted job's status/result without resubmitting
/// it — the `GET /<modality>/{id}` retrieval endpoint (`spec.md` §4.1
/// step 6).
pub async fn fetch_job<Resp>(
    state: &AppState,
    job_type: JobType,
    id: JobId,
) -> Result<(StatusCode, Json<ApiResponse<Resp>>), GatewayError>
where
    Resp: DeserializeOwned + StorageAware,
{
    let record = state
        .job_manager(job_type)
        .get_record(id)
        .await
        .map_err(|e| GatewayError::StorageFailed(e.to_string()))?;

    match record.status {
        JobStatus::Completed => {
            let raw = state
                .job_manager(job_type)
                .get_result(id)
                .await
                .map_err(|e| GatewayError::StorageFailed(e.to_string()))?
                .ok_or_else(|| GatewayError::WorkerFailure("completed job has no result".to_string()))?;
            let result: Resp = smi_job_store::decode_result(&raw)
                .map_err(|e| GatewayError::ValidationFailed(e.to_string()))?;
            let ctx = storage_context(state, job_type, id);
            let result = result.store_if_large(&ctx).await?;
            Ok((
                StatusCode::OK,
                Json(ApiResponse { id, status: JobStatus::Completed, message: "completed".to_string(), result: Some(result) }),
            ))
        }
        JobStatus::Failed => {
            let message = record.error.unwrap_or_else(|| "job failed".to_string());
            Ok((StatusCode::OK, Json(ApiResponse { id, status: JobStatus::Failed, message, result: None })))
        }
        status => Ok((StatusCode::OK, Json(ApiResponse { id, status, message: "pending".to_string(), result: None }))),
    }
}

impl StorageAware for smi_protocol::llm::ChatResponse {}
impl StorageAware for smi_protocol::llm::EmbeddingsResponse {}
impl StorageAware for smi_protocol::audio::SpeechToTextResponse {}

#[async_trait]
impl StorageAware for smi_protocol::image::TextToImageResponse {
    async fn store_if_large(mut self, ctx: &StorageContext<'_>) -> Result<Self, GatewayError> {
        use smi_protocol::image::ImagePayload;
        if let ImagePayload::Inline { image_base64 } = &self.payload {
            use base64::Engine;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(image_base64)
                .map_err(|e| GatewayError::ValidationFailed(e.to_string()))?;
            let key = format!("{}.png", ctx.key);
            ctx.object_store
                .put(ctx.bucket, &key, bytes::Bytes::from(bytes))
                .await
                .map_err(|e| GatewayError::StorageFailed(e.to_string()))?;
            let url = ctx
                .object_store
                .signed_url(ctx.bucket, &key, ctx.ttl_days)
                .await
                .map_err(|e| GatewayError::StorageFailed(e.to_string()))?;
            self.payload = ImagePayload::Url { url };
        }
        Ok(self)
    }
}

#[async_trait]
impl StorageAware for smi_protocol::audio::TextToSpeechResponse {
    async fn store_if_large(self, ctx: &StorageContext<'_>) -> Result<Self, GatewayError> {
        let key = format!("{}.wav", ctx.key);
        ctx.object_store
            .put(ctx.bucket, &key, bytes::Bytes::copy_from_slice(&self.audio))
            .await
            .map_err(|e| GatewayError::StorageFailed(e.to_string()))?;
        // The object store URL is kept alongside the inline bytes rather
        // than replacing them: unlike `TextToImageResponse`'s untagged
        // `ImagePayload`, `TextToSpeechResponse` has no URL variant in its
        // wire shape, so the upload exists purely to satisfy the
        // `Accept: audio/wav` raw-fetch path (`fetch_audio_bytes`), which
        // reads straight from the store rather than from this field.
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_str(v).unwrap());
        }
        map
    }

    #[test]
    fn defaults_match_the_documented_header_contract() {
        let parsed = parse_request_headers(&HeaderMap::new()).unwrap();
        assert!(!parsed.async_mode);
        assert_eq!(parsed.keep_alive, 0);
        assert_eq!(parsed.storage, Storage::Local);
        assert_eq!(parsed.priority, Priority::Low);
    }

    #[test]
    fn rejects_an_unrecognized_storage_value() {
        let err = parse_request_headers(&headers(&[("storage", "minio")])).unwrap_err();
        assert!(matches!(err, GatewayError::AuthFailed(_)));
    }

    #[test]
    fn rejects_an_unrecognized_priority_value() {
        let err = parse_request_headers(&headers(&[("priority", "urgent")])).unwrap_err();
        assert!(matches!(err, GatewayError::AuthFailed(_)));
    }

    #[test]
    fn async_header_accepts_common_truthy_spellings() {
        assert!(parse_request_headers(&headers(&[("async", "1")])).unwrap().async_mode);
        assert!(parse_request_headers(&headers(&[("async", "true")])).unwrap().async_mode);
        assert!(!parse_request_headers(&headers(&[("async", "0")])).unwrap().async_mode);
    }

    #[test]
    fn keep_alive_parses_as_minutes() {
        let parsed = parse_request_headers(&headers(&[("keep-alive", "10")])).unwrap();
        assert_eq!(parsed.keep_alive, 10);
    }
}
