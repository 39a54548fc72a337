//! `POST`/`GET /v1/text-to-embeddings` — embeddings (`spec.md` §6).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use smi_protocol::llm::{EmbeddingsRequest, EmbeddingsResponse};
use smi_protocol::{JobId, JobType};

use crate::error::GatewayError;
use crate::handlers::common::{fetch_job, parse_request_headers, submit_job, SubmissionTarget};
use crate::state::AppState;

fn target() -> SubmissionTarget {
    SubmissionTarget {
        job_type: JobType::Embeddings,
        remote_class: "EmbeddingsWorker",
        remote_method: "EmbeddingsResponse",
        request_model_class: "EmbeddingsRequest",
        response_model_class: "EmbeddingsResponse",
    }
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<EmbeddingsRequest>,
) -> Result<impl axum::response::IntoResponse, GatewayError> {
    let req_headers = parse_request_headers(&headers)?;
    let worker_id = request.model.clone();
    submit_job::<EmbeddingsRequest, EmbeddingsResponse>(&state, worker_id, req_headers, target(), request).await
}

pub async fn fetch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<JobId>,
) -> Result<impl axum::response::IntoResponse, GatewayError> {
    fetch_job::<EmbeddingsResponse>(&state, JobType::Embeddings, id).await
}
