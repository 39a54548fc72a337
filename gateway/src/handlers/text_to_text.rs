//! `POST /v1/text-to-text`, `GET /v1/text-to-text/{id}` — chat (`spec.md`
//! §6).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use smi_protocol::llm::{ChatRequest, ChatResponse};
use smi_protocol::{JobId, JobType};

use crate::error::GatewayError;
use crate::handlers::common::{fetch_job, parse_request_headers, submit_job, SubmissionTarget};
use crate::state::AppState;

fn target() -> SubmissionTarget {
    SubmissionTarget {
        job_type: JobType::TextToText,
        remote_class: "ChatWorker",
        remote_method: "ChatResponse",
        request_model_class: "ChatRequest",
        response_model_class: "ChatResponse",
    }
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<impl axum::response::IntoResponse, GatewayError> {
    let req_headers = parse_request_headers(&headers)?;
    let worker_id = request.model.clone();
    submit_job::<ChatRequest, ChatResponse>(&state, worker_id, req_headers, target(), request).await
}

pub async fn fetch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<JobId>,
) -> Result<impl axum::response::IntoResponse, GatewayError> {
    fetch_job::<ChatResponse>(&state, JobType::TextToText, id).await
}
