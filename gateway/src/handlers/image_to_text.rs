//! `POST /v1/image-to-text` — vision chat (`spec.md` §6). Reuses
//! `ChatRequest`/`ChatResponse`; a vision request is simply a chat request
//! whose last user message carries `images`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use smi_protocol::llm::{ChatRequest, ChatResponse};
use smi_protocol::JobType;

use crate::error::GatewayError;
use crate::handlers::common::{parse_request_headers, submit_job, SubmissionTarget};
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
