//! `POST /v1/text-to-speech`, `GET /v1/text-to-speech/{id}` — speech
//! synthesis (`spec.md` §6), plus an `Accept: audio/wav` raw-bytes path.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use smi_protocol::audio::{TextToSpeechRequest, TextToSpeechResponse};
use smi_protocol::{JobId, JobType};

use crate::error::GatewayError;
use crate::handlers::common::{fetch_job, fetch_raw_bytes, parse_request_headers, submit_job, SubmissionTarget};
use crate::state::AppState;

const AUDIO_KEY_SUFFIX: &str = ".wav";

fn target() -> SubmissionTarget {
    SubmissionTarget {
        job_type: JobType::TextToSpeech,
        remote_class: "SpeechWorker",
        remote_method: "TextToSpeechResponse",
        request_model_class: "TextToSpeechRequest",
        response_model_class: "TextToSpeechResponse",
    }
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<TextToSpeechRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let req_headers = parse_request_headers(&headers)?;
    let worker_id = request.model.clone();
    submit_job::<TextToSpeechRequest, TextToSpeechResponse>(&state, worker_id, req_headers, target(), request).await
}

pub async fn fetch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<JobId>,
    headers: HeaderMap,
) -> Result<axum::response::Response, GatewayError> {
    if headers.get(axum::http::header::ACCEPT).and_then(|v| v.to_str().ok()) == Some("audio/wav") {
        return fetch_raw_bytes(&state, JobType::TextToSpeech, id, AUDIO_KEY_SUFFIX, "audio/wav").await;
    }
    let (status, body) = fetch_job::<TextToSpeechResponse>(&state, JobType::TextToSpeech, id).await?;
    Ok((status, body).into_response())
}
