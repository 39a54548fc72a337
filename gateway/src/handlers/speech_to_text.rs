//! `POST /v1/speech-to-text` — whole-file STT via multipart upload
//! (`spec.md` §6). Streamed transcription lives in [`crate::ws`]; this
//! endpoint is the synchronous, single-shot counterpart.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::HeaderMap;
use smi_protocol::audio::{SpeechToTextRequest, SpeechToTextResponse};
use smi_protocol::JobType;

use crate::error::GatewayError;
use crate::handlers::common::{parse_request_headers, submit_job, SubmissionTarget};
use crate::state::AppState;

fn target() -> SubmissionTarget {
    SubmissionTarget {
        job_type: JobType::SpeechToText,
        remote_class: "SpeechWorker",
        remote_method: "SpeechToTextResponse",
        request_model_class: "SpeechToTextRequest",
        response_model_class: "SpeechToTextResponse",
    }
}

/// Collects the `model`, `audio`, and optional `language` multipart fields
/// into a [`SpeechToTextRequest`]. The audio field is expected to be the
/// raw file bytes (any field name containing "audio" or "file" is
/// accepted, matching how browser `FormData` clients commonly name it).
async fn collect_request(mut multipart: Multipart) -> Result<SpeechToTextRequest, GatewayError> {
    let mut model = None;
    let mut audio = None;
    let mut language = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::ValidationFailed(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "model" => {
                model = Some(field.text().await.map_err(|e| GatewayError::ValidationFailed(e.to_string()))?);
            }
            "language" => {
                language = Some(field.text().await.map_err(|e| GatewayError::ValidationFailed(e.to_string()))?);
            }
            n if n.contains("audio") || n.contains("file") => {
                let bytes = field.bytes().await.map_err(|e| GatewayError::ValidationFailed(e.to_string()))?;
                audio = Some(bytes.to_vec());
            }
            _ => {}
        }
    }

    Ok(SpeechToTextRequest {
        model: model.ok_or_else(|| GatewayError::ValidationFailed("missing model field".to_string()))?,
        audio: audio.ok_or_else(|| GatewayError::ValidationFailed("missing audio field".to_string()))?,
        language,
    })
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<impl axum::response::IntoResponse, GatewayError> {
    let req_headers = parse_request_headers(&headers)?;
    let request = collect_request(multipart).await?;
    let worker_id = request.model.clone();
    submit_job::<SpeechToTextRequest, SpeechToTextResponse>(&state, worker_id, req_headers, target(), request).await
}
