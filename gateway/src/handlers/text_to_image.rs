//! `POST /v1/text-to-image`, `GET /v1/text-to-image/{id}` — image
//! generation (`spec.md` §6). The `GET` honors `Accept: image/png` by
//! streaming the raw bytes back from the Object Store instead of a JSON
//! envelope (`spec.md` §4.1 point 7).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use smi_protocol::image::{TextToImageRequest, TextToImageResponse};
use smi_protocol::{JobId, JobType};

use crate::error::GatewayError;
use crate::handlers::common::{fetch_job, fetch_raw_bytes, parse_request_headers, submit_job, SubmissionTarget};
use crate::state::AppState;

const IMAGE_KEY_SUFFIX: &str = ".png";

fn target() -> SubmissionTarget {
    SubmissionTarget {
        job_type: JobType::TextToImage,
        remote_class: "ImageWorker",
        remote_method: "TextToImageResponse",
        request_model_class: "TextToImageRequest",
        response_model_class: "TextToImageResponse",
    }
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<TextToImageRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let req_headers = parse_request_headers(&headers)?;
    let worker_id = request.model.clone();
    submit_job::<TextToImageRequest, TextToImageResponse>(&state, worker_id, req_headers, target(), request).await
}

pub async fn fetch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<JobId>,
    headers: HeaderMap,
) -> Result<axum::response::Response, GatewayError> {
    if headers.get(axum::http::header::ACCEPT).and_then(|v| v.to_str().ok()) == Some("image/png") {
        return fetch_raw_bytes(&state, JobType::TextToImage, id, IMAGE_KEY_SUFFIX, "image/png").await;
    }
    let (status, body) = fetch_job::<TextToImageResponse>(&state, JobType::TextToImage, id).await?;
    Ok((status, body).into_response())
}
