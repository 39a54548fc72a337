//! `GET /v1/gpu/info` — GPU telemetry (`spec.md` §6).

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use smi_protocol::gpu::GpusInfo;

use crate::state::AppState;

pub async fn info(State(state): State<Arc<AppState>>) -> Json<GpusInfo> {
    Json(state.gpu_info.gpu_info().await)
}
