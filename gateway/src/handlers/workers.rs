//! `GET /v1/workers/list` — read-only worker roster (`spec.md` §6, `§3`'s
//! "Exposed read-only via `/workers/list`").

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use smi_protocol::WorkerConfig;

use crate::state::AppState;

pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<WorkerConfig>> {
    Json(state.worker_configs.workers.values().cloned().collect())
}
