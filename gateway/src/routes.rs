//! Route table: one entry per endpoint in `spec.md` §6, grouped under
//! `/v1` plus the unauthenticated `/ws` streaming upgrade.

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use smi_auth::{api_key_auth_middleware, AuthState};

use crate::handlers::{embeddings, gpu, image_to_text, speech_to_text, text_to_image, text_to_speech, text_to_text, workers};
use crate::state::AppState;
use crate::ws;

pub fn build_router(state: Arc<AppState>, auth_state: AuthState) -> Router {
    let authenticated = Router::new()
        .route("/v1/text-to-text", post(text_to_text::submit))
        .route("/v1/text-to-text/{id}", get(text_to_text::fetch))
        .route("/v1/image-to-text", post(image_to_text::submit))
        .route("/v1/text-to-image", post(text_to_image::submit))
        .route("/v1/text-to-image/{id}", get(text_to_image::fetch))
        .route("/v1/text-to-speech", post(text_to_speech::submit))
        .route("/v1/text-to-speech/{id}", get(text_to_speech::fetch))
        .route("/v1/speech-to-text", post(speech_to_text::submit))
        .route("/v1/text-to-embeddings", post(embeddings::submit))
        .route("/v1/text-to-embeddings/{id}", get(embeddings::fetch))
        .route("/v1/workers/list", get(workers::list))
        .route("/v1/gpu/info", get(gpu::info))
        .layer(from_fn_with_state(auth_state, api_key_auth_middleware));

    // The streaming handshake authenticates itself by requiring a worker
    // id that must already be in the roster, and a browser WebSocket
    // client can't set a custom `auth-key` header on the upgrade request
    // anyway, so this route sits outside the API-key layer.
    let unauthenticated = Router::new().route("/ws/v1/speech-to-text", get(ws::stream_speech_to_text));

    Router::new().merge(authenticated).merge(unauthenticated).with_state(state)
}
