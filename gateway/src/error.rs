//! The API Gateway's error taxonomy (`spec.md` §7) and its HTTP
//! projection. Every downstream error surfaced to a client passes through
//! here exactly once so the status-code mapping in `spec.md` §7 lives in
//! a single place.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    AuthFailed(String),

    #[error("Worker configuration for model {0} not found")]
    UnknownWorker(String),

    #[error("{0}")]
    ValidationFailed(String),

    #[error("broker unavailable: {0}")]
    BrokerUnavailable(String),

    #[error("dispatch failed: {0}")]
    DispatchFailed(String),

    #[error("{0}")]
    WorkerFailure(String),

    #[error("Job timeout")]
    Timeout,

    #[error("storage error: {0}")]
    StorageFailed(String),

    #[error("stream closed: {0}")]
    StreamClosed(String),

    #[error("job {0} not found")]
    Unknown(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    detail: &'a str,
}

impl GatewayError {
    fn status(&self) -> StatusCode {
        match self {
            GatewayError::AuthFailed(_) => StatusCode::UNAUTHORIZED,
            GatewayError::UnknownWorker(_) => StatusCode::NOT_FOUND,
            GatewayError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GatewayError::Timeout => StatusCode::REQUEST_TIMEOUT,
            GatewayError::Unknown(_) => StatusCode::NOT_FOUND,
            GatewayError::BrokerUnavailable(_)
            | GatewayError::DispatchFailed(_)
            | GatewayError::WorkerFailure(_)
            | GatewayError::StorageFailed(_)
            | GatewayError::StreamClosed(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        (status, Json(ErrorBody { detail: &message })).into_response()
    }
}
