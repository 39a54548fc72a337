//! Shared protocol-level error type.
//!
//! This is distinct from the gateway's `GatewayError` (HTTP-facing) and the
//! worker-service's `ServiceError` (RPC-facing): `ProtocolError` only covers
//! failures that occur while encoding or decoding wire types themselves.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("unknown response model class: {0}")]
    UnknownModelClass(String),

    #[error("invalid job id: {0}")]
    InvalidJobId(#[from] uuid::Error),
}
