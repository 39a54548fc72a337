use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unknown worker class: {0}")]
    UnknownWorkerClass(String),

    #[error("worker pool at capacity for class {0}")]
    PoolExhausted(String),

    #[error("worker panicked or returned an invalid payload: {0}")]
    WorkerFailed(String),

    #[error("failed to encode/decode payload: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("zeromq error: {0}")]
    Zmq(#[from] zmq::Error),
}

impl From<ServiceError> for tonic::Status {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::UnknownWorkerClass(_) => tonic::Status::not_found(err.to_string()),
            ServiceError::PoolExhausted(_) => tonic::Status::resource_exhausted(err.to_string()),
            ServiceError::WorkerFailed(_) => tonic::Status::internal(err.to_string()),
            ServiceError::Codec(_) => tonic::Status::invalid_argument(err.to_string()),
            ServiceError::Zmq(_) => tonic::Status::internal(err.to_string()),
        }
    }
}
