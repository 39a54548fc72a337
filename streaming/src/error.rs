use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamingError {
    #[error("no free port in the configured range")]
    PortRangeExhausted,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zeromq error: {0}")]
    Zmq(#[from] zmq::Error),

    #[error("websocket frame did not match the declared stream type")]
    UnexpectedFrame,

    #[error("websocket frame was not valid utf-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("websocket transport error: {0}")]
    Ws(#[from] axum::Error),
}
