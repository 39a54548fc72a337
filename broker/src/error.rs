use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("amqp connection error: {0}")]
    Connect(#[from] lapin::Error),

    #[error("failed to encode message headers: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("delivery is missing an expected header: {0}")]
    MissingHeader(&'static str),

    #[error("delivery header {0} has an unexpected shape")]
    MalformedHeader(&'static str),
}
