use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing auth-key header")]
    MissingKey,
    #[error("invalid api key")]
    InvalidKey,
}
