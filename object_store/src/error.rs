use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("local object store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("s3 put error: {0}")]
    Put(String),

    #[error("s3 presign error: {0}")]
    Presign(String),

    #[error("object {0}/{1} not found")]
    NotFound(String, String),
}
