use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("unknown method: {0}")]
    UnknownMethod(String),

    #[error("method already registered: {0}")]
    DuplicateMethod(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
