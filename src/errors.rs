use thiserror::Error;

pub type Result<T> = std::result::Result<T, MinerError>;

#[derive(Error, Debug)]
pub enum MinerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
