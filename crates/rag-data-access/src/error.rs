#[derive(Debug, thiserror::Error)]
pub enum DataAccessError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Cache expired: {0}")]
    Expired(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type DataAccessResult<T> = Result<T, DataAccessError>;
