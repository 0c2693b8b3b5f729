use thiserror::Error;

/// Result type for graph store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for artifact repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Graph store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Artifact repository errors.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("artifact not empty, refusing to erase without force: {0}")]
    NotEmpty(String),

    #[error("invalid artifact location: {0}")]
    InvalidLocation(String),

    #[error("repository I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend error: {0}")]
    Backend(String),
}
