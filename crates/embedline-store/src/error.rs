use thiserror::Error;

/// Storage error type for shard files, progress markers and document stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Nothing to write")]
    EmptyBatch,

    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<StoreError> for embedline_core::error::EmbedlineError {
    fn from(e: StoreError) -> Self {
        embedline_core::error::EmbedlineError::Persist(e.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        StoreError::Task(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
