use thiserror::Error;

/// Top-level error type for the embedline pipeline.
#[derive(Debug, Error)]
pub enum EmbedlineError {
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Persist error: {0}")]
    Persist(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Failures talking to an inference endpoint.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Expected {expected} embeddings, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Gave up after {attempts} attempt(s): {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

/// Failures producing documents.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed record at line {line}: {reason}")]
    Malformed { line: u64, reason: String },

    #[error("Store query failed: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, EmbedlineError>;
