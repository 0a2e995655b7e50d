//! Error types for the Scrutiny ETL

use thiserror::Error;

/// Result type alias for ETL operations
pub type Result<T> = std::result::Result<T, EtlError>;

/// Errors raised by adapters and the pipeline runner
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} responded with {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid pipeline state: {0}")]
    InvalidState(String),

    #[error("Source error: {0}")]
    Source(String),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("Extraction aborted: {0}")]
    ExtractAborted(String),

    #[error("Pipeline task failed: {0}")]
    TaskFailed(String),
}

impl EtlError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<tokio::task::JoinError> for EtlError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskFailed(err.to_string())
    }
}
