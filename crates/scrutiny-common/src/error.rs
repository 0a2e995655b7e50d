//! Error types shared across Scrutiny crates

use thiserror::Error;

/// Failure of a [`Worker`](crate::worker::Worker) lifecycle
///
/// `close` always runs after `start`, so both halves can fail in one run.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("worker '{worker}' failed to start: {error:#}")]
    Start {
        worker: String,
        error: anyhow::Error,
    },

    #[error("worker '{worker}' failed to close: {error:#}")]
    Close {
        worker: String,
        error: anyhow::Error,
    },

    #[error("worker '{worker}' failed: {start:#} with {close:#}")]
    Both {
        worker: String,
        start: anyhow::Error,
        close: anyhow::Error,
    },
}

impl WorkerError {
    pub fn worker(&self) -> &str {
        match self {
            WorkerError::Start { worker, .. }
            | WorkerError::Close { worker, .. }
            | WorkerError::Both { worker, .. } => worker,
        }
    }
}
