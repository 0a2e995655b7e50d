//! Start/close lifecycle for scheduled jobs
//!
//! A scheduler only knows how to call [`run`]: it starts the worker, waits for it,
//! and then closes it no matter how `start` ended.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::WorkerError;

/// A unit of scheduled work
#[async_trait]
pub trait Worker: Send {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Run one pass, returning once the work is done or `cancel` fires
    async fn start(&mut self, cancel: &CancellationToken) -> anyhow::Result<()>;

    /// Release whatever `start` acquired
    async fn close(&mut self) -> anyhow::Result<()>;
}

/// Start the worker, then always close it
pub async fn run<W>(worker: &mut W, cancel: &CancellationToken) -> Result<(), WorkerError>
where
    W: Worker + ?Sized,
{
    let started = worker.start(cancel).await;
    let closed = worker.close().await;
    let name = worker.name().to_string();

    match (started, closed) {
        (Ok(()), Ok(())) => {
            debug!(worker = %name, "Worker pass finished");
            Ok(())
        },
        (Err(start), Ok(())) => Err(WorkerError::Start {
            worker: name,
            error: start,
        }),
        (Ok(()), Err(close)) => Err(WorkerError::Close {
            worker: name,
            error: close,
        }),
        (Err(start), Err(close)) => {
            warn!(worker = %name, "Both start and close failed");
            Err(WorkerError::Both {
                worker: name,
                start,
                close,
            })
        },
    }
}
