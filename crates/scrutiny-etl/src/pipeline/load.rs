//! Batching and sink writes

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::outcome::{BatchOutcome, LoadFailure, LoadReport, Outcome};
use crate::error::Result;
use crate::models::{CanonicalRecord, JobStatus};
use crate::sink::RecordSink;

/// Accumulates canonical records into fixed-size batches and writes them
pub struct Loader {
    sink: Arc<dyn RecordSink>,
    batch_size: usize,
    job_name: String,
}

impl Loader {
    pub fn new(sink: Arc<dyn RecordSink>, batch_size: usize, job_name: impl Into<String>) -> Self {
        Self {
            sink,
            batch_size: batch_size.max(1),
            job_name: job_name.into(),
        }
    }

    /// Drain `input` into the sink
    ///
    /// Full batches are written as they fill; a failed write is logged and the
    /// loop moves on. Whatever remains when the input closes is written as a
    /// final batch whose failure is returned. Job health is reported after every
    /// attempted batch, so "Healthy" means the pass ran, not that every write
    /// landed. On cancellation the unflushed remainder is dropped.
    pub async fn load(
        &self,
        mut input: mpsc::Receiver<CanonicalRecord>,
        cancel: &CancellationToken,
    ) -> std::result::Result<LoadReport, LoadFailure> {
        let mut report = LoadReport::default();
        let mut batch = Vec::with_capacity(self.batch_size);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    report.cancelled = true;
                    report.dropped = batch.len();
                    break;
                }
                next = input.recv() => next,
            };

            let Some(record) = next else { break };
            batch.push(record);

            if batch.len() >= self.batch_size {
                let full = std::mem::replace(&mut batch, Vec::with_capacity(self.batch_size));
                let outcome = self.write_intermediate(report.batches.len() + 1, full).await;
                report.batches.push(outcome);
            }
        }

        if report.cancelled {
            info!(dropped = report.dropped, "Load cancelled, unflushed records dropped");
            return Ok(report);
        }

        if !batch.is_empty() {
            let number = report.batches.len() + 1;
            let size = batch.len();
            let mut outcome = BatchOutcome {
                batch: number,
                size,
                write: Outcome::Succeeded,
                status_reported: false,
            };

            if let Err(error) = self.sink.create_batch(&batch).await {
                outcome.write = Outcome::Failed(error.to_string());
                report.batches.push(outcome);
                return Err(LoadFailure { report, error });
            }
            info!(batch = number, size, "Added stories");

            if let Err(error) = self.report_healthy().await {
                report.batches.push(outcome);
                return Err(LoadFailure { report, error });
            }
            outcome.status_reported = true;
            report.batches.push(outcome);
        }

        info!(
            batches = report.batches.len(),
            written = report.records_written(),
            failed_batches = report.write_failures(),
            "Load finished"
        );
        Ok(report)
    }

    async fn write_intermediate(&self, number: usize, records: Vec<CanonicalRecord>) -> BatchOutcome {
        let size = records.len();
        let write = match self.sink.create_batch(&records).await {
            Ok(()) => {
                info!(batch = number, size, "Added stories");
                Outcome::Succeeded
            },
            Err(e) => {
                warn!(batch = number, size, error = %e, "Batch write failed, continuing");
                Outcome::Failed(e.to_string())
            },
        };

        let status_reported = match self.report_healthy().await {
            Ok(()) => true,
            Err(e) => {
                warn!(batch = number, error = %e, "Job status update failed");
                false
            },
        };

        BatchOutcome {
            batch: number,
            size,
            write,
            status_reported,
        }
    }

    async fn report_healthy(&self) -> Result<()> {
        self.sink.report_status(&JobStatus::healthy(&self.job_name)).await?;
        debug!(job = %self.job_name, "Updated job status");
        Ok(())
    }
}
