//! Sink adapters
//!
//! The sink is the service of record: it holds every ingested record and the
//! job's health status.

mod http;

pub use http::HttpSink;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CanonicalRecord, JobStatus, RecordSummary};

/// Write API of the service of record
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Every record the sink already holds
    async fn list_existing(&self) -> Result<Vec<RecordSummary>>;

    /// Store one batch of records
    async fn create_batch(&self, records: &[CanonicalRecord]) -> Result<()>;

    /// Publish the job's health
    async fn report_status(&self, status: &JobStatus) -> Result<()>;
}
