//! Extract, transform and load wired into one cancellable run
//!
//! ```text
//! ContentSource ──► Extractor ──► Transformer ──► Loader ──► RecordSink
//!                  (fan-out)     (normalize)     (batch)
//! ```
//!
//! Stages hand records over on capacity-1 channels and share one
//! [`CancellationToken`]. [`NewsEtl`] exposes a run through the
//! [`Worker`] lifecycle used by the scheduler.

pub mod extract;
pub mod flatten;
pub mod load;
pub mod outcome;
pub mod transform;

pub use extract::Extractor;
pub use flatten::flatten;
pub use load::Loader;
pub use outcome::{
    BatchOutcome, ExtractReport, LoadFailure, LoadReport, Outcome, RunFailure, RunReport,
    SkipReason, StoryOutcome,
};
pub use transform::normalize;

use async_trait::async_trait;
use scrutiny_common::Worker;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::config::{EtlConfig, PipelineConfig};
use crate::error::{EtlError, Result};
use crate::sink::{HttpSink, RecordSink};
use crate::source::{ContentSource, HackerNewsSource};

/// One configured source-to-sink pipeline
pub struct Pipeline {
    extractor: Extractor,
    loader: Loader,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn ContentSource>,
        sink: Arc<dyn RecordSink>,
        config: &PipelineConfig,
        job_name: impl Into<String>,
    ) -> Self {
        Self {
            extractor: Extractor::new(source, Arc::clone(&sink), config),
            loader: Loader::new(sink, config.batch_size, job_name),
        }
    }

    /// Run every stage once and wait for all of them
    ///
    /// Stages observe a child of `cancel`, so stopping this run never cancels
    /// the caller. Returns the loader's terminal error, or an extraction abort.
    #[instrument(skip_all)]
    pub async fn run(&self, cancel: &CancellationToken) -> std::result::Result<RunReport, RunFailure> {
        let run_cancel = cancel.child_token();

        let (flat, extract_handle) = self.extractor.spawn(run_cancel.clone());
        let (canonical, transform_handle) = transform::spawn(flat, run_cancel.clone());
        let loaded = self.loader.load(canonical, &run_cancel).await;

        // Nothing downstream is listening any more
        run_cancel.cancel();

        let mut task_error = None;
        let extract = match extract_handle.await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "Extract task failed");
                task_error = Some(EtlError::from(e));
                ExtractReport::default()
            },
        };
        let transformed = match transform_handle.await {
            Ok(forwarded) => forwarded,
            Err(e) => {
                error!(error = %e, "Transform task failed");
                task_error.get_or_insert(EtlError::from(e));
                0
            },
        };

        let (load, load_error) = match loaded {
            Ok(load) => (load, None),
            Err(LoadFailure { report, error }) => (report, Some(error)),
        };
        let aborted = extract.aborted.clone().map(EtlError::ExtractAborted);

        let report = RunReport {
            extract,
            transformed,
            load,
        };
        info!(
            emitted = report.extract.emitted(),
            transformed = report.transformed,
            written = report.load.records_written(),
            failed_batches = report.load.write_failures(),
            deferred = report.extract.deferred(),
            "Pipeline run finished"
        );

        match load_error.or(aborted).or(task_error) {
            Some(error) => Err(RunFailure { report, error }),
            None => Ok(report),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    Closing,
}

/// The Hacker News ETL job
pub struct NewsEtl {
    name: String,
    pipeline: Pipeline,
    state: PipelineState,
    last_report: Option<RunReport>,
}

impl NewsEtl {
    pub fn new(pipeline: Pipeline, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pipeline,
            state: PipelineState::Idle,
            last_report: None,
        }
    }

    /// Build the job with HTTP adapters sharing one client
    pub fn from_config(config: EtlConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .user_agent(concat!("scrutiny-etl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let source = Arc::new(HackerNewsSource::new(client.clone(), config.source));
        let sink = Arc::new(HttpSink::new(client, config.sink.clone()));
        let pipeline = Pipeline::new(source, sink, &config.pipeline, config.sink.job_name.clone());

        Ok(Self::new(pipeline, config.sink.job_name))
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Report of the most recent run, including failed ones
    pub fn last_report(&self) -> Option<&RunReport> {
        self.last_report.as_ref()
    }
}

#[async_trait]
impl Worker for NewsEtl {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&mut self, cancel: &CancellationToken) -> anyhow::Result<()> {
        if self.state != PipelineState::Idle {
            return Err(EtlError::InvalidState(format!(
                "cannot start {} while {:?}",
                self.name, self.state
            ))
            .into());
        }
        self.state = PipelineState::Running;
        info!(job = %self.name, "Starting ETL run");

        match self.pipeline.run(cancel).await {
            Ok(report) => {
                self.last_report = Some(report);
                Ok(())
            },
            Err(RunFailure { report, error }) => {
                self.last_report = Some(report);
                Err(error.into())
            },
        }
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        match self.state {
            PipelineState::Idle => Ok(()),
            PipelineState::Closing => Err(EtlError::InvalidState(format!(
                "{} is already closing",
                self.name
            ))
            .into()),
            PipelineState::Running => {
                self.state = PipelineState::Closing;
                if let Some(report) = &self.last_report {
                    if report.load.cancelled {
                        warn!(job = %self.name, dropped = report.load.dropped, "Run was cancelled");
                    }
                }
                info!(job = %self.name, "Closed ETL run");
                self.state = PipelineState::Idle;
                Ok(())
            },
        }
    }
}
