//! Typed per-operation results
//!
//! Stages log and continue on recoverable failures; these types record what
//! happened so callers and tests don't have to read log output.

use serde::Serialize;
use thiserror::Error;

use crate::error::EtlError;
use crate::models::ItemId;

/// Why an operation was not attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The sink already holds this story
    AlreadyIngested,
    /// The run's fan-out cap was reached; picked up by a later run
    OverFanOutCap,
    /// The run was cancelled first
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "detail")]
pub enum Outcome {
    Succeeded,
    Skipped(SkipReason),
    Failed(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

/// Result of handling one top-level story
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoryOutcome {
    pub story_id: ItemId,
    pub outcome: Outcome,
    /// Flat records handed downstream for this story
    pub records: usize,
}

impl StoryOutcome {
    pub fn skipped(story_id: ItemId, reason: SkipReason) -> Self {
        Self {
            story_id,
            outcome: Outcome::Skipped(reason),
            records: 0,
        }
    }
}

/// What the extractor did during one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractReport {
    /// Size of the existing-ID set used for dedup
    pub existing: usize,
    /// Length of the source's ranking
    pub top_level: usize,
    pub stories: Vec<StoryOutcome>,
    /// Set when the run stopped before any fetch, e.g. the sink listing failed
    pub aborted: Option<String>,
}

impl ExtractReport {
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self {
            aborted: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Flat records emitted across all stories
    pub fn emitted(&self) -> usize {
        self.stories.iter().map(|s| s.records).sum()
    }

    pub fn fetched(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.stories
            .iter()
            .filter(|s| s.outcome.is_success())
            .map(|s| s.story_id)
    }

    pub fn failed(&self) -> impl Iterator<Item = &StoryOutcome> {
        self.stories.iter().filter(|s| s.outcome.is_failure())
    }

    /// New stories left for later runs because of the fan-out cap
    pub fn deferred(&self) -> usize {
        self.count_skipped(SkipReason::OverFanOutCap)
    }

    pub fn count_skipped(&self, reason: SkipReason) -> usize {
        self.stories
            .iter()
            .filter(|s| s.outcome == Outcome::Skipped(reason))
            .count()
    }
}

/// Result of writing one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    /// 1-based position within the run
    pub batch: usize,
    pub size: usize,
    pub write: Outcome,
    pub status_reported: bool,
}

/// What the loader did during one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub batches: Vec<BatchOutcome>,
    /// Records received but never written because the run was cancelled
    pub dropped: usize,
    pub cancelled: bool,
}

impl LoadReport {
    pub fn records_written(&self) -> usize {
        self.batches
            .iter()
            .filter(|b| b.write.is_success())
            .map(|b| b.size)
            .sum()
    }

    pub fn write_failures(&self) -> usize {
        self.batches.iter().filter(|b| b.write.is_failure()).count()
    }
}

/// Summary of one full pipeline pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub extract: ExtractReport,
    pub transformed: usize,
    pub load: LoadReport,
}

/// The loader's final batch could not be written
#[derive(Error, Debug)]
#[error("final batch failed: {error}")]
pub struct LoadFailure {
    pub report: LoadReport,
    #[source]
    pub error: EtlError,
}

/// A pipeline pass that ended with the loader's terminal error
#[derive(Error, Debug)]
#[error("pipeline run failed: {error}")]
pub struct RunFailure {
    pub report: RunReport,
    #[source]
    pub error: EtlError,
}
