//! Extraction stage
//!
//! Lists what the sink already holds, picks the new top-level stories up to the
//! fan-out cap, fetches them concurrently and fans their flattened records into
//! a single output stream.
//!
//! Each fetch task owns its own handoff channel; one fan-in loop merges them.
//! Records of one story keep their pre-order, records of different stories
//! interleave in no particular order.

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::flatten::flatten;
use super::outcome::{ExtractReport, Outcome, SkipReason, StoryOutcome};
use crate::config::{DedupStrategy, ParentLinking, PipelineConfig};
use crate::error::Result;
use crate::models::{ExistingIds, FlatRecord, ItemId};
use crate::sink::RecordSink;
use crate::source::ContentSource;

#[derive(Clone)]
pub struct Extractor {
    source: Arc<dyn ContentSource>,
    sink: Arc<dyn RecordSink>,
    fan_out_cap: usize,
    dedup: DedupStrategy,
    linking: ParentLinking,
}

impl Extractor {
    pub fn new(
        source: Arc<dyn ContentSource>,
        sink: Arc<dyn RecordSink>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            source,
            sink,
            fan_out_cap: config.fan_out_cap,
            dedup: config.dedup,
            linking: config.parent_linking,
        }
    }

    /// Run extraction on its own task
    ///
    /// The returned stream closes once every fetch has finished, or early on
    /// cancellation.
    pub fn spawn(
        &self,
        cancel: CancellationToken,
    ) -> (mpsc::Receiver<FlatRecord>, JoinHandle<ExtractReport>) {
        let (tx, rx) = mpsc::channel(1);
        let extractor = self.clone();
        let handle = tokio::spawn(async move { extractor.extract(tx, &cancel).await });
        (rx, handle)
    }

    /// Send every new story's flattened records into `out`
    pub async fn extract(
        &self,
        out: mpsc::Sender<FlatRecord>,
        cancel: &CancellationToken,
    ) -> ExtractReport {
        let existing = match cancellable(cancel, self.existing_ids()).await {
            None => return ExtractReport::default(),
            Some(Ok(existing)) => existing,
            Some(Err(e)) => {
                error!(error = %e, "Failed to list existing sink records");
                return ExtractReport::aborted(format!("listing existing records: {e}"));
            },
        };

        let ranking = match cancellable(cancel, self.source.list_top_level_ids()).await {
            None => return ExtractReport::default(),
            Some(Ok(ranking)) => ranking,
            Some(Err(e)) => {
                error!(error = %e, "Failed to fetch top story ranking");
                return ExtractReport {
                    existing: existing.len(),
                    ..ExtractReport::aborted(format!("listing top stories: {e}"))
                };
            },
        };

        let (selected, mut stories) = self.select(&ranking, &existing);
        let deferred = stories
            .iter()
            .filter(|s| s.outcome == Outcome::Skipped(SkipReason::OverFanOutCap))
            .count();
        info!(
            existing = existing.len(),
            top_level = ranking.len(),
            selected = selected.len(),
            deferred,
            "Extracting new top stories"
        );
        if deferred > 0 {
            warn!(deferred, fan_out_cap = self.fan_out_cap, "New stories left for a later run");
        }

        let mut handles = Vec::with_capacity(selected.len());
        let mut streams = Vec::with_capacity(selected.len());
        for &story_id in &selected {
            let (tx, rx) = mpsc::channel(1);
            streams.push(ReceiverStream::new(rx));
            handles.push((
                story_id,
                tokio::spawn(fetch_story(
                    Arc::clone(&self.source),
                    story_id,
                    self.linking,
                    tx,
                    cancel.clone(),
                )),
            ));
        }

        fan_in(stream::select_all(streams), out, cancel).await;

        for (story_id, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(story_id, error = %e, "Story fetch task panicked");
                    StoryOutcome {
                        story_id,
                        outcome: Outcome::Failed(format!("fetch task failed: {e}")),
                        records: 0,
                    }
                },
            };
            stories.push(outcome);
        }

        let report = ExtractReport {
            existing: existing.len(),
            top_level: ranking.len(),
            stories: order_by_ranking(stories, &ranking),
            aborted: None,
        };
        info!(
            emitted = report.emitted(),
            failed = report.failed().count(),
            cancelled = cancel.is_cancelled(),
            "Finished extracting top stories"
        );
        report
    }

    async fn existing_ids(&self) -> Result<ExistingIds> {
        match self.dedup {
            DedupStrategy::Disabled => Ok(ExistingIds::default()),
            DedupStrategy::SinkListing => {
                let records = self.sink.list_existing().await?;
                let existing: ExistingIds = records.into_iter().map(|r| r.id).collect();
                if existing.is_empty() {
                    info!("Sink holds no records yet, every ranked story is new");
                }
                Ok(existing)
            },
        }
    }

    /// Split the ranking into stories to fetch now and skipped ones
    fn select(
        &self,
        ranking: &[ItemId],
        existing: &ExistingIds,
    ) -> (Vec<ItemId>, Vec<StoryOutcome>) {
        let mut seen = HashSet::with_capacity(ranking.len());
        let mut selected = Vec::with_capacity(self.fan_out_cap);
        let mut skipped = Vec::new();

        for &story_id in ranking {
            if !seen.insert(story_id) {
                continue;
            }
            if existing.contains(story_id) {
                skipped.push(StoryOutcome::skipped(story_id, SkipReason::AlreadyIngested));
            } else if selected.len() < self.fan_out_cap {
                selected.push(story_id);
            } else {
                skipped.push(StoryOutcome::skipped(story_id, SkipReason::OverFanOutCap));
            }
        }

        (selected, skipped)
    }
}

/// Fetch one story and push its flattened records into its own channel
async fn fetch_story(
    source: Arc<dyn ContentSource>,
    story_id: ItemId,
    linking: ParentLinking,
    tx: mpsc::Sender<FlatRecord>,
    cancel: CancellationToken,
) -> StoryOutcome {
    let node = match cancellable(&cancel, source.fetch_node(story_id)).await {
        None => return StoryOutcome::skipped(story_id, SkipReason::Cancelled),
        Some(Ok(node)) => node,
        Some(Err(e)) => {
            warn!(story_id, error = %e, "Story fetch failed, skipping");
            return StoryOutcome {
                story_id,
                outcome: Outcome::Failed(e.to_string()),
                records: 0,
            };
        },
    };

    let mut records = 0;
    for record in flatten(&node, linking) {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return StoryOutcome {
                    story_id,
                    outcome: Outcome::Skipped(SkipReason::Cancelled),
                    records,
                };
            }
            sent = tx.send(record) => {
                if sent.is_err() {
                    return StoryOutcome {
                        story_id,
                        outcome: Outcome::Failed("output stream closed".to_string()),
                        records,
                    };
                }
                records += 1;
            }
        }
    }

    debug!(story_id, records, "Story flattened");
    StoryOutcome {
        story_id,
        outcome: Outcome::Succeeded,
        records,
    }
}

/// Forward merged per-story records to the shared output until all fetchers finish
async fn fan_in<S>(mut merged: S, out: mpsc::Sender<FlatRecord>, cancel: &CancellationToken)
where
    S: futures::Stream<Item = FlatRecord> + Unpin,
{
    loop {
        let record = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            next = merged.next() => match next {
                Some(record) => record,
                None => return,
            },
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            sent = out.send(record) => {
                if sent.is_err() {
                    debug!("Transformer hung up, stopping extraction");
                    return;
                }
            }
        }
    }
}

async fn cancellable<F, T>(cancel: &CancellationToken, fut: F) -> Option<T>
where
    F: std::future::Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        value = fut => Some(value),
    }
}

fn order_by_ranking(mut stories: Vec<StoryOutcome>, ranking: &[ItemId]) -> Vec<StoryOutcome> {
    let position: std::collections::HashMap<ItemId, usize> = ranking
        .iter()
        .enumerate()
        .rev()
        .map(|(i, &id)| (id, i))
        .collect();
    stories.sort_by_key(|s| position.get(&s.story_id).copied().unwrap_or(usize::MAX));
    stories
}
