//! In-memory adapters for pipeline integration tests
//!
//! [`FakeSource`] serves fixed story trees, [`FakeSink`] records every call.
//! Both can be told to fail specific calls.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use scrutiny_etl::error::{EtlError, Result};
use scrutiny_etl::models::{CanonicalRecord, ContentNode, ItemId, JobStatus, RecordSummary};
use scrutiny_etl::sink::RecordSink;
use scrutiny_etl::source::ContentSource;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

pub fn node(id: ItemId, kind: &str, children: Vec<ContentNode>) -> ContentNode {
    ContentNode {
        id,
        author: format!("user{id}"),
        created_at: "2024-05-01T08:30:00Z".parse().unwrap(),
        parent_id: None,
        points: 1,
        title: String::new(),
        text: String::new(),
        kind: kind.to_string(),
        url: String::new(),
        children,
    }
}

pub fn story(id: ItemId, children: Vec<ContentNode>) -> ContentNode {
    let mut story = node(id, "story", children);
    story.title = format!("Story {id}");
    story
}

pub fn comment(id: ItemId, children: Vec<ContentNode>) -> ContentNode {
    node(id, "comment", children)
}

/// A story with `comments` direct replies, IDs `id * 10_000 + 1..`
pub fn wide_story(id: ItemId, comments: u64) -> ContentNode {
    story(
        id,
        (1..=comments).map(|i| comment(id * 10_000 + i, vec![])).collect(),
    )
}

#[derive(Default)]
pub struct FakeSource {
    ranking: Vec<ItemId>,
    trees: HashMap<ItemId, ContentNode>,
    failing: HashSet<ItemId>,
    fail_ranking: bool,
    fetched: Mutex<Vec<ItemId>>,
}

impl FakeSource {
    /// Ranked in the order given
    pub fn new(trees: Vec<ContentNode>) -> Self {
        Self {
            ranking: trees.iter().map(|t| t.id).collect(),
            trees: trees.into_iter().map(|t| (t.id, t)).collect(),
            ..Default::default()
        }
    }

    pub fn failing(mut self, id: ItemId) -> Self {
        self.failing.insert(id);
        self
    }

    pub fn failing_ranking(mut self) -> Self {
        self.fail_ranking = true;
        self
    }

    /// IDs passed to `fetch_node`, sorted
    pub fn fetched(&self) -> Vec<ItemId> {
        let mut ids = self.fetched.lock().unwrap().clone();
        ids.sort_unstable();
        ids
    }
}

#[async_trait]
impl ContentSource for FakeSource {
    async fn list_top_level_ids(&self) -> Result<Vec<ItemId>> {
        if self.fail_ranking {
            return Err(EtlError::Source("ranking unavailable".into()));
        }
        Ok(self.ranking.clone())
    }

    async fn fetch_node(&self, id: ItemId) -> Result<ContentNode> {
        self.fetched.lock().unwrap().push(id);
        if self.failing.contains(&id) {
            return Err(EtlError::Source(format!("item {id} unavailable")));
        }
        self.trees
            .get(&id)
            .cloned()
            .ok_or_else(|| EtlError::Source(format!("item {id} not found")))
    }
}

/// Ranks the given stories but never answers a fetch
pub struct HangingSource {
    ranking: Vec<ItemId>,
}

impl HangingSource {
    pub fn new(ranking: Vec<ItemId>) -> Self {
        Self { ranking }
    }
}

#[async_trait]
impl ContentSource for HangingSource {
    async fn list_top_level_ids(&self) -> Result<Vec<ItemId>> {
        Ok(self.ranking.clone())
    }

    async fn fetch_node(&self, _id: ItemId) -> Result<ContentNode> {
        std::future::pending().await
    }
}

#[derive(Default)]
pub struct FakeSink {
    existing: Vec<ItemId>,
    fail_listing: bool,
    /// 1-based `create_batch` calls that fail
    failing_batches: HashSet<usize>,
    fail_status: bool,
    /// Cancelled from inside the first `create_batch` call
    cancel_on_write: Option<CancellationToken>,
    attempts: Mutex<Vec<Vec<CanonicalRecord>>>,
    statuses: Mutex<Vec<JobStatus>>,
}

impl FakeSink {
    pub fn with_existing(existing: impl IntoIterator<Item = ItemId>) -> Self {
        Self {
            existing: existing.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn failing_batch(mut self, call: usize) -> Self {
        self.failing_batches.insert(call);
        self
    }

    pub fn failing_status(mut self) -> Self {
        self.fail_status = true;
        self
    }

    pub fn cancelling_on_first_write(mut self, cancel: CancellationToken) -> Self {
        self.cancel_on_write = Some(cancel);
        self
    }

    /// Every batch passed to `create_batch`, failed ones included
    pub fn attempts(&self) -> Vec<Vec<CanonicalRecord>> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.attempts().iter().map(Vec::len).collect()
    }

    /// IDs of every attempted record, sorted
    pub fn written_ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<_> = self.attempts().into_iter().flatten().map(|r| r.id).collect();
        ids.sort_unstable();
        ids
    }

    pub fn statuses(&self) -> Vec<JobStatus> {
        self.statuses.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordSink for FakeSink {
    async fn list_existing(&self) -> Result<Vec<RecordSummary>> {
        if self.fail_listing {
            return Err(EtlError::Sink("listing unavailable".into()));
        }
        Ok(self.existing.iter().map(|&id| RecordSummary { id }).collect())
    }

    async fn create_batch(&self, records: &[CanonicalRecord]) -> Result<()> {
        let call = {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.push(records.to_vec());
            attempts.len()
        };
        if let Some(cancel) = &self.cancel_on_write {
            cancel.cancel();
        }
        if self.failing_batches.contains(&call) {
            return Err(EtlError::Sink(format!("batch {call} rejected")));
        }
        Ok(())
    }

    async fn report_status(&self, status: &JobStatus) -> Result<()> {
        self.statuses.lock().unwrap().push(status.clone());
        if self.fail_status {
            return Err(EtlError::Sink("status endpoint down".into()));
        }
        Ok(())
    }
}
