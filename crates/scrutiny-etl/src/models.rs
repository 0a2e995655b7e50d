//! Records that flow through the pipeline
//!
//! A [`ContentNode`] tree comes from the source, is flattened into
//! [`FlatRecord`]s, normalized into [`CanonicalRecord`]s and written to the sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

/// Source-assigned identifier, unique within the source
pub type ItemId = u64;

/// One node of a story tree as returned by the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
    pub id: ItemId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, alias = "parent")]
    pub parent_id: Option<ItemId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub points: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<ContentNode>,
}

impl Drop for ContentNode {
    // The derived drop recurses once per level; threads can be arbitrarily deep
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// A node stripped of its children, carrying an explicit parent link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRecord {
    pub id: ItemId,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub parent_id: Option<ItemId>,
    pub points: u64,
    pub title: String,
    pub text: String,
    pub kind: String,
    pub url: String,
}

impl FlatRecord {
    /// Copy a node's own fields, dropping its children
    pub fn from_node(node: &ContentNode, parent_id: Option<ItemId>) -> Self {
        Self {
            id: node.id,
            author: node.author.clone(),
            created_at: node.created_at,
            parent_id,
            points: node.points,
            title: node.title.clone(),
            text: node.text.clone(),
            kind: node.kind.clone(),
            url: node.url.clone(),
        }
    }
}

/// The normalized unit written to the sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub id: ItemId,
    pub slug: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "parent")]
    pub parent_id: Option<ItemId>,
    pub points: u64,
    pub title: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

impl CanonicalRecord {
    /// Project back onto the intermediate shape, dropping the slug
    pub fn to_flat(&self) -> FlatRecord {
        FlatRecord {
            id: self.id,
            author: self.author.clone(),
            created_at: self.created_at,
            parent_id: self.parent_id,
            points: self.points,
            title: self.title.clone(),
            text: self.text.clone(),
            kind: self.kind.clone(),
            url: self.url.clone(),
        }
    }
}

/// The part of a sink record the pipeline needs for dedup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSummary {
    pub id: ItemId,
}

/// IDs already present in the sink, built once per run
#[derive(Debug, Clone, Default)]
pub struct ExistingIds(HashSet<ItemId>);

impl ExistingIds {
    pub fn contains(&self, id: ItemId) -> bool {
        self.0.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<ItemId> for ExistingIds {
    fn from_iter<I: IntoIterator<Item = ItemId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Health status values understood by the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
}

/// Job health reported after each load batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub name: String,
    pub status: HealthStatus,
}

impl JobStatus {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Healthy,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
