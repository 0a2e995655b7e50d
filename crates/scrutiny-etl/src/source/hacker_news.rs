//! Hacker News over HTTP
//!
//! Rankings come from the firebase API, trees from the Algolia items API, which
//! returns a story with all of its comments nested in one response.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::ContentSource;
use crate::config::SourceConfig;
use crate::error::{EtlError, Result};
use crate::models::{ContentNode, ItemId};

pub struct HackerNewsSource {
    client: Client,
    config: SourceConfig,
}

impl HackerNewsSource {
    pub fn new(client: Client, config: SourceConfig) -> Self {
        Self { client, config }
    }

    fn item_url(&self, id: ItemId) -> String {
        format!("{}/{}", self.config.item_url.trim_end_matches('/'), id)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EtlError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.bytes().await?;
        Ok(decode(&body)?)
    }
}

/// Parse JSON without serde_json's nesting limit
///
/// Each comment level costs two levels of JSON nesting, so the default limit
/// of 128 would reject threads deeper than 62 replies. The stack grows on the
/// heap as parsing descends.
fn decode<T: DeserializeOwned>(body: &[u8]) -> serde_json::Result<T> {
    let mut json = serde_json::Deserializer::from_slice(body);
    json.disable_recursion_limit();
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut json))?;
    json.end()?;
    Ok(value)
}

#[async_trait]
impl ContentSource for HackerNewsSource {
    async fn list_top_level_ids(&self) -> Result<Vec<ItemId>> {
        let ids: Vec<ItemId> = self.get_json(&self.config.top_stories_url).await?;
        debug!(count = ids.len(), "Fetched top story ranking");
        Ok(ids)
    }

    async fn fetch_node(&self, id: ItemId) -> Result<ContentNode> {
        let node: ContentNode = self.get_json(&self.item_url(id)).await?;
        if node.id != id {
            return Err(EtlError::Source(format!(
                "asked for item {id}, received item {}",
                node.id
            )));
        }
        Ok(node)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn reply_chain(depth: u64) -> String {
        let mut body = String::new();
        for id in 0..=depth {
            body.push_str(&format!(
                r#"{{"id":{id},"created_at":"2024-01-01T00:00:00Z","type":"comment","children":["#
            ));
        }
        for _ in 0..=depth {
            body.push_str("]}");
        }
        body
    }

    #[test]
    fn test_decode_very_deep_thread() {
        let node: ContentNode = decode(reply_chain(5_000).as_bytes()).unwrap();

        let mut depth = 0;
        let mut cursor = &node;
        while let Some(child) = cursor.children.first() {
            depth += 1;
            cursor = child;
        }
        assert_eq!(depth, 5_000);
        assert_eq!(cursor.id, 5_000);
    }

    #[test]
    fn test_decode_rejects_trailing_garbage() {
        let err = decode::<Vec<ItemId>>(b"[1,2] [3]").unwrap_err();
        assert!(err.is_syntax());
    }
}
