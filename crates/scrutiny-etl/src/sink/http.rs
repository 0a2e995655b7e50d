//! HTTP client for the Scrutiny news API

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::debug;

use super::RecordSink;
use crate::config::SinkConfig;
use crate::error::{EtlError, Result};
use crate::models::{CanonicalRecord, JobStatus, RecordSummary};

/// Page of a paginated listing
#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    count: Option<u64>,
    #[serde(default)]
    next: Option<String>,
    results: Vec<RecordSummary>,
}

pub struct HttpSink {
    client: Client,
    config: SinkConfig,
}

impl HttpSink {
    pub fn new(client: Client, config: SinkConfig) -> Self {
        Self { client, config }
    }

    fn news_url(&self) -> String {
        format!("{}/api/news/", self.config.base_url.trim_end_matches('/'))
    }

    fn job_url(&self, name: &str) -> String {
        format!("{}/api/jobs/{}/", self.config.base_url.trim_end_matches('/'), name)
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> Result<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EtlError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl RecordSink for HttpSink {
    async fn list_existing(&self) -> Result<Vec<RecordSummary>> {
        let mut records = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(format!("{}?page=1", self.news_url()));

        while let Some(url) = next.take() {
            if !visited.insert(url.clone()) {
                return Err(EtlError::Sink(format!("pagination loops back to {url}")));
            }
            let response = self.send(self.client.get(&url), &url).await?;
            let page: Page = response.json().await?;
            debug!(url = %url, count = ?page.count, page_len = page.results.len(), "Listed sink page");
            records.extend(page.results);
            next = page.next;
        }

        Ok(records)
    }

    async fn create_batch(&self, records: &[CanonicalRecord]) -> Result<()> {
        let url = self.news_url();
        self.send(self.client.post(&url).json(records), &url).await?;
        Ok(())
    }

    async fn report_status(&self, status: &JobStatus) -> Result<()> {
        let url = self.job_url(&status.name);
        self.send(self.client.put(&url).json(status), &url).await?;
        Ok(())
    }
}
