//! Configuration management
//!
//! Every adapter receives its slice of [`EtlConfig`] through its constructor.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{EtlError, Result};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Ranked list of top-level story IDs.
pub const DEFAULT_TOP_STORIES_URL: &str = "https://hacker-news.firebaseio.com/v0/topstories.json";

/// Item endpoint returning a story with its full comment tree.
pub const DEFAULT_ITEM_URL: &str = "https://hn.algolia.com/api/v1/items";

/// Sink service of record.
pub const DEFAULT_SINK_URL: &str = "http://localhost:8000";

/// Job name reported to the sink's health endpoint.
pub const DEFAULT_JOB_NAME: &str = "hackernews";

/// New top-level stories fetched per run.
pub const DEFAULT_FAN_OUT_CAP: usize = 9;

/// Records per sink write.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Per-request timeout for both adapters.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// How the extractor decides which top-level stories are new
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DedupStrategy {
    /// List the sink before each run and skip stories it already holds
    #[default]
    SinkListing,
    /// Treat every ranked story as new
    Disabled,
}

impl std::str::FromStr for DedupStrategy {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sink_listing" | "sink" | "listing" => Ok(Self::SinkListing),
            "disabled" | "none" | "off" => Ok(Self::Disabled),
            _ => Err(EtlError::config(format!("Invalid dedup strategy: {s}"))),
        }
    }
}

/// Which ID a flattened descendant records as its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParentLinking {
    /// Every descendant points at the story root
    #[default]
    StoryRoot,
    /// Every descendant points at the node directly above it
    Structural,
}

impl std::str::FromStr for ParentLinking {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "story_root" | "root" => Ok(Self::StoryRoot),
            "structural" | "tree" => Ok(Self::Structural),
            _ => Err(EtlError::config(format!("Invalid parent linking: {s}"))),
        }
    }
}

/// Source adapter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub top_stories_url: String,
    /// Base URL; the story ID is appended as a path segment
    pub item_url: String,
}

/// Sink adapter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    pub base_url: String,
    /// Name under which job health is reported
    pub job_name: String,
}

/// Stage tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub fan_out_cap: usize,
    pub batch_size: usize,
    pub dedup: DedupStrategy,
    pub parent_linking: ParentLinking,
}

/// ETL configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtlConfig {
    pub source: SourceConfig,
    pub sink: SinkConfig,
    pub pipeline: PipelineConfig,
    pub http_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            top_stories_url: DEFAULT_TOP_STORIES_URL.to_string(),
            item_url: DEFAULT_ITEM_URL.to_string(),
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SINK_URL.to_string(),
            job_name: DEFAULT_JOB_NAME.to_string(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fan_out_cap: DEFAULT_FAN_OUT_CAP,
            batch_size: DEFAULT_BATCH_SIZE,
            dedup: DedupStrategy::default(),
            parent_linking: ParentLinking::default(),
        }
    }
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            sink: SinkConfig::default(),
            pipeline: PipelineConfig::default(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl EtlConfig {
    /// Load configuration from `.env`, environment variables and defaults
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            source: SourceConfig {
                top_stories_url: env_or("HN_TOP_STORIES_URL", defaults.source.top_stories_url),
                item_url: env_or("HN_ITEM_URL", defaults.source.item_url),
            },
            sink: SinkConfig {
                base_url: env_or("SCRUTINY_SINK_URL", defaults.sink.base_url),
                job_name: env_or("SCRUTINY_JOB_NAME", defaults.sink.job_name),
            },
            pipeline: PipelineConfig {
                fan_out_cap: env_parsed("ETL_FAN_OUT_CAP")?
                    .unwrap_or(defaults.pipeline.fan_out_cap),
                batch_size: env_parsed("ETL_BATCH_SIZE")?.unwrap_or(defaults.pipeline.batch_size),
                dedup: env_parsed("ETL_DEDUP")?.unwrap_or(defaults.pipeline.dedup),
                parent_linking: env_parsed("ETL_PARENT_LINKING")?
                    .unwrap_or(defaults.pipeline.parent_linking),
            },
            http_timeout_secs: env_parsed("ETL_HTTP_TIMEOUT_SECS")?
                .unwrap_or(defaults.http_timeout_secs),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.fan_out_cap == 0 {
            return Err(EtlError::config("ETL_FAN_OUT_CAP must be greater than 0"));
        }
        if self.pipeline.batch_size == 0 {
            return Err(EtlError::config("ETL_BATCH_SIZE must be greater than 0"));
        }
        if self.http_timeout_secs == 0 {
            return Err(EtlError::config("ETL_HTTP_TIMEOUT_SECS must be greater than 0"));
        }
        if self.sink.job_name.trim().is_empty() {
            return Err(EtlError::config("SCRUTINY_JOB_NAME cannot be empty"));
        }

        for (name, value) in [
            ("HN_TOP_STORIES_URL", &self.source.top_stories_url),
            ("HN_ITEM_URL", &self.source.item_url),
            ("SCRUTINY_SINK_URL", &self.sink.base_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| EtlError::config(format!("{name} is not a valid URL ({value}): {e}")))?;
        }

        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parsed<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| EtlError::config(format!("{key}={raw}: {e}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EtlConfig::default();
        config.validate().unwrap();
        assert_eq!(config.pipeline.fan_out_cap, 9);
        assert_eq!(config.pipeline.batch_size, 100);
        assert_eq!(config.pipeline.dedup, DedupStrategy::SinkListing);
        assert_eq!(config.pipeline.parent_linking, ParentLinking::StoryRoot);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = EtlConfig::default();
        config.pipeline.batch_size = 0;
        assert!(matches!(config.validate(), Err(EtlError::Config(_))));
    }

    #[test]
    fn test_bad_sink_url_rejected() {
        let mut config = EtlConfig::default();
        config.sink.base_url = "not a url".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("SCRUTINY_SINK_URL"));
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("none".parse::<DedupStrategy>().unwrap(), DedupStrategy::Disabled);
        assert_eq!("Sink_Listing".parse::<DedupStrategy>().unwrap(), DedupStrategy::SinkListing);
        assert_eq!("tree".parse::<ParentLinking>().unwrap(), ParentLinking::Structural);
        assert!("sideways".parse::<ParentLinking>().is_err());
    }
}
