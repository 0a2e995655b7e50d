//! Scrutiny ETL Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Pulls top stories and their comment threads from Hacker News into the
//! Scrutiny service of record.
//!
//! # Overview
//!
//! - **Source**: ranked story IDs and full story trees ([`source`])
//! - **Pipeline**: extract, transform and load over cancellable channels ([`pipeline`])
//! - **Sink**: dedup listing, batch writes and job health ([`sink`])
//!
//! # Example
//!
//! ```no_run
//! use scrutiny_etl::{EtlConfig, NewsEtl};
//! use scrutiny_common::worker;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut job = NewsEtl::from_config(EtlConfig::from_env()?)?;
//! worker::run(&mut job, &CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod sink;
pub mod source;

// Re-export commonly used types
pub use cli::{Cli, Commands};
pub use config::EtlConfig;
pub use error::{EtlError, Result};
pub use pipeline::{NewsEtl, Pipeline, RunReport};
