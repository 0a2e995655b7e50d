//! Scrutiny Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared plumbing for the Scrutiny workspace members:
//!
//! - **Logging**: one place to configure and install the `tracing` subscriber
//! - **Workers**: the start/close lifecycle every scheduled job implements
//! - **Errors**: typed failures of that lifecycle
//!
//! # Example
//!
//! ```no_run
//! use scrutiny_common::logging::{init_logging, LogConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let _guard = init_logging(&LogConfig::from_env()?)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod logging;
pub mod worker;

pub use error::WorkerError;
pub use worker::Worker;
