//! sourcesift - validation and reconciliation of content-source descriptors
//!
//! Takes a pile of imported source records, tags them, probes their endpoints,
//! throws out the dead ones and keeps the fastest record per domain.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`models`] - Core data structures and types
//! - [`classify`] - Name cleanup, URL resolution and tagging
//! - [`probe`] - Endpoint probing and the content-validity heuristic
//! - [`dedup`] - Domain-keyed deduplication
//! - [`pipeline`] - Stage orchestration
//! - [`storage`] - Input loading and bucket output
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use sourcesift::config::Config;
//! use sourcesift::pipeline::{Pipeline, PipelineContext};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let mut ctx = PipelineContext::new();
//!     let report = Pipeline::standard().run(&mut ctx, &config).await?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```

pub mod classify;
pub mod config;
pub mod dedup;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod probe;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::classify::{ClassificationEngine, DomainCache};
    pub use crate::config::Config;
    pub use crate::dedup::{deduplicate_by_domain, DedupOutcome};
    pub use crate::error::{Error, ErrorCategory, Result, SiftErrorTrait};
    pub use crate::models::{Bucket, BucketCounts, SourceRecord};
    pub use crate::pipeline::{Pipeline, PipelineContext, PipelineReport, Stage};
    pub use crate::probe::{ConcurrentProber, EndpointProbe, Verdict};
    pub use crate::storage::{BucketWriter, SourceLoader};
}

// Direct re-exports for convenience
pub use models::{Bucket, BucketCounts, SourceRecord};
