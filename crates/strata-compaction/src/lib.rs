//! # strata-compaction
//!
//! Bin-pack compaction planning and rewrite orchestration for Strata.
//!
//! The crate turns a table scan into committed rewrites in three stages:
//!
//! 1. **Selection & Grouping**: a [`strategy::RewriteStrategy`] keeps the
//!    files worth rewriting and packs them into per-partition
//!    [`group::FileGroup`]s bounded by the maximum group size.
//! 2. **Sizing**: the bin-pack strategy decides per-group output file
//!    counts and split sizes against the target file size.
//! 3. **Orchestration**: the [`orchestrator::RewriteOrchestrator`] runs
//!    groups through an external [`rewriter::FileGroupRewriter`] with
//!    bounded concurrency, either all-or-nothing or with partial progress.
//!
//! The external collaborators (catalog scan, rewrite executor, snapshot
//! commit) appear only as the [`scan::TaskScan`] and
//! [`rewriter::FileGroupRewriter`] seams.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use strata_compaction::prelude::*;
//!
//! # async fn run() -> strata_compaction::error::Result<()> {
//! let result = RewriteDataFiles::new(
//!     Arc::new(StaticTaskScan::new(vec![])),
//!     Arc::new(NoopRewriter),
//! )
//! .with_option("target-file-size-bytes", "536870912")
//! .with_option("partial-progress.enabled", "true")
//! .execute()
//! .await?;
//! println!("rewrote {} files", result.rewritten_files_count());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod action;
pub mod binpack;
pub mod config;
pub mod error;
pub mod group;
pub mod metrics;
pub mod orchestrator;
pub mod rewriter;
pub mod scan;
pub mod strategy;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use strata_compaction::prelude::*;
/// ```
pub mod prelude {
    pub use crate::action::RewriteDataFiles;
    pub use crate::binpack::ListPacker;
    pub use crate::config::{BinPackConfig, Options, OrchestratorConfig};
    pub use crate::error::{Error, Result};
    pub use crate::group::{FileGroup, FileGroupInfo, FileGroupResult, RewriteResult};
    pub use crate::orchestrator::RewriteOrchestrator;
    pub use crate::rewriter::{DataFileHandle, FileGroupRewriter, NoopRewriter};
    pub use crate::scan::{ScanTask, ScanTaskStream, StaticTaskScan, TaskScan};
    pub use crate::strategy::{BinPackStrategy, RewriteStrategy, Strategy};
}

// Re-export key types at crate root for ergonomics
pub use action::RewriteDataFiles;
pub use error::{Error, Result};
pub use group::{FileGroup, FileGroupInfo, FileGroupResult, RewriteResult};
pub use orchestrator::RewriteOrchestrator;
pub use rewriter::{DataFileHandle, FileGroupRewriter, NoopRewriter};
pub use scan::{ScanTask, ScanTaskStream, StaticTaskScan, TaskScan};
pub use strategy::{BinPackStrategy, Strategy};
