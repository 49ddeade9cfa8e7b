//! Rewriter capability trait.
//!
//! The orchestrator drives an external executor through three capabilities:
//! rewrite a group, commit a set of groups atomically, and abort a group's
//! written-but-uncommitted output. Implementations front the actual
//! read/write engine and the table's snapshot commit path, both of which
//! live outside this crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strata_core::GroupId;

use crate::error::Result;
use crate::scan::ScanTask;

/// Descriptor of a data file produced by a rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFileHandle {
    /// Path of the new data file.
    pub file_path: String,
    /// Size of the new data file in bytes.
    pub size_bytes: u64,
}

/// Capabilities of an external file group rewriter.
///
/// The handle must be safe to share across concurrent rewrites, commits,
/// and aborts.
#[async_trait]
pub trait FileGroupRewriter: Send + Sync {
    /// Rewrites one file group, returning descriptors of the new files.
    ///
    /// May block for the duration of the rewrite.
    ///
    /// # Errors
    ///
    /// Returns an error if the group could not be rewritten; the group's
    /// output must then be treated as not written.
    async fn rewrite(&self, group_id: GroupId, tasks: &[ScanTask]) -> Result<Vec<DataFileHandle>>;

    /// Commits the given groups atomically: either every group's output
    /// becomes visible or none does.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit failed as a whole.
    async fn commit(&self, group_ids: &[GroupId]) -> Result<()>;

    /// Best-effort cleanup of a group's written-but-uncommitted output.
    ///
    /// Idempotent: aborting a group that wrote nothing is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if cleanup failed; callers suppress and log it.
    async fn abort(&self, group_id: GroupId) -> Result<()>;
}

/// A rewriter that reports one output file per group and commits nothing.
///
/// Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct NoopRewriter;

#[async_trait]
impl FileGroupRewriter for NoopRewriter {
    async fn rewrite(&self, group_id: GroupId, tasks: &[ScanTask]) -> Result<Vec<DataFileHandle>> {
        let size_bytes = tasks.iter().map(ScanTask::length).sum();
        Ok(vec![DataFileHandle {
            file_path: format!("{group_id}-0.parquet"),
            size_bytes,
        }])
    }

    async fn commit(&self, _group_ids: &[GroupId]) -> Result<()> {
        Ok(())
    }

    async fn abort(&self, _group_id: GroupId) -> Result<()> {
        Ok(())
    }
}
