//! File group data model.
//!
//! A file group is the unit of atomic rewrite: an ordered set of scan tasks
//! from a single partition, identified by a fresh [`GroupId`] at planning
//! time. Rewrite outcomes are keyed by the group's immutable descriptor.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strata_core::{GroupId, PartitionKey};

use crate::scan::ScanTask;

/// Immutable descriptor of an emitted file group.
///
/// `global_index` is assignment order across the whole plan and
/// `partition_index` is assignment order within the group's partition; both
/// are 1-based. Neither says anything about completion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileGroupInfo {
    group_id: GroupId,
    global_index: usize,
    partition_index: usize,
    partition: PartitionKey,
}

impl FileGroupInfo {
    /// Creates a new group descriptor.
    #[must_use]
    pub fn new(
        group_id: GroupId,
        global_index: usize,
        partition_index: usize,
        partition: PartitionKey,
    ) -> Self {
        Self {
            group_id,
            global_index,
            partition_index,
            partition,
        }
    }

    /// The group's unique identifier.
    #[must_use]
    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    /// 1-based index of this group across the whole plan.
    #[must_use]
    pub fn global_index(&self) -> usize {
        self.global_index
    }

    /// 1-based index of this group within its partition.
    #[must_use]
    pub fn partition_index(&self) -> usize {
        self.partition_index
    }

    /// The partition every member task belongs to.
    #[must_use]
    pub fn partition(&self) -> &PartitionKey {
        &self.partition
    }
}

/// An ordered set of scan tasks rewritten together.
///
/// All members share the descriptor's partition. The planner keeps the
/// total size within the configured group bound unless the group is a
/// single oversize task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileGroup {
    info: FileGroupInfo,
    tasks: Vec<ScanTask>,
}

impl FileGroup {
    /// Creates a new file group.
    #[must_use]
    pub fn new(info: FileGroupInfo, tasks: Vec<ScanTask>) -> Self {
        Self { info, tasks }
    }

    /// The group descriptor.
    #[must_use]
    pub fn info(&self) -> &FileGroupInfo {
        &self.info
    }

    /// The member tasks in planner order.
    #[must_use]
    pub fn tasks(&self) -> &[ScanTask] {
        &self.tasks
    }

    /// Number of member tasks.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.tasks.len()
    }

    /// Sum of member file sizes in bytes.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.tasks.iter().map(ScanTask::length).sum()
    }
}

/// Outcome of rewriting one file group, as reported by the rewriter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileGroupResult {
    /// Number of new data files written for the group.
    pub added_files_count: usize,
    /// Number of input files that were rewritten.
    pub rewritten_files_count: usize,
}

/// Final outcome of a rewrite action: one entry per committed group.
///
/// Groups whose rewrite or commit failed do not appear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteResult {
    result_map: HashMap<FileGroupInfo, FileGroupResult>,
}

impl RewriteResult {
    /// Creates a result from the committed-group map.
    #[must_use]
    pub fn new(result_map: HashMap<FileGroupInfo, FileGroupResult>) -> Self {
        Self { result_map }
    }

    /// Map from group descriptor to its rewrite outcome.
    #[must_use]
    pub fn result_map(&self) -> &HashMap<FileGroupInfo, FileGroupResult> {
        &self.result_map
    }

    /// Number of committed groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.result_map.len()
    }

    /// Total data files added across committed groups.
    #[must_use]
    pub fn added_files_count(&self) -> usize {
        self.result_map.values().map(|r| r.added_files_count).sum()
    }

    /// Total input files rewritten across committed groups.
    #[must_use]
    pub fn rewritten_files_count(&self) -> usize {
        self.result_map
            .values()
            .map(|r| r.rewritten_files_count)
            .sum()
    }
}
