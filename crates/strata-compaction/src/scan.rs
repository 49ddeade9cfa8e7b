//! Scan task hand-off between the table scan and the planner.
//!
//! The external table scan produces a finite lazy sequence of
//! [`ScanTask`]s. Ownership of the sequence passes to the planner, which is
//! responsible for releasing the scan when it is done; [`ScanTaskStream`]
//! carries the release hook and runs it on drop, so the scan is closed on
//! every exit path including panics.

use serde::{Deserialize, Serialize};
use strata_core::PartitionKey;

use crate::error::Result;

/// A file-scoped read unit produced by a table scan.
///
/// Immutable once constructed. The planner only observes the file length
/// and the partition the file belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTask {
    file_path: String,
    length: u64,
    partition: PartitionKey,
}

impl ScanTask {
    /// Creates a new scan task.
    #[must_use]
    pub fn new(file_path: impl Into<String>, length: u64, partition: PartitionKey) -> Self {
        Self {
            file_path: file_path.into(),
            length,
            partition,
        }
    }

    /// Path of the underlying data file.
    #[must_use]
    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// Size of the underlying data file in bytes.
    #[must_use]
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Partition the file belongs to.
    #[must_use]
    pub fn partition(&self) -> &PartitionKey {
        &self.partition
    }
}

type CloseHook = Box<dyn FnOnce() + Send>;

/// A finite lazy sequence of scan tasks with an explicit close step.
///
/// The close hook runs exactly once: either via [`ScanTaskStream::close`]
/// or, failing that, when the stream is dropped.
pub struct ScanTaskStream {
    tasks: Box<dyn Iterator<Item = ScanTask> + Send>,
    on_close: Option<CloseHook>,
}

impl ScanTaskStream {
    /// Wraps an iterator of scan tasks with no close hook.
    #[must_use]
    pub fn from_iter<I>(tasks: I) -> Self
    where
        I: IntoIterator<Item = ScanTask>,
        I::IntoIter: Send + 'static,
    {
        Self {
            tasks: Box::new(tasks.into_iter()),
            on_close: None,
        }
    }

    /// Attaches a hook that runs when the stream is closed or dropped.
    #[must_use]
    pub fn with_close(mut self, on_close: impl FnOnce() + Send + 'static) -> Self {
        self.on_close = Some(Box::new(on_close));
        self
    }

    /// Restricts the stream to tasks matching a caller-supplied predicate.
    ///
    /// The predicate is applied lazily during iteration.
    #[must_use]
    pub fn filter(mut self, predicate: impl Fn(&ScanTask) -> bool + Send + 'static) -> Self {
        // Fields are taken rather than moved because `Drop` is implemented;
        // the emptied-out `self` then drops without firing the close hook.
        let tasks = std::mem::replace(&mut self.tasks, Box::new(std::iter::empty()));
        let on_close = self.on_close.take();
        Self {
            tasks: Box::new(tasks.filter(move |task| predicate(task))),
            on_close,
        }
    }

    /// Closes the stream, running the close hook.
    pub fn close(mut self) {
        if let Some(hook) = self.on_close.take() {
            hook();
        }
    }
}

impl Iterator for ScanTaskStream {
    type Item = ScanTask;

    fn next(&mut self) -> Option<ScanTask> {
        self.tasks.next()
    }
}

impl Drop for ScanTaskStream {
    fn drop(&mut self) {
        if let Some(hook) = self.on_close.take() {
            hook();
        }
    }
}

impl std::fmt::Debug for ScanTaskStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanTaskStream")
            .field("has_close_hook", &self.on_close.is_some())
            .finish_non_exhaustive()
    }
}

/// Seam to the external table scan.
///
/// Implementations plan the set of file scan tasks for the current table
/// state. The returned stream owns the scan resources.
pub trait TaskScan: Send + Sync {
    /// Plans the file scan tasks to consider for rewriting.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying scan cannot be planned.
    fn plan_tasks(&self) -> Result<ScanTaskStream>;
}

/// A scan over a fixed in-memory task list.
///
/// Used by tests and by callers that have already materialized their scan.
#[derive(Debug, Clone, Default)]
pub struct StaticTaskScan {
    tasks: Vec<ScanTask>,
}

impl StaticTaskScan {
    /// Creates a scan over the given tasks.
    #[must_use]
    pub fn new(tasks: Vec<ScanTask>) -> Self {
        Self { tasks }
    }
}

impl TaskScan for StaticTaskScan {
    fn plan_tasks(&self) -> Result<ScanTaskStream> {
        Ok(ScanTaskStream::from_iter(self.tasks.clone()))
    }
}
