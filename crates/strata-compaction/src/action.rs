//! The rewrite-data-files action.
//!
//! Ties the pieces together: validates configuration, drains the table
//! scan, plans file groups per partition through the configured strategy,
//! and hands the enumerated groups to the orchestrator.

use std::collections::BTreeMap;
use std::sync::Arc;

use strata_core::{GroupId, PartitionKey};

use crate::config::{
    MAX_CONCURRENT_FILE_GROUP_ACTIONS, MAX_FILE_GROUP_SIZE_BYTES, Options, OrchestratorConfig,
    PARTIAL_PROGRESS_ENABLED, PARTIAL_PROGRESS_MAX_COMMITS, TARGET_FILE_SIZE_BYTES,
};
use crate::error::{Error, Result};
use crate::group::{FileGroup, FileGroupInfo, RewriteResult};
use crate::metrics;
use crate::orchestrator::RewriteOrchestrator;
use crate::rewriter::FileGroupRewriter;
use crate::scan::{ScanTask, ScanTaskStream, TaskScan};
use crate::strategy::{RewriteStrategy, Strategy};

/// Option keys recognized by the action itself, independent of strategy.
const VALID_ACTION_OPTIONS: &[&str] = &[
    TARGET_FILE_SIZE_BYTES,
    MAX_FILE_GROUP_SIZE_BYTES,
    MAX_CONCURRENT_FILE_GROUP_ACTIONS,
    PARTIAL_PROGRESS_ENABLED,
    PARTIAL_PROGRESS_MAX_COMMITS,
];

type TaskPredicate = Box<dyn Fn(&ScanTask) -> bool + Send + Sync>;

/// Action that rewrites data files to approach the target file size.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use strata_compaction::action::RewriteDataFiles;
/// use strata_compaction::rewriter::NoopRewriter;
/// use strata_compaction::scan::StaticTaskScan;
///
/// # async fn run() -> strata_compaction::error::Result<()> {
/// let result = RewriteDataFiles::new(
///     Arc::new(StaticTaskScan::new(vec![])),
///     Arc::new(NoopRewriter),
/// )
/// .with_option("target-file-size-bytes", "536870912")
/// .execute()
/// .await?;
/// # Ok(())
/// # }
/// ```
pub struct RewriteDataFiles {
    scan: Arc<dyn TaskScan>,
    rewriter: Arc<dyn FileGroupRewriter>,
    strategy: Strategy,
    options: Options,
    filter: Option<TaskPredicate>,
}

impl RewriteDataFiles {
    /// Creates an action over a table scan and a rewriter.
    #[must_use]
    pub fn new(scan: Arc<dyn TaskScan>, rewriter: Arc<dyn FileGroupRewriter>) -> Self {
        Self {
            scan,
            rewriter,
            strategy: Strategy::default(),
            options: Options::new(),
            filter: None,
        }
    }

    /// Selects the rewrite strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets a single string option.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Merges a set of string options.
    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options.extend(options);
        self
    }

    /// Restricts the scan to tasks matching the predicate.
    #[must_use]
    pub fn with_filter(mut self, predicate: impl Fn(&ScanTask) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Plans and executes the rewrite, returning the outcome of every
    /// committed group.
    ///
    /// Configuration is validated before any planning or rewriting; an
    /// invalid or unknown option has no side effects.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid or unknown options, and
    /// surfaces orchestration errors per the configured mode.
    pub async fn execute(mut self) -> Result<RewriteResult> {
        let strategy = self.strategy.build(&self.options)?;
        self.validate_options(strategy.as_ref())?;
        let orchestrator_config = OrchestratorConfig::from_options(&self.options)?;

        let mut stream = self.scan.plan_tasks()?;
        if let Some(predicate) = self.filter.take() {
            stream = stream.filter(move |task| predicate(task));
        }
        let groups_by_partition = plan_file_groups(stream, strategy.as_ref());
        let groups = enumerate_groups(groups_by_partition);
        metrics::record_groups_planned(groups.len());

        if groups.is_empty() {
            tracing::info!("nothing found to rewrite");
            return Ok(RewriteResult::default());
        }

        tracing::info!(
            strategy = strategy.name(),
            groups = groups.len(),
            partial_progress = orchestrator_config.partial_progress_enabled,
            "starting file group rewrite"
        );

        let orchestrator = RewriteOrchestrator::new(self.rewriter, orchestrator_config);
        orchestrator.execute(groups).await
    }

    fn validate_options(&self, strategy: &dyn RewriteStrategy) -> Result<()> {
        let unknown: Vec<String> = self
            .options
            .keys()
            .filter(|key| {
                !VALID_ACTION_OPTIONS.contains(&key.as_str())
                    && !strategy.valid_options().contains(&key.as_str())
            })
            .cloned()
            .collect();

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(Error::UnsupportedOptions { options: unknown })
        }
    }

}

/// Drains the scan and plans file groups per partition.
///
/// The scan stream closes on every exit path: explicitly after a full
/// drain here, via drop if planning unwinds.
fn plan_file_groups(
    mut stream: ScanTaskStream,
    strategy: &dyn RewriteStrategy,
) -> BTreeMap<PartitionKey, Vec<Vec<ScanTask>>> {
    let mut tasks_by_partition: BTreeMap<PartitionKey, Vec<ScanTask>> = BTreeMap::new();
    for task in stream.by_ref() {
        tasks_by_partition
            .entry(task.partition().clone())
            .or_default()
            .push(task);
    }
    stream.close();
    plan_partitions(tasks_by_partition, strategy)
}

fn plan_partitions(
    tasks_by_partition: BTreeMap<PartitionKey, Vec<ScanTask>>,
    strategy: &dyn RewriteStrategy,
) -> BTreeMap<PartitionKey, Vec<Vec<ScanTask>>> {
    let mut groups_by_partition = BTreeMap::new();
    for (partition, tasks) in tasks_by_partition {
        let selected = strategy.select_files_to_rewrite(tasks);
        let groups = strategy.plan_file_groups(selected);
        if !groups.is_empty() {
            groups_by_partition.insert(partition, groups);
        }
    }
    groups_by_partition
}

/// Assigns identifiers and indices to planned groups.
///
/// Partitions are visited in sorted order and groups in planner order, so
/// `global_index` assignment is deterministic for a given plan. Execution
/// order across workers remains unspecified.
fn enumerate_groups(
    groups_by_partition: BTreeMap<PartitionKey, Vec<Vec<ScanTask>>>,
) -> Vec<FileGroup> {
    let mut groups = Vec::new();
    let mut global_index = 1;
    for (partition, partition_groups) in groups_by_partition {
        for (offset, tasks) in partition_groups.into_iter().enumerate() {
            let info = FileGroupInfo::new(
                GroupId::generate(),
                global_index,
                offset + 1,
                partition.clone(),
            );
            groups.push(FileGroup::new(info, tasks));
            global_index += 1;
        }
    }
    groups
}
