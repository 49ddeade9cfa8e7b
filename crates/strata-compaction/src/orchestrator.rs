//! Concurrent execution of rewrite file groups.
//!
//! The orchestrator runs planned file groups through an external
//! [`FileGroupRewriter`] with bounded concurrency, in one of two modes:
//!
//! - **All-or-nothing**: every group must rewrite successfully, then a
//!   single atomic commit covers all of them. The first rewrite failure
//!   stops further submissions, aborts every group already written, and
//!   surfaces the original error. In-flight rewrites are never cancelled;
//!   stopping means refusing to start queued work.
//! - **Partial progress**: completed groups commit in batches while
//!   rewriting continues, so a long compaction makes durable progress even
//!   if later groups fail. A failed rewrite or a failed commit batch is
//!   dropped from the results and the run continues.
//!
//! Shared state (result map, completed and committed queues, the
//! still-rewriting flag) is mutated by workers and by the committer;
//! contention is bounded by group count.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

use strata_core::GroupId;

use crate::config::OrchestratorConfig;
use crate::error::{Error, Result};
use crate::group::{FileGroup, FileGroupInfo, FileGroupResult, RewriteResult};
use crate::metrics;
use crate::rewriter::FileGroupRewriter;

/// How long the committer may take to drain and terminate after the last
/// worker finishes. Exceeding this is fatal.
const COMMITTER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Pause between committer poll iterations.
const COMMITTER_POLL_INTERVAL: Duration = Duration::from_millis(2);

type GroupOutcome = (FileGroupInfo, FileGroupResult);

/// Executes planned file groups against a rewriter.
pub struct RewriteOrchestrator {
    rewriter: Arc<dyn FileGroupRewriter>,
    config: OrchestratorConfig,
}

impl RewriteOrchestrator {
    /// Creates an orchestrator over the given rewriter.
    #[must_use]
    pub fn new(rewriter: Arc<dyn FileGroupRewriter>, config: OrchestratorConfig) -> Self {
        Self { rewriter, config }
    }

    /// Executes the groups in the configured mode and returns the outcome
    /// of every committed group.
    ///
    /// # Errors
    ///
    /// In all-or-nothing mode, surfaces the first rewrite failure or the
    /// commit failure after aborting written groups. In partial-progress
    /// mode, rewrite and commit failures are absorbed (failed groups are
    /// excluded from the result) and only a committer shutdown timeout is
    /// fatal.
    pub async fn execute(&self, groups: Vec<FileGroup>) -> Result<RewriteResult> {
        if self.config.partial_progress_enabled {
            self.execute_partial_progress(groups).await
        } else {
            self.execute_all_or_nothing(groups).await
        }
    }

    async fn execute_all_or_nothing(&self, groups: Vec<FileGroup>) -> Result<RewriteResult> {
        let total_groups = groups.len();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_group_actions));
        let stop = Arc::new(AtomicBool::new(false));
        let first_error: Arc<Mutex<Option<Error>>> = Arc::new(Mutex::new(None));
        let written: Arc<Mutex<Vec<GroupId>>> = Arc::new(Mutex::new(Vec::new()));
        let results: Arc<Mutex<HashMap<GroupId, GroupOutcome>>> =
            Arc::new(Mutex::new(HashMap::new()));

        let mut workers = JoinSet::new();
        for group in groups {
            // Refuse to start queued groups once a rewrite has failed.
            if stop.load(Ordering::SeqCst) {
                break;
            }
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|err| Error::Core(strata_core::Error::internal(err.to_string())))?;
            if stop.load(Ordering::SeqCst) {
                break;
            }

            let rewriter = Arc::clone(&self.rewriter);
            let stop = Arc::clone(&stop);
            let first_error = Arc::clone(&first_error);
            let written = Arc::clone(&written);
            let results = Arc::clone(&results);
            workers.spawn(async move {
                let _permit = permit;
                let info = group.info().clone();
                match rewrite_one(rewriter.as_ref(), &group, total_groups).await {
                    Ok(outcome) => {
                        results
                            .lock()
                            .await
                            .insert(info.group_id(), (info.clone(), outcome));
                        written.lock().await.push(info.group_id());
                    }
                    Err(err) => {
                        tracing::error!(
                            group_id = %info.group_id(),
                            error = %err,
                            "failure during rewrite process for group"
                        );
                        stop.store(true, Ordering::SeqCst);
                        let mut slot = first_error.lock().await;
                        if slot.is_none() {
                            *slot = Some(err);
                        }
                    }
                }
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(join_err) = joined {
                stop.store(true, Ordering::SeqCst);
                let mut slot = first_error.lock().await;
                if slot.is_none() {
                    *slot = Some(Error::Core(strata_core::Error::internal(format!(
                        "rewrite worker panicked: {join_err}"
                    ))));
                }
            }
        }

        if let Some(err) = first_error.lock().await.take() {
            let written_ids = written.lock().await.clone();
            tracing::error!(
                written = written_ids.len(),
                "cannot complete rewrite, partial progress is not enabled and a file group \
                 failed to be rewritten; cleaning up groups which finished being written"
            );
            abort_groups(self.rewriter.as_ref(), &written_ids).await;
            return Err(err);
        }

        let written_ids = written.lock().await.clone();
        commit_or_abort(self.rewriter.as_ref(), &written_ids).await?;

        let outcomes = results.lock().await;
        Ok(collect_result(outcomes.values().cloned()))
    }

    async fn execute_partial_progress(&self, groups: Vec<FileGroup>) -> Result<RewriteResult> {
        let total_groups = groups.len();
        let groups_per_commit = total_groups.div_ceil(self.config.max_commits);

        let state = Arc::new(PartialProgressState {
            results: Mutex::new(HashMap::new()),
            completed: Mutex::new(VecDeque::new()),
            committed: Mutex::new(Vec::new()),
            still_rewriting: AtomicBool::new(true),
        });

        let committer = tokio::spawn(commit_service(
            Arc::clone(&self.rewriter),
            Arc::clone(&state),
            groups_per_commit,
        ));

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_group_actions));
        let mut workers = JoinSet::new();
        for group in groups {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|err| Error::Core(strata_core::Error::internal(err.to_string())))?;

            let rewriter = Arc::clone(&self.rewriter);
            let state = Arc::clone(&state);
            workers.spawn(async move {
                let _permit = permit;
                let info = group.info().clone();
                let group_id = info.group_id();
                match rewrite_one(rewriter.as_ref(), &group, total_groups).await {
                    Ok(outcome) => {
                        // Results land before the id becomes visible to the
                        // committer, so a failed batch can always remove its
                        // entries.
                        state.results.lock().await.insert(group_id, (info, outcome));
                        state.completed.lock().await.push_back(group_id);
                    }
                    Err(err) => {
                        tracing::error!(
                            group_id = %group_id,
                            error = %err,
                            "failure during rewrite process for group, partial progress \
                             enabled; excluding group from results"
                        );
                        abort_groups(rewriter.as_ref(), &[group_id]).await;
                    }
                }
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(join_err) = joined {
                tracing::error!(error = %join_err, "rewrite worker panicked, continuing");
            }
        }
        state.still_rewriting.store(false, Ordering::SeqCst);

        match tokio::time::timeout(COMMITTER_SHUTDOWN_TIMEOUT, committer).await {
            Ok(Ok(())) => {}
            Ok(Err(join_err)) => {
                return Err(Error::Core(strata_core::Error::internal(format!(
                    "committer task failed: {join_err}"
                ))));
            }
            Err(_elapsed) => {
                return Err(Error::CommitterTimeout {
                    timeout: COMMITTER_SHUTDOWN_TIMEOUT,
                });
            }
        }

        let committed = state.committed.lock().await.len();
        tracing::info!(total_groups, committed, "rewrite commit service finished");

        let outcomes = state.results.lock().await;
        Ok(collect_result(outcomes.values().cloned()))
    }
}

struct PartialProgressState {
    results: Mutex<HashMap<GroupId, GroupOutcome>>,
    completed: Mutex<VecDeque<GroupId>>,
    committed: Mutex<Vec<GroupId>>,
    still_rewriting: AtomicBool,
}

/// Single-task commit service for partial-progress mode.
///
/// Drains a batch whenever a full commit group has accumulated, or whenever
/// rewriting has finished and completed groups remain. Batches commit in
/// completion (FIFO) order. A failed batch is removed from the results and
/// later batches continue.
async fn commit_service(
    rewriter: Arc<dyn FileGroupRewriter>,
    state: Arc<PartialProgressState>,
    groups_per_commit: usize,
) {
    loop {
        let still_rewriting = state.still_rewriting.load(Ordering::SeqCst);
        let queued = state.completed.lock().await.len();

        if queued == 0 {
            if !still_rewriting {
                break;
            }
            tokio::time::sleep(COMMITTER_POLL_INTERVAL).await;
            continue;
        }

        if queued > groups_per_commit || !still_rewriting {
            let batch: Vec<GroupId> = {
                let mut completed = state.completed.lock().await;
                let take = groups_per_commit.min(completed.len());
                completed.drain(..take).collect()
            };

            match commit_or_abort(rewriter.as_ref(), &batch).await {
                Ok(()) => {
                    state.committed.lock().await.extend(batch);
                }
                Err(err) => {
                    let mut results = state.results.lock().await;
                    for group_id in &batch {
                        results.remove(group_id);
                    }
                    tracing::error!(
                        groups = batch.len(),
                        error = %err,
                        "failure during rewrite commit process, partial progress enabled; \
                         dropping batch from results and continuing"
                    );
                }
            }
        } else {
            tokio::time::sleep(COMMITTER_POLL_INTERVAL).await;
        }
    }
}

/// Rewrites a single group and reports its outcome.
async fn rewrite_one(
    rewriter: &dyn FileGroupRewriter,
    group: &FileGroup,
    total_groups: usize,
) -> Result<FileGroupResult> {
    let info = group.info();
    tracing::info!(
        group_id = %info.group_id(),
        global_index = info.global_index(),
        total_groups,
        partition = %info.partition(),
        partition_index = info.partition_index(),
        files = group.file_count(),
        bytes = group.total_bytes(),
        "rewriting file group"
    );

    let started = Instant::now();
    match rewriter.rewrite(info.group_id(), group.tasks()).await {
        Ok(added) => {
            metrics::record_rewrite(
                "success",
                group.total_bytes(),
                started.elapsed().as_secs_f64(),
            );
            Ok(FileGroupResult {
                added_files_count: added.len(),
                rewritten_files_count: group.file_count(),
            })
        }
        Err(err) => {
            metrics::record_rewrite("failure", group.total_bytes(), started.elapsed().as_secs_f64());
            Err(err)
        }
    }
}

/// Commits the groups atomically, aborting all of them if the commit fails.
async fn commit_or_abort(rewriter: &dyn FileGroupRewriter, group_ids: &[GroupId]) -> Result<()> {
    if group_ids.is_empty() {
        return Ok(());
    }
    match rewriter.commit(group_ids).await {
        Ok(()) => {
            metrics::record_commit("success");
            tracing::info!(groups = group_ids.len(), "committed file groups");
            Ok(())
        }
        Err(err) => {
            metrics::record_commit("failure");
            tracing::error!(
                groups = group_ids.len(),
                error = %err,
                "cannot commit file groups, attempting to clean up written files"
            );
            abort_groups(rewriter, group_ids).await;
            Err(err)
        }
    }
}

/// Best-effort abort of each group; failures are logged and suppressed.
async fn abort_groups(rewriter: &dyn FileGroupRewriter, group_ids: &[GroupId]) {
    for group_id in group_ids {
        if let Err(err) = rewriter.abort(*group_id).await {
            tracing::warn!(
                group_id = %group_id,
                error = %err,
                "failed to abort file group, leaving output for cleanup"
            );
        }
    }
}

fn collect_result(outcomes: impl Iterator<Item = GroupOutcome>) -> RewriteResult {
    RewriteResult::new(outcomes.collect())
}
