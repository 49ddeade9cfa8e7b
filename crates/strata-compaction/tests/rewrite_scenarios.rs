//! End-to-end rewrite scenarios against a recording rewriter.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use strata_core::{GroupId, PartitionKey, ScalarValue};

use strata_compaction::action::RewriteDataFiles;
use strata_compaction::error::{Error, Result};
use strata_compaction::rewriter::{DataFileHandle, FileGroupRewriter};
use strata_compaction::scan::{ScanTask, StaticTaskScan};

/// Rewriter test double that records every call.
///
/// Groups whose member paths contain "poison" fail their rewrite; commit
/// attempts listed in `fail_commit_attempts` (1-based) fail.
#[derive(Default)]
struct RecordingRewriter {
    rewrite_delay_ms: u64,
    fail_commit_attempts: Vec<usize>,
    commit_attempts: AtomicUsize,
    succeeded: Mutex<Vec<GroupId>>,
    commits: Mutex<Vec<Vec<GroupId>>>,
    aborts: Mutex<Vec<GroupId>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingRewriter {
    fn with_delay(rewrite_delay_ms: u64) -> Self {
        Self {
            rewrite_delay_ms,
            ..Self::default()
        }
    }

    fn failing_commits(fail_commit_attempts: Vec<usize>) -> Self {
        Self {
            fail_commit_attempts,
            ..Self::default()
        }
    }

    fn succeeded(&self) -> HashSet<GroupId> {
        self.succeeded.lock().unwrap().iter().copied().collect()
    }

    fn commits(&self) -> Vec<Vec<GroupId>> {
        self.commits.lock().unwrap().clone()
    }

    fn aborts(&self) -> HashSet<GroupId> {
        self.aborts.lock().unwrap().iter().copied().collect()
    }
}

#[async_trait]
impl FileGroupRewriter for RecordingRewriter {
    async fn rewrite(&self, group_id: GroupId, tasks: &[ScanTask]) -> Result<Vec<DataFileHandle>> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if self.rewrite_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.rewrite_delay_ms)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if tasks.iter().any(|task| task.file_path().contains("poison")) {
            return Err(Error::rewrite(group_id, "injected rewrite failure"));
        }

        self.succeeded.lock().unwrap().push(group_id);
        Ok(vec![DataFileHandle {
            file_path: format!("{group_id}-0.parquet"),
            size_bytes: tasks.iter().map(ScanTask::length).sum(),
        }])
    }

    async fn commit(&self, group_ids: &[GroupId]) -> Result<()> {
        let attempt = self.commit_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_commit_attempts.contains(&attempt) {
            return Err(Error::commit("injected commit failure"));
        }
        self.commits.lock().unwrap().push(group_ids.to_vec());
        Ok(())
    }

    async fn abort(&self, group_id: GroupId) -> Result<()> {
        self.aborts.lock().unwrap().push(group_id);
        Ok(())
    }
}

fn partition(day: usize) -> PartitionKey {
    let mut pk = PartitionKey::new();
    pk.insert("date", ScalarValue::Date(format!("2025-01-{:02}", day + 1)));
    pk
}

/// One two-file group per partition; partition `poison` (if any) fails its
/// rewrite.
fn partitioned_tasks(partitions: usize, poison: Option<usize>) -> Vec<ScanTask> {
    let mut tasks = Vec::new();
    for p in 0..partitions {
        let prefix = if poison == Some(p) { "poison" } else { "data" };
        for f in 0..2 {
            tasks.push(ScanTask::new(
                format!("{prefix}/p{p}/f{f}.parquet"),
                10,
                partition(p),
            ));
        }
    }
    tasks
}

fn action(tasks: Vec<ScanTask>, rewriter: Arc<RecordingRewriter>) -> RewriteDataFiles {
    RewriteDataFiles::new(Arc::new(StaticTaskScan::new(tasks)), rewriter)
        .with_option("target-file-size-bytes", "100")
        .with_option("min-input-files", "2")
}

#[tokio::test(flavor = "multi_thread")]
async fn all_or_nothing_happy_path() {
    let rewriter = Arc::new(RecordingRewriter::default());

    let result = action(partitioned_tasks(3, None), rewriter.clone())
        .with_option("max-concurrent-file-group-actions", "3")
        .execute()
        .await
        .unwrap();

    assert_eq!(result.group_count(), 3);
    assert_eq!(result.rewritten_files_count(), 6);
    assert_eq!(result.added_files_count(), 3);

    // A single atomic commit over all three groups.
    let commits = rewriter.commits();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].len(), 3);
    assert_eq!(
        commits[0].iter().copied().collect::<HashSet<_>>(),
        rewriter.succeeded()
    );
    assert!(rewriter.aborts().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn all_or_nothing_rewrite_failure_aborts_written_groups() {
    // All three groups start concurrently; the poisoned one fails while the
    // others run to completion and must then be aborted.
    let rewriter = Arc::new(RecordingRewriter::with_delay(20));

    let result = action(partitioned_tasks(3, Some(1)), rewriter.clone())
        .with_option("max-concurrent-file-group-actions", "3")
        .execute()
        .await;

    assert!(matches!(result, Err(Error::Rewrite { .. })));

    // No commit happened, and every group that reached the written state
    // was aborted.
    assert!(rewriter.commits().is_empty());
    assert_eq!(rewriter.aborts(), rewriter.succeeded());
    assert_eq!(rewriter.succeeded().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn all_or_nothing_commit_failure_aborts_everything() {
    let rewriter = Arc::new(RecordingRewriter::failing_commits(vec![1]));

    let result = action(partitioned_tasks(3, None), rewriter.clone())
        .with_option("max-concurrent-file-group-actions", "2")
        .execute()
        .await;

    assert!(matches!(result, Err(Error::Commit { .. })));
    assert!(rewriter.commits().is_empty());
    assert_eq!(rewriter.aborts(), rewriter.succeeded());
    assert_eq!(rewriter.succeeded().len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn partial_progress_commits_in_batches() {
    // Four groups with max-commits 2: groups_per_commit is 2, so four
    // successful rewrites land as two commits of two groups each.
    let rewriter = Arc::new(RecordingRewriter::default());

    let result = action(partitioned_tasks(4, None), rewriter.clone())
        .with_option("max-concurrent-file-group-actions", "4")
        .with_option("partial-progress.enabled", "true")
        .with_option("partial-progress.max-commits", "2")
        .execute()
        .await
        .unwrap();

    assert_eq!(result.group_count(), 4);

    let commits = rewriter.commits();
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0].len(), 2);
    assert_eq!(commits[1].len(), 2);

    let committed: HashSet<GroupId> = commits.iter().flatten().copied().collect();
    assert_eq!(committed, rewriter.succeeded());
}

#[tokio::test(flavor = "multi_thread")]
async fn partial_progress_drains_leftover_batch() {
    // Three groups with max-commits 2: one full batch of two plus a final
    // drain of one once rewriting has finished.
    let rewriter = Arc::new(RecordingRewriter::default());

    let result = action(partitioned_tasks(3, None), rewriter.clone())
        .with_option("max-concurrent-file-group-actions", "3")
        .with_option("partial-progress.enabled", "true")
        .with_option("partial-progress.max-commits", "2")
        .execute()
        .await
        .unwrap();

    assert_eq!(result.group_count(), 3);

    let commits = rewriter.commits();
    let batch_sizes: Vec<usize> = commits.iter().map(Vec::len).collect();
    assert_eq!(batch_sizes.iter().sum::<usize>(), 3);
    assert!(batch_sizes.iter().all(|size| *size <= 2));
}

#[tokio::test(flavor = "multi_thread")]
async fn partial_progress_failed_batch_is_dropped_from_results() {
    let rewriter = Arc::new(RecordingRewriter::failing_commits(vec![2]));

    let result = action(partitioned_tasks(4, None), rewriter.clone())
        .with_option("max-concurrent-file-group-actions", "4")
        .with_option("partial-progress.enabled", "true")
        .with_option("partial-progress.max-commits", "2")
        .execute()
        .await
        .unwrap();

    // Only the first batch of two groups survives.
    assert_eq!(result.group_count(), 2);

    let commits = rewriter.commits();
    assert_eq!(commits.len(), 1);
    let committed: HashSet<GroupId> = commits[0].iter().copied().collect();
    let surviving: HashSet<GroupId> = result
        .result_map()
        .keys()
        .map(|info| info.group_id())
        .collect();
    assert_eq!(surviving, committed);

    // The failed batch was aborted as part of commit cleanup.
    assert_eq!(rewriter.aborts().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn partial_progress_excludes_failed_rewrite() {
    let rewriter = Arc::new(RecordingRewriter::default());

    let result = action(partitioned_tasks(4, Some(2)), rewriter.clone())
        .with_option("max-concurrent-file-group-actions", "2")
        .with_option("partial-progress.enabled", "true")
        .with_option("partial-progress.max-commits", "2")
        .execute()
        .await
        .unwrap();

    // The poisoned group is aborted and excluded; the rest commit.
    assert_eq!(result.group_count(), 3);
    assert_eq!(rewriter.succeeded().len(), 3);
    assert_eq!(rewriter.aborts().len(), 1);

    let committed: HashSet<GroupId> = rewriter.commits().iter().flatten().copied().collect();
    assert_eq!(committed, rewriter.succeeded());
    assert!(rewriter.aborts().is_disjoint(&committed));
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrency_is_bounded_by_configuration() {
    let rewriter = Arc::new(RecordingRewriter::with_delay(10));

    let result = action(partitioned_tasks(6, None), rewriter.clone())
        .with_option("max-concurrent-file-group-actions", "2")
        .execute()
        .await
        .unwrap();

    assert_eq!(result.group_count(), 6);
    assert!(rewriter.max_in_flight.load(Ordering::SeqCst) <= 2);
}
