//! Compaction metrics.
//!
//! Provides metrics for planning and rewrite orchestration. These metrics
//! complement the structured logging approach already in place.

use metrics::{counter, describe_counter, describe_histogram, histogram};

/// File groups planned counter.
pub const GROUPS_PLANNED: &str = "strata_compaction_groups_planned_total";

/// Group rewrites counter, labeled by status.
pub const GROUP_REWRITES: &str = "strata_compaction_group_rewrites_total";

/// Commit attempts counter, labeled by status.
pub const COMMITS: &str = "strata_compaction_commits_total";

/// Bytes rewritten counter.
pub const BYTES_REWRITTEN: &str = "strata_compaction_bytes_rewritten_total";

/// Group rewrite duration histogram.
pub const REWRITE_DURATION: &str = "strata_compaction_rewrite_duration_seconds";

/// Registers all compaction metric descriptions.
///
/// Call this once at application startup after initializing the metrics
/// recorder.
pub fn register_metrics() {
    describe_counter!(GROUPS_PLANNED, "Total file groups emitted by the planner");
    describe_counter!(GROUP_REWRITES, "Total group rewrites by status");
    describe_counter!(COMMITS, "Total commit attempts by status");
    describe_counter!(BYTES_REWRITTEN, "Total input bytes rewritten");
    describe_histogram!(REWRITE_DURATION, "Duration of group rewrites in seconds");
}

/// Records the number of groups emitted by one planning pass.
pub fn record_groups_planned(count: usize) {
    counter!(GROUPS_PLANNED).increment(count as u64);
}

/// Records a completed group rewrite.
pub fn record_rewrite(status: &'static str, input_bytes: u64, duration_secs: f64) {
    counter!(GROUP_REWRITES, "status" => status).increment(1);
    if status == "success" {
        counter!(BYTES_REWRITTEN).increment(input_bytes);
    }
    histogram!(REWRITE_DURATION).record(duration_secs);
}

/// Records a commit attempt.
pub fn record_commit(status: &'static str) {
    counter!(COMMITS, "status" => status).increment(1);
}
