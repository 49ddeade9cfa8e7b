//! Rewrite strategies: file selection, grouping, and output sizing.
//!
//! A strategy decides which files need rewriting and how they group into
//! rewrite units. Strategies are capability objects behind
//! [`RewriteStrategy`]; the [`Strategy`] enum names the built-in ones so new
//! strategies compose by providing their own selection and grouping.

use crate::binpack::ListPacker;
use crate::config::{
    BinPackConfig, MAX_FILE_SIZE_BYTES, MIN_FILE_SIZE_BYTES, MIN_INPUT_FILES, Options,
};
use crate::error::Result;
use crate::scan::ScanTask;

/// Built-in rewrite strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Size-banded selection with first-fit grouping.
    #[default]
    BinPack,
}

impl Strategy {
    /// Builds and configures the strategy from string options.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the strategy's options fail to parse
    /// or violate their invariants.
    pub fn build(self, options: &Options) -> Result<Box<dyn RewriteStrategy>> {
        match self {
            Self::BinPack => Ok(Box::new(BinPackStrategy::from_options(options)?)),
        }
    }
}

/// Selection and grouping behavior of a rewrite strategy.
pub trait RewriteStrategy: Send + Sync {
    /// Human-readable strategy name, used in logs and job descriptions.
    fn name(&self) -> &'static str;

    /// Option keys this strategy recognizes, beyond the action-level keys.
    fn valid_options(&self) -> &'static [&'static str];

    /// Retains the tasks this strategy wants to rewrite.
    fn select_files_to_rewrite(&self, tasks: Vec<ScanTask>) -> Vec<ScanTask>;

    /// Groups selected tasks into rewrite units.
    ///
    /// Tasks handed in belong to a single partition; every returned group
    /// is a subset of the input in input order.
    fn plan_file_groups(&self, tasks: Vec<ScanTask>) -> Vec<Vec<ScanTask>>;
}

/// A rewrite strategy which targets files by size.
///
/// Files outside the `[min_file_size, max_file_size]` band are selected and
/// packed into groups bounded by the maximum group size. A group is worth
/// rewriting if it has at least `min_input_files` members or enough bytes to
/// produce one target-size output file; anything smaller could never reach
/// the target without merging across partitions, which is forbidden.
#[derive(Debug, Clone, Copy)]
pub struct BinPackStrategy {
    config: BinPackConfig,
}

impl BinPackStrategy {
    const VALID_OPTIONS: &'static [&'static str] =
        &[MIN_INPUT_FILES, MIN_FILE_SIZE_BYTES, MAX_FILE_SIZE_BYTES];

    /// Creates a strategy from a validated configuration.
    #[must_use]
    pub fn new(config: BinPackConfig) -> Self {
        Self { config }
    }

    /// Creates a strategy by resolving and validating string options.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if option values fail to parse or the
    /// threshold invariants are violated.
    pub fn from_options(options: &Options) -> Result<Self> {
        Ok(Self::new(BinPackConfig::from_options(options)?))
    }

    /// The resolved sizing configuration.
    #[must_use]
    pub fn config(&self) -> &BinPackConfig {
        &self.config
    }

    /// Determines how many output files a group of `total_bytes` should
    /// produce.
    ///
    /// Rounding up leaves a remainder file; rounding down spreads the
    /// remainder across the other files. The remainder file is kept when it
    /// is itself a valid size (above `min_file_size`). Otherwise we round
    /// down, unless absorbing the remainder would push the average file
    /// size past 110% of target or past the writer's max, in which case the
    /// remainder file is kept after all.
    #[must_use]
    pub fn num_output_files(&self, total_bytes: u64) -> u64 {
        let target = self.config.target_file_size;
        if total_bytes < target {
            return 1;
        }

        let count_with_remainder = total_bytes.div_ceil(target);
        if total_bytes % target > self.config.min_file_size {
            // The remainder file is of valid size for this compaction
            return count_with_remainder;
        }

        let count_without_remainder = total_bytes / target;
        #[allow(clippy::cast_precision_loss)]
        let avg_without_remainder = (total_bytes / count_without_remainder) as f64;
        #[allow(clippy::cast_precision_loss)]
        let absorb_limit =
            (1.1 * target as f64).min(self.config.write_max_file_size() as f64);
        if avg_without_remainder < absorb_limit {
            count_without_remainder
        } else {
            count_with_remainder
        }
    }

    /// The split size to use when writing a group of `total_bytes`: the
    /// estimated per-file size, capped at the writer's max file size.
    #[must_use]
    pub fn split_size(&self, total_bytes: u64) -> u64 {
        let estimated = total_bytes / self.num_output_files(total_bytes);
        estimated.min(self.config.write_max_file_size())
    }

    fn group_size(group: &[ScanTask]) -> u64 {
        group.iter().map(ScanTask::length).sum()
    }
}

impl RewriteStrategy for BinPackStrategy {
    fn name(&self) -> &'static str {
        "binpack"
    }

    fn valid_options(&self) -> &'static [&'static str] {
        Self::VALID_OPTIONS
    }

    fn select_files_to_rewrite(&self, tasks: Vec<ScanTask>) -> Vec<ScanTask> {
        tasks
            .into_iter()
            .filter(|task| {
                task.length() < self.config.min_file_size
                    || task.length() > self.config.max_file_size
            })
            .collect()
    }

    fn plan_file_groups(&self, tasks: Vec<ScanTask>) -> Vec<Vec<ScanTask>> {
        let packer = ListPacker::new(self.config.max_group_size, 1);
        packer
            .pack(tasks, ScanTask::length)
            .into_iter()
            .filter(|group| {
                group.len() >= self.config.min_input_files
                    || Self::group_size(group) > self.config.target_file_size
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::PartitionKey;

    fn strategy(target: u64, min: u64, max: u64, group: u64, min_inputs: usize) -> BinPackStrategy {
        BinPackStrategy::new(BinPackConfig {
            target_file_size: target,
            min_file_size: min,
            max_file_size: max,
            max_group_size: group,
            min_input_files: min_inputs,
        })
    }

    fn tasks(sizes: &[u64]) -> Vec<ScanTask> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, size)| ScanTask::new(format!("file-{i}.parquet"), *size, PartitionKey::new()))
            .collect()
    }

    #[test]
    fn selects_only_outside_the_size_band() {
        let strategy = strategy(1000, 750, 1800, 10_000, 5);
        let selected = strategy.select_files_to_rewrite(tasks(&[100, 750, 1000, 1800, 1801]));

        let sizes: Vec<u64> = selected.iter().map(ScanTask::length).collect();
        assert_eq!(sizes, vec![100, 1801]);
    }

    #[test]
    fn keeps_group_with_enough_files() {
        let strategy = strategy(1000, 750, 1800, 10_000, 3);
        let groups = strategy.plan_file_groups(tasks(&[100, 100, 100]));
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn keeps_small_group_only_when_above_target() {
        let strategy = strategy(1000, 750, 1800, 10_000, 5);

        // Two files, 600 bytes total: below target, below min count -> dropped.
        assert!(strategy.plan_file_groups(tasks(&[300, 300])).is_empty());

        // Two files, 1100 bytes total: above target -> kept.
        let groups = strategy.plan_file_groups(tasks(&[600, 500]));
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn splits_groups_at_max_group_size() {
        let strategy = strategy(1000, 750, 1800, 500, 1);
        let groups = strategy.plan_file_groups(tasks(&[200, 200, 200, 200]));
        assert_eq!(groups.len(), 2);
        for group in &groups {
            assert!(BinPackStrategy::group_size(group) <= 500);
        }
    }

    #[test]
    fn oversize_task_forms_its_own_group() {
        let strategy = strategy(1000, 750, 1800, 500, 1);
        let groups = strategy.plan_file_groups(tasks(&[2000]));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 1);
    }

    #[test]
    fn one_file_below_target() {
        let strategy = strategy(1000, 750, 1800, 100_000, 5);
        assert_eq!(strategy.num_output_files(999), 1);
        assert_eq!(strategy.num_output_files(1), 1);
    }

    #[test]
    fn valid_remainder_file_is_kept() {
        let strategy = strategy(1000, 750, 1800, 100_000, 5);
        // Remainder 800 > min 750: keep it as its own file.
        assert_eq!(strategy.num_output_files(1800), 2);
    }

    #[test]
    fn small_remainder_is_absorbed() {
        // Writing 10100 with target 1000: the 100-byte remainder is not a
        // valid file; absorbing it gives 10 files of 1010, within 110% of
        // target.
        let strategy = strategy(1000, 750, 1800, 100_000, 5);
        assert_eq!(strategy.num_output_files(10_100), 10);
    }

    #[test]
    fn unabsorbable_remainder_is_kept() {
        // 1700 with target 1000: remainder 700 is below min 750, but one
        // file of 1700 would exceed the 110% absorb limit, so round up.
        let strategy = strategy(1000, 750, 1800, 100_000, 5);
        assert_eq!(strategy.num_output_files(1700), 2);
    }

    #[test]
    fn exact_multiple_of_target_rounds_down() {
        let strategy = strategy(1000, 750, 1800, 100_000, 5);
        assert_eq!(strategy.num_output_files(3000), 3);
    }

    #[test]
    fn split_size_is_capped_at_write_max() {
        let strategy = strategy(1000, 750, 1800, 100_000, 5);
        // write_max = 1000 + (1800 - 1000) / 2 = 1400
        assert_eq!(strategy.config().write_max_file_size(), 1400);

        // 1700 -> 2 output files -> estimated 850, below the cap.
        assert_eq!(strategy.split_size(1700), 850);

        // A single sub-target group splits at its own size.
        assert_eq!(strategy.split_size(900), 900);

        // 1050 -> remainder absorbed into a single 1050 file.
        assert_eq!(strategy.num_output_files(1050), 1);
        assert_eq!(strategy.split_size(1050), 1050);
    }
}

#[cfg(test)]
mod proptests {
    // `super::*` would pull in the `Strategy` enum, which collides with
    // proptest's `Strategy` trait.
    use super::{BinPackConfig, BinPackStrategy, RewriteStrategy, ScanTask};
    use proptest::prelude::*;
    use strata_core::PartitionKey;

    const PROPTEST_CASES: u32 = 256;

    fn test_config() -> ProptestConfig {
        ProptestConfig {
            cases: PROPTEST_CASES,
            ..ProptestConfig::default()
        }
    }

    fn config_strategy() -> impl Strategy<Value = BinPackConfig> {
        (2u64..1_000_000, 1u64..1000, 1u64..1000, 1u64..100_000, 1usize..10).prop_map(
            |(target, min_off, max_off, group, min_inputs)| BinPackConfig {
                target_file_size: target,
                min_file_size: target.saturating_sub(min_off),
                max_file_size: target + max_off,
                max_group_size: group,
                min_input_files: min_inputs,
            },
        )
    }

    fn sizes_strategy() -> impl Strategy<Value = Vec<u64>> {
        prop::collection::vec(0u64..2_000_000, 0..40)
    }

    fn tasks(sizes: &[u64]) -> Vec<ScanTask> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, size)| ScanTask::new(format!("f{i}"), *size, PartitionKey::new()))
            .collect()
    }

    proptest! {
        #![proptest_config(test_config())]

        #[test]
        fn selected_tasks_are_outside_the_band(
            config in config_strategy(),
            sizes in sizes_strategy(),
        ) {
            let strategy = BinPackStrategy::new(config);
            for task in strategy.select_files_to_rewrite(tasks(&sizes)) {
                prop_assert!(
                    task.length() < config.min_file_size || task.length() > config.max_file_size
                );
            }
        }

        #[test]
        fn groups_meet_count_or_size_threshold(
            config in config_strategy(),
            sizes in sizes_strategy(),
        ) {
            let strategy = BinPackStrategy::new(config);
            let selected = strategy.select_files_to_rewrite(tasks(&sizes));
            for group in strategy.plan_file_groups(selected) {
                let total: u64 = group.iter().map(ScanTask::length).sum();
                prop_assert!(
                    group.len() >= config.min_input_files || total > config.target_file_size
                );
            }
        }

        #[test]
        fn groups_respect_max_size_unless_singleton(
            config in config_strategy(),
            sizes in sizes_strategy(),
        ) {
            let strategy = BinPackStrategy::new(config);
            let selected = strategy.select_files_to_rewrite(tasks(&sizes));
            for group in strategy.plan_file_groups(selected) {
                let total: u64 = group.iter().map(ScanTask::length).sum();
                prop_assert!(total <= config.max_group_size || group.len() == 1);
            }
        }

        #[test]
        fn num_output_files_is_monotone(
            config in config_strategy(),
            total in 0u64..10_000_000,
            bump in 1u64..1_000_000,
        ) {
            let strategy = BinPackStrategy::new(config);
            prop_assert!(
                strategy.num_output_files(total) <= strategy.num_output_files(total + bump)
            );
        }

        #[test]
        fn split_size_never_exceeds_write_max(
            config in config_strategy(),
            total in 1u64..10_000_000,
        ) {
            let strategy = BinPackStrategy::new(config);
            prop_assert!(strategy.split_size(total) <= config.write_max_file_size());
        }
    }
}
