//! Configuration surface for the compaction action.
//!
//! All options arrive as string key/value pairs, mirroring table-property
//! plumbing. Typed accessors parse with defaults; validation runs before any
//! planning or rewriting so a bad configuration has no side effects.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// String-keyed option map, as handed over from the table property layer.
pub type Options = BTreeMap<String, String>;

/// Desired post-compaction file size in bytes.
pub const TARGET_FILE_SIZE_BYTES: &str = "target-file-size-bytes";

/// Default target file size (512 MiB), inherited from the table write
/// target when the option is absent.
pub const TARGET_FILE_SIZE_BYTES_DEFAULT: u64 = 512 * 1024 * 1024;

/// Files smaller than this are considered for rewriting.
///
/// Defaults to 75% of the target file size. Functions independently of
/// [`MAX_FILE_SIZE_BYTES`].
pub const MIN_FILE_SIZE_BYTES: &str = "min-file-size-bytes";

/// Default ratio of target used for [`MIN_FILE_SIZE_BYTES`].
pub const MIN_FILE_SIZE_DEFAULT_RATIO: f64 = 0.75;

/// Files larger than this are considered for rewriting.
///
/// Defaults to 180% of the target file size. Functions independently of
/// [`MIN_FILE_SIZE_BYTES`].
pub const MAX_FILE_SIZE_BYTES: &str = "max-file-size-bytes";

/// Default ratio of target used for [`MAX_FILE_SIZE_BYTES`].
pub const MAX_FILE_SIZE_DEFAULT_RATIO: f64 = 1.80;

/// The minimum number of files a group must contain to be rewritten when its
/// total size is below the target file size.
pub const MIN_INPUT_FILES: &str = "min-input-files";

/// Default for [`MIN_INPUT_FILES`].
pub const MIN_INPUT_FILES_DEFAULT: usize = 5;

/// Maximum total bytes the packer places in one file group.
pub const MAX_FILE_GROUP_SIZE_BYTES: &str = "max-file-group-size-bytes";

/// Default for [`MAX_FILE_GROUP_SIZE_BYTES`] (100 GiB).
pub const MAX_FILE_GROUP_SIZE_BYTES_DEFAULT: u64 = 100 * 1024 * 1024 * 1024;

/// Maximum number of file groups rewritten concurrently.
pub const MAX_CONCURRENT_FILE_GROUP_ACTIONS: &str = "max-concurrent-file-group-actions";

/// Default for [`MAX_CONCURRENT_FILE_GROUP_ACTIONS`].
pub const MAX_CONCURRENT_FILE_GROUP_ACTIONS_DEFAULT: usize = 1;

/// Enables committing completed groups in batches while rewriting continues.
pub const PARTIAL_PROGRESS_ENABLED: &str = "partial-progress.enabled";

/// Default for [`PARTIAL_PROGRESS_ENABLED`].
pub const PARTIAL_PROGRESS_ENABLED_DEFAULT: bool = false;

/// Maximum number of commits produced in partial-progress mode.
pub const PARTIAL_PROGRESS_MAX_COMMITS: &str = "partial-progress.max-commits";

/// Default for [`PARTIAL_PROGRESS_MAX_COMMITS`].
pub const PARTIAL_PROGRESS_MAX_COMMITS_DEFAULT: usize = 10;

pub(crate) fn property_as_u64(options: &Options, key: &str, default: u64) -> Result<u64> {
    match options.get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| Error::config(format!("cannot parse {key}='{raw}' as an integer"))),
        None => Ok(default),
    }
}

pub(crate) fn property_as_usize(options: &Options, key: &str, default: usize) -> Result<usize> {
    match options.get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| Error::config(format!("cannot parse {key}='{raw}' as an integer"))),
        None => Ok(default),
    }
}

pub(crate) fn property_as_bool(options: &Options, key: &str, default: bool) -> Result<bool> {
    match options.get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| Error::config(format!("cannot parse {key}='{raw}' as a boolean"))),
        None => Ok(default),
    }
}

/// Sizing thresholds for the bin-pack strategy.
///
/// `min_file_size` is non-negative by construction; the remaining invariant
/// `min_file_size < target_file_size < max_file_size` is enforced by
/// [`BinPackConfig::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinPackConfig {
    /// Desired output file size.
    pub target_file_size: u64,
    /// Lower bound of the well-sized band.
    pub min_file_size: u64,
    /// Upper bound of the well-sized band.
    pub max_file_size: u64,
    /// Maximum total size of one file group.
    pub max_group_size: u64,
    /// Minimum file count for a below-target group to be rewritten.
    pub min_input_files: usize,
}

impl BinPackConfig {
    /// Resolves the strategy configuration from string options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a value fails to parse or an invariant
    /// from [`BinPackConfig::validate`] is violated.
    pub fn from_options(options: &Options) -> Result<Self> {
        let target_file_size = property_as_u64(
            options,
            TARGET_FILE_SIZE_BYTES,
            TARGET_FILE_SIZE_BYTES_DEFAULT,
        )?;

        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        #[allow(clippy::cast_sign_loss)]
        let min_file_size = property_as_u64(
            options,
            MIN_FILE_SIZE_BYTES,
            (target_file_size as f64 * MIN_FILE_SIZE_DEFAULT_RATIO) as u64,
        )?;

        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        #[allow(clippy::cast_sign_loss)]
        let max_file_size = property_as_u64(
            options,
            MAX_FILE_SIZE_BYTES,
            (target_file_size as f64 * MAX_FILE_SIZE_DEFAULT_RATIO) as u64,
        )?;

        let max_group_size = property_as_u64(
            options,
            MAX_FILE_GROUP_SIZE_BYTES,
            MAX_FILE_GROUP_SIZE_BYTES_DEFAULT,
        )?;

        let min_input_files =
            property_as_usize(options, MIN_INPUT_FILES, MIN_INPUT_FILES_DEFAULT)?;

        let config = Self {
            target_file_size,
            min_file_size,
            max_file_size,
            max_group_size,
            min_input_files,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the threshold invariants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] unless
    /// `min_file_size < target_file_size < max_file_size` and
    /// `min_input_files >= 1`.
    pub fn validate(&self) -> Result<()> {
        if self.min_file_size >= self.target_file_size {
            return Err(Error::config(format!(
                "cannot set {MIN_FILE_SIZE_BYTES} ({}) greater than or equal to \
                 {TARGET_FILE_SIZE_BYTES} ({}), all files written will be smaller than the threshold",
                self.min_file_size, self.target_file_size
            )));
        }

        if self.target_file_size >= self.max_file_size {
            return Err(Error::config(format!(
                "cannot set {MAX_FILE_SIZE_BYTES} ({}) less than or equal to \
                 {TARGET_FILE_SIZE_BYTES} ({}), all files written will be larger than the threshold",
                self.max_file_size, self.target_file_size
            )));
        }

        if self.min_input_files < 1 {
            return Err(Error::config(format!(
                "cannot set {MIN_INPUT_FILES} to {}, the value must be positive",
                self.min_input_files
            )));
        }

        Ok(())
    }

    /// The size actually handed to writers: the target plus half the
    /// distance to the maximum.
    ///
    /// Writing slightly above target absorbs serialization expansion and
    /// avoids a sliver remainder file next to each full output file.
    #[must_use]
    pub fn write_max_file_size(&self) -> u64 {
        self.target_file_size + (self.max_file_size - self.target_file_size) / 2
    }
}

/// Execution settings for the rewrite orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Number of file groups rewritten concurrently.
    pub max_concurrent_group_actions: usize,
    /// Whether completed groups commit in batches while rewriting continues.
    pub partial_progress_enabled: bool,
    /// Maximum number of commit batches in partial-progress mode.
    pub max_commits: usize,
}

impl OrchestratorConfig {
    /// Resolves the orchestrator configuration from string options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a value fails to parse or an invariant
    /// from [`OrchestratorConfig::validate`] is violated.
    pub fn from_options(options: &Options) -> Result<Self> {
        let max_concurrent_group_actions = property_as_usize(
            options,
            MAX_CONCURRENT_FILE_GROUP_ACTIONS,
            MAX_CONCURRENT_FILE_GROUP_ACTIONS_DEFAULT,
        )?;

        let partial_progress_enabled = property_as_bool(
            options,
            PARTIAL_PROGRESS_ENABLED,
            PARTIAL_PROGRESS_ENABLED_DEFAULT,
        )?;

        let max_commits = property_as_usize(
            options,
            PARTIAL_PROGRESS_MAX_COMMITS,
            PARTIAL_PROGRESS_MAX_COMMITS_DEFAULT,
        )?;

        let config = Self {
            max_concurrent_group_actions,
            partial_progress_enabled,
            max_commits,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the orchestrator invariants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] unless `max_concurrent_group_actions >= 1`
    /// and, when partial progress is enabled, `max_commits >= 1`.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_group_actions < 1 {
            return Err(Error::config(format!(
                "cannot set {MAX_CONCURRENT_FILE_GROUP_ACTIONS} to {}, the value must be positive",
                self.max_concurrent_group_actions
            )));
        }

        if self.partial_progress_enabled && self.max_commits < 1 {
            return Err(Error::config(format!(
                "cannot set {PARTIAL_PROGRESS_MAX_COMMITS} to {}, the value must be positive \
                 when {PARTIAL_PROGRESS_ENABLED} is true",
                self.max_commits
            )));
        }

        Ok(())
    }
}
