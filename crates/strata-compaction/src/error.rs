//! Error types for the compaction domain.

use std::time::Duration;

use strata_core::GroupId;

/// The result type used throughout strata-compaction.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in compaction operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration violated an invariant or could not be parsed.
    ///
    /// Raised during validation, before any planning or rewriting starts.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// Options were supplied that neither the action nor the strategy
    /// recognizes.
    #[error("unsupported options: {options:?}")]
    UnsupportedOptions {
        /// The unrecognized option keys.
        options: Vec<String>,
    },

    /// A file group rewrite failed.
    #[error("rewrite failed for group {group_id}: {message}")]
    Rewrite {
        /// The group whose rewrite failed.
        group_id: GroupId,
        /// Description of the failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A commit over one or more file groups failed.
    #[error("commit failed: {message}")]
    Commit {
        /// Description of the failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The committer did not drain and terminate within its shutdown bound.
    #[error("committer did not terminate within {timeout:?}")]
    CommitterTimeout {
        /// The shutdown bound that was exceeded.
        timeout: Duration,
    },

    /// An error from strata-core.
    #[error("core error: {0}")]
    Core(#[from] strata_core::Error),
}

impl Error {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a new rewrite error without an underlying cause.
    #[must_use]
    pub fn rewrite(group_id: GroupId, message: impl Into<String>) -> Self {
        Self::Rewrite {
            group_id,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new rewrite error with a source cause.
    #[must_use]
    pub fn rewrite_with_source(
        group_id: GroupId,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Rewrite {
            group_id,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new commit error without an underlying cause.
    #[must_use]
    pub fn commit(message: impl Into<String>) -> Self {
        Self::Commit {
            message: message.into(),
            source: None,
        }
    }
}
