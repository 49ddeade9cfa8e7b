//! Strongly-typed identifiers for Strata entities.
//!
//! All identifiers in Strata are:
//! - **Strongly typed**: Prevents mixing up different ID types at compile time
//! - **Lexicographically sortable**: ULIDs encode creation time and sort naturally
//! - **Globally unique**: No coordination required for generation
//!
//! # Example
//!
//! ```rust
//! use strata_core::id::GroupId;
//!
//! let a = GroupId::generate();
//! let b = GroupId::generate();
//! assert_ne!(a, b);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

use crate::error::{Error, Result};

/// A unique identifier for a rewrite file group.
///
/// A fresh `GroupId` is minted when the planner emits a file group and
/// identifies that group across rewrite, commit, and abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(Ulid);

impl GroupId {
    /// Generates a new unique group ID.
    ///
    /// Uses ULID generation which is:
    /// - Lexicographically sortable by creation time
    /// - Globally unique without coordination
    /// - URL-safe and case-insensitive
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    /// Creates a group ID from a raw ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Returns the underlying ULID.
    #[must_use]
    pub const fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GroupId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ulid::from_string(s)
            .map(Self)
            .map_err(|e| Error::InvalidId {
                message: format!("invalid group ID '{s}': {e}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = GroupId::generate();
        let b = GroupId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn roundtrips_through_string() {
        let id = GroupId::generate();
        let parsed: GroupId = id.to_string().parse().expect("valid ULID");
        assert_eq!(id, parsed);
    }

    #[test]
    fn rejects_garbage() {
        let result: Result<GroupId> = "not-a-ulid!".parse();
        assert!(matches!(result, Err(Error::InvalidId { .. })));
    }

    #[test]
    fn serde_is_transparent() {
        let id = GroupId::generate();
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, format!("\"{id}\""));
        let back: GroupId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(id, back);
    }
}
