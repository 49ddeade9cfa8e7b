//! # strata-core
//!
//! Core primitives for the Strata compaction subsystem.
//!
//! This crate provides the foundational types shared across Strata components:
//!
//! - **Identifiers**: Strongly-typed group IDs
//! - **Partition Keys**: Opaque, orderable partition values with a canonical rendering
//! - **Ordered Byte Codec**: Scalars encoded so unsigned lexicographic compare matches native compare
//! - **Bit Interleaver**: Z-order key construction from encoded columns
//! - **Error Types**: Shared error definitions and result types
//!
//! ## Crate Boundary
//!
//! `strata-core` is the **only** crate allowed to define shared primitives.
//! Domain crates (planning, orchestration) build on the types defined here.
//!
//! ## Example
//!
//! ```rust
//! use strata_core::prelude::*;
//!
//! let group = GroupId::generate();
//!
//! let mut partition = PartitionKey::new();
//! partition.insert("date", ScalarValue::Date("2025-01-15".into()));
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod id;
pub mod interleave;
pub mod observability;
pub mod ordered_bytes;
pub mod partition;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use strata_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::id::GroupId;
    pub use crate::interleave::{concat_ordered, interleave_bits};
    pub use crate::ordered_bytes::{
        double_to_ordered_bytes, float_to_ordered_bytes, int_to_ordered_bytes,
        long_to_ordered_bytes, string_to_ordered_bytes,
    };
    pub use crate::partition::{PartitionKey, ScalarValue};
}

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use id::GroupId;
pub use observability::{LogFormat, init_logging};
pub use partition::{PartitionKey, ScalarValue};
