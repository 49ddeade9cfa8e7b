//! Partition key types with a deterministic canonical rendering.
//!
//! A compaction plan never merges files across partitions, so the planner
//! only needs an opaque key that supports equality, hashing, and a stable
//! ordering. The canonical string keeps log output and iteration order
//! deterministic regardless of dimension insertion order.
//!
//! # Canonical Encoding
//!
//! ```text
//! PARTITION_KEY_CANONICAL ::= dimension ("," dimension)*
//! dimension              ::= key "=" typed_value
//! typed_value            ::= type_tag ":" encoded_value
//!
//! type_tag ::= "s" (string) | "i" (int64) | "b" (bool) | "d" (date) | "n" (null)
//!
//! encoded_value ::=
//!   For "s": base64url_no_pad(utf8_bytes)
//!   For "i": decimal integer
//!   For "b": "true" | "false"
//!   For "d": "YYYY-MM-DD"
//!   For "n": "null"
//! ```
//!
//! # Examples
//!
//! ```rust
//! use strata_core::partition::{PartitionKey, ScalarValue};
//!
//! let mut pk = PartitionKey::new();
//! pk.insert("date", ScalarValue::Date("2025-01-15".into()));
//! pk.insert("region", ScalarValue::String("us-east".into()));
//!
//! // Keys are sorted, strings are base64url encoded
//! assert!(pk.canonical_string().starts_with("date=d:"));
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scalar value types allowed in partition keys.
///
/// Floats are intentionally excluded to prevent precision drift across
/// serialization formats.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScalarValue {
    /// Arbitrary string (base64url encoded in canonical form).
    String(String),
    /// 64-bit signed integer.
    Int64(i64),
    /// Boolean value.
    Boolean(bool),
    /// Date in YYYY-MM-DD format.
    Date(String),
    /// Explicit null value.
    Null,
}

impl ScalarValue {
    /// Returns the canonical representation with type tag.
    ///
    /// String values are base64url encoded (no padding) for URL safety.
    #[must_use]
    pub fn canonical_repr(&self) -> String {
        match self {
            Self::String(s) => {
                let encoded = URL_SAFE_NO_PAD.encode(s.as_bytes());
                format!("s:{encoded}")
            }
            Self::Int64(n) => format!("i:{n}"),
            Self::Boolean(b) => format!("b:{}", if *b { "true" } else { "false" }),
            Self::Date(d) => format!("d:{d}"),
            Self::Null => "n:null".to_string(),
        }
    }

    /// Returns the type tag character.
    #[must_use]
    pub const fn type_tag(&self) -> char {
        match self {
            Self::String(_) => 's',
            Self::Int64(_) => 'i',
            Self::Boolean(_) => 'b',
            Self::Date(_) => 'd',
            Self::Null => 'n',
        }
    }
}

/// Multi-dimensional partition key with deterministic canonical form.
///
/// Uses `BTreeMap` internally to ensure keys are always sorted
/// alphabetically. Implements `Ord` for use in sorted collections and
/// deterministic comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PartitionKey(BTreeMap<String, ScalarValue>);

impl PartialOrd for PartitionKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PartitionKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Compare by canonical string for deterministic ordering
        self.canonical_string().cmp(&other.canonical_string())
    }
}

impl PartitionKey {
    /// Creates a new empty partition key (an unpartitioned table).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a dimension into the partition key.
    ///
    /// If a dimension with the same key exists, it is replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: ScalarValue) {
        self.0.insert(key.into(), value);
    }

    /// Returns the canonical string representation.
    ///
    /// This is deterministic: same logical key produces same string,
    /// regardless of insertion order.
    #[must_use]
    pub fn canonical_string(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{k}={}", v.canonical_repr()))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Returns true if the partition key has no dimensions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of dimensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Gets a dimension value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ScalarValue> {
        self.0.get(key)
    }

    /// Returns an iterator over dimensions.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ScalarValue)> {
        self.0.iter()
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_string())
    }
}
