//! Query keys
//!
//! A query key names exactly one cached collection. Keys are ordered segment
//! lists such as `["tasks"]` or `["task-completions", "srv-12"]`:
//! - Two keys are equal iff their serialized JSON arrays are equal
//! - Prefix matching supports invalidating a whole family of collections

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Identifier of one logical collection in the cache
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKey(SmallVec<[String; 2]>);

impl QueryKey {
    /// Create a single-segment key
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<String>) -> Self {
        let mut segments = SmallVec::new();
        segments.push(root.into());
        Self(segments)
    }

    /// Create a key from an ordered list of segments
    #[must_use]
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Extend the key with one more segment
    #[inline]
    #[must_use]
    pub fn child(mut self, segment: impl ToString) -> Self {
        self.0.push(segment.to_string());
        self
    }

    /// Key segments in order
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// First segment (the entity kind by convention)
    #[inline]
    #[must_use]
    pub fn root(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the zero-segment key, which prefixes every key
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check whether `prefix` is a leading run of this key's segments
    #[must_use]
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Canonical serialized form (a JSON array of strings)
    #[must_use]
    pub fn serialized(&self) -> String {
        serde_json::Value::from(self.0.to_vec()).to_string()
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialized())
    }
}

impl From<&str> for QueryKey {
    fn from(root: &str) -> Self {
        Self::new(root)
    }
}

impl<const N: usize> From<[&str; N]> for QueryKey {
    fn from(segments: [&str; N]) -> Self {
        Self::from_segments(segments)
    }
}
