//! Change notifications for cache readers

use crate::key::QueryKey;

/// Event broadcast to cache subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// The collection at the key was written
    Updated { key: QueryKey },
    /// The collection is stale and a fresh authoritative read is permitted
    Invalidated { key: QueryKey },
    /// The collection was dropped from the cache
    Removed { key: QueryKey },
    /// A read finished after being cancelled and its result was ignored
    FetchDiscarded { key: QueryKey },
}

impl CacheEvent {
    /// Key the event refers to
    #[inline]
    #[must_use]
    pub fn key(&self) -> &QueryKey {
        match self {
            Self::Updated { key }
            | Self::Invalidated { key }
            | Self::Removed { key }
            | Self::FetchDiscarded { key } => key,
        }
    }
}
