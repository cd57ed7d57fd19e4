//! Per-key FIFO serialization
//!
//! By default mutations against one query key are not queued: their
//! optimistic applies may interleave with each other's remote resolution,
//! the last optimistic apply wins at read time, and the invalidation after
//! each settlement bounds the drift. Enabling
//! [`MutationConfig::serialize_per_key`](crate::MutationConfig) routes every
//! attempt through a [`KeyedQueue`] lane so attempts on the same key run one
//! after another in arrival order.

use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tally_cache::QueryKey;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Lanes = DashMap<QueryKey, Arc<Mutex<()>>>;

/// Exclusive turn on one key's lane; the next waiter runs when it drops
///
/// The last turn out removes the lane, so per-entity keys do not accumulate.
pub struct QueueTurn {
    guard: Option<OwnedMutexGuard<()>>,
    lane: Arc<Mutex<()>>,
    key: QueryKey,
    lanes: Arc<Lanes>,
}

impl Drop for QueueTurn {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map and this turn still hold the lane: nobody is waiting.
        self.lanes.remove_if(&self.key, |_, lane| {
            Arc::ptr_eq(lane, &self.lane) && Arc::strong_count(lane) == 2
        });
    }
}

impl fmt::Debug for QueueTurn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueTurn").field("key", &self.key).finish_non_exhaustive()
    }
}

/// One FIFO lane per query key
#[derive(Debug, Clone, Default)]
pub struct KeyedQueue {
    lanes: Arc<Lanes>,
}

impl KeyedQueue {
    /// Create an empty queue
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for this key's turn
    ///
    /// Waiters are served in the order they called `enter`.
    pub async fn enter(&self, key: &QueryKey) -> QueueTurn {
        let lane = Arc::clone(&*self.lanes.entry(key.clone()).or_default());
        let guard = Arc::clone(&lane).lock_owned().await;
        QueueTurn {
            guard: Some(guard),
            lane,
            key: key.clone(),
            lanes: Arc::clone(&self.lanes),
        }
    }

    /// Number of keys with a turn held or awaited
    #[inline]
    #[must_use]
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }
}
