//! Snapshot and restore of a single collection

use crate::collection::Collection;
use crate::key::QueryKey;
use crate::store::CacheStore;

/// Pre-mutation value of one collection
///
/// Collections are persistent values, so the snapshot is the value itself.
/// An absent collection is captured as `None` and restored as absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<E: Clone> {
    key: QueryKey,
    value: Option<Collection<E>>,
}

impl<E> Snapshot<E>
where
    E: Clone + Send + Sync + 'static,
{
    /// Capture the current collection at `key`
    #[must_use]
    pub fn capture(store: &CacheStore, key: &QueryKey) -> Self {
        Self {
            key: key.clone(),
            value: store.get::<E>(key),
        }
    }

    /// Write the captured value back, overwriting whatever is there now
    pub fn restore(&self, store: &CacheStore) {
        tracing::debug!("Restoring snapshot of {}", self.key);
        store.replace(&self.key, self.value.clone());
    }

    /// Key the snapshot was taken from
    #[inline]
    #[must_use]
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Captured collection, `None` if the key was absent
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&Collection<E>> {
        self.value.as_ref()
    }
}

/// Capture the collection at `key`
#[inline]
#[must_use]
pub fn snapshot<E>(store: &CacheStore, key: &QueryKey) -> Snapshot<E>
where
    E: Clone + Send + Sync + 'static,
{
    Snapshot::capture(store, key)
}

/// Write `snapshot` back into `store`
#[inline]
pub fn restore<E>(store: &CacheStore, snapshot: &Snapshot<E>)
where
    E: Clone + Send + Sync + 'static,
{
    snapshot.restore(store);
}
