//! Keyed collection store
//!
//! Holds one collection per [`QueryKey`] and provides:
//! - Functional updates (`set`) that always see the latest value
//! - Cancellation of in-flight reads so a stale fetch cannot clobber an
//!   optimistic write
//! - Invalidation, which marks a collection stale and announces it
//! - A broadcast channel for reactive readers
//!
//! Values are type-erased like any other shared cache entry and recovered
//! by downcasting. A handle is cheap to clone; all clones share one store.

use crate::collection::Collection;
use crate::event::CacheEvent;
use crate::key::QueryKey;
use dashmap::DashMap;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the subscriber channel before slow readers start lagging
const EVENT_CAPACITY: usize = 256;

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of populated collections
    pub entry_count: usize,
    /// Number of collections marked stale
    pub stale_count: usize,
}

/// Proof that a read started at a given generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    key: QueryKey,
    generation: u64,
}

impl FetchTicket {
    /// Key being read
    #[inline]
    #[must_use]
    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

/// Re-read trigger consumed after every mutation settles
pub trait Invalidator: Send + Sync {
    /// Mark the collection at `key` stale and permit a fresh read
    fn invalidate(&self, key: &QueryKey);
}

struct Slot {
    value: Option<Arc<dyn Any + Send + Sync>>,
    stale: bool,
    generation: u64,
}

impl Slot {
    fn empty() -> Self {
        Self {
            value: None,
            stale: false,
            generation: 0,
        }
    }

    fn collection<E>(&self, key: &QueryKey) -> Option<Collection<E>>
    where
        E: Clone + Send + Sync + 'static,
    {
        let value = self.value.as_ref()?;
        let collection = value.downcast_ref::<Collection<E>>().cloned();
        if collection.is_none() {
            tracing::warn!(
                "Cache entry {} holds a different type than {}",
                key,
                std::any::type_name::<E>()
            );
        }
        collection
    }
}

struct Inner {
    slots: DashMap<QueryKey, Slot>,
    events: broadcast::Sender<CacheEvent>,
}

/// Shared handle to the collection cache
#[derive(Clone)]
pub struct CacheStore {
    inner: Arc<Inner>,
}

impl CacheStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                slots: DashMap::new(),
                events,
            }),
        }
    }

    /// Current collection at `key`
    ///
    /// Returns `None` if the key was never populated, was removed, or holds
    /// a collection of another type.
    #[must_use]
    pub fn get<E>(&self, key: &QueryKey) -> Option<Collection<E>>
    where
        E: Clone + Send + Sync + 'static,
    {
        self.inner.slots.get(key)?.collection(key)
    }

    /// Replace the collection at `key` with `updater(current)`
    ///
    /// The updater receives the latest value (empty when absent) and runs
    /// while the key's entry is locked, so two concurrent `set` calls can
    /// never compute from the same stale read. The updater must not call
    /// back into the store.
    pub fn set<E, F>(&self, key: &QueryKey, updater: F)
    where
        E: Clone + Send + Sync + 'static,
        F: FnOnce(&Collection<E>) -> Collection<E>,
    {
        {
            let mut slot = self
                .inner
                .slots
                .entry(key.clone())
                .or_insert_with(Slot::empty);
            let current = slot.collection::<E>(key).unwrap_or_default();
            let next = updater(&current);
            slot.value = Some(Arc::new(next));
        }
        self.emit(CacheEvent::Updated { key: key.clone() });
    }

    /// Like [`set`](Self::set), but only when a collection of type `E` is cached
    ///
    /// An absent key stays absent. Returns whether the updater ran.
    pub fn update_existing<E, F>(&self, key: &QueryKey, updater: F) -> bool
    where
        E: Clone + Send + Sync + 'static,
        F: FnOnce(&Collection<E>) -> Collection<E>,
    {
        let applied = match self.inner.slots.get_mut(key) {
            Some(mut slot) => match slot.collection::<E>(key) {
                Some(current) => {
                    slot.value = Some(Arc::new(updater(&current)));
                    true
                }
                None => false,
            },
            None => false,
        };
        if applied {
            self.emit(CacheEvent::Updated { key: key.clone() });
        }
        applied
    }

    /// Overwrite the collection at `key` unconditionally
    ///
    /// `None` removes the collection, leaving the key absent.
    pub fn replace<E>(&self, key: &QueryKey, value: Option<Collection<E>>)
    where
        E: Clone + Send + Sync + 'static,
    {
        match value {
            Some(collection) => {
                {
                    let mut slot = self
                        .inner
                        .slots
                        .entry(key.clone())
                        .or_insert_with(Slot::empty);
                    slot.value = Some(Arc::new(collection));
                }
                self.emit(CacheEvent::Updated { key: key.clone() });
            }
            None => self.remove(key),
        }
    }

    /// Drop the collection at `key`
    ///
    /// Reads in flight for the key are cancelled as well.
    pub fn remove(&self, key: &QueryKey) {
        let removed = match self.inner.slots.get_mut(key) {
            Some(mut slot) => {
                slot.generation += 1;
                slot.stale = false;
                slot.value.take().is_some()
            }
            None => false,
        };
        if removed {
            self.emit(CacheEvent::Removed { key: key.clone() });
        }
    }

    /// Abandon any read currently in flight for `key`
    ///
    /// Best-effort: the read's I/O keeps running, its result is ignored
    /// when it arrives.
    pub fn cancel_in_flight(&self, key: &QueryKey) {
        if let Some(mut slot) = self.inner.slots.get_mut(key) {
            slot.generation += 1;
            tracing::trace!("Cancelled in-flight reads for {} (generation {})", key, slot.generation);
        }
    }

    /// Mark the collection at `key` stale and announce it
    ///
    /// Idempotent and safe when nothing is cached or subscribed.
    pub fn invalidate(&self, key: &QueryKey) {
        if let Some(mut slot) = self.inner.slots.get_mut(key) {
            slot.stale = true;
            slot.generation += 1;
        }
        tracing::debug!("Invalidated {}", key);
        self.emit(CacheEvent::Invalidated { key: key.clone() });
    }

    /// Invalidate every key that starts with `prefix`
    ///
    /// Returns the keys that were invalidated.
    pub fn invalidate_matching(&self, prefix: &QueryKey) -> Vec<QueryKey> {
        let matching: Vec<QueryKey> = self
            .inner
            .slots
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();

        for key in &matching {
            self.invalidate(key);
        }
        matching
    }

    /// Start an authoritative read for `key`
    #[must_use]
    pub fn begin_fetch(&self, key: &QueryKey) -> FetchTicket {
        let slot = self
            .inner
            .slots
            .entry(key.clone())
            .or_insert_with(Slot::empty);
        FetchTicket {
            key: key.clone(),
            generation: slot.generation,
        }
    }

    /// Finish a read started with [`begin_fetch`](Self::begin_fetch)
    ///
    /// The result is stored only if nothing cancelled or invalidated the key
    /// in the meantime. Returns whether it was applied.
    pub fn complete_fetch<E>(&self, ticket: FetchTicket, collection: Collection<E>) -> bool
    where
        E: Clone + Send + Sync + 'static,
    {
        let FetchTicket { key, generation } = ticket;
        let applied = match self.inner.slots.get_mut(&key) {
            Some(mut slot) if slot.generation == generation => {
                slot.value = Some(Arc::new(collection));
                slot.stale = false;
                true
            }
            _ => false,
        };

        if applied {
            self.emit(CacheEvent::Updated { key });
        } else {
            tracing::debug!("Discarded stale read for {}", key);
            self.emit(CacheEvent::FetchDiscarded { key });
        }
        applied
    }

    /// Run `loader` as an authoritative read for `key`
    ///
    /// Returns the loaded collection if it was applied, `None` if the read
    /// was cancelled while the loader was running.
    ///
    /// # Errors
    /// Propagates the loader's error; the cache is left untouched.
    pub async fn fetch<E, F, Fut, Err>(
        &self,
        key: &QueryKey,
        loader: F,
    ) -> Result<Option<Collection<E>>, Err>
    where
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Collection<E>, Err>>,
    {
        let ticket = self.begin_fetch(key);
        let fresh = loader().await?;

        if self.complete_fetch(ticket, fresh.clone()) {
            Ok(Some(fresh))
        } else {
            Ok(None)
        }
    }

    /// Check if `key` holds a collection
    #[must_use]
    pub fn contains(&self, key: &QueryKey) -> bool {
        self.inner
            .slots
            .get(key)
            .is_some_and(|slot| slot.value.is_some())
    }

    /// Check if `key` was invalidated and not yet re-read
    #[must_use]
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.inner.slots.get(key).is_some_and(|slot| slot.stale)
    }

    /// Keys that currently hold a collection
    #[must_use]
    pub fn keys(&self) -> Vec<QueryKey> {
        let mut keys: Vec<QueryKey> = self
            .inner
            .slots
            .iter()
            .filter(|entry| entry.value().value.is_some())
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }

    /// Get cache statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.inner
            .slots
            .iter()
            .filter(|entry| entry.value().value.is_some())
            .fold(CacheStats::default(), |mut stats, entry| {
                stats.entry_count += 1;
                if entry.value().stale {
                    stats.stale_count += 1;
                }
                stats
            })
    }

    /// Subscribe to change events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    fn emit(&self, event: CacheEvent) {
        // No receivers is the normal headless case.
        let _ = self.inner.events.send(event);
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("stats", &self.stats())
            .finish()
    }
}

impl Invalidator for CacheStore {
    fn invalidate(&self, key: &QueryKey) {
        CacheStore::invalidate(self, key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> QueryKey {
        QueryKey::new("numbers")
    }

    #[test]
    fn get_absent_is_none() {
        let store = CacheStore::new();
        assert!(store.get::<u32>(&key()).is_none());
        assert!(!store.contains(&key()));
    }

    #[test]
    fn set_on_absent_starts_from_empty() {
        let store = CacheStore::new();
        store.set::<u32, _>(&key(), |current| {
            assert!(current.is_empty());
            im::vector![1, 2]
        });

        assert_eq!(store.get::<u32>(&key()), Some(im::vector![1, 2]));
    }

    #[test]
    fn set_sees_latest_value() {
        let store = CacheStore::new();
        for n in 0..10u32 {
            store.set::<u32, _>(&key(), |current| {
                let mut next = current.clone();
                next.push_back(n);
                next
            });
        }
        assert_eq!(store.get::<u32>(&key()).map(|c| c.len()), Some(10));
    }

    #[test]
    fn type_mismatch_reads_as_absent() {
        let store = CacheStore::new();
        store.set::<u32, _>(&key(), |_| im::vector![7]);

        assert!(store.get::<String>(&key()).is_none());
        assert!(store.contains(&key()));
    }

    #[test]
    fn update_existing_leaves_absent_key_absent() {
        let store = CacheStore::new();
        let ran = store.update_existing::<u32, _>(&key(), |_| im::vector![1]);

        assert!(!ran);
        assert!(!store.contains(&key()));
    }

    #[test]
    fn update_existing_skips_other_types() {
        let store = CacheStore::new();
        store.set::<u32, _>(&key(), |_| im::vector![1]);

        assert!(!store.update_existing::<String, _>(&key(), |_| im::Vector::new()));
        assert!(store.update_existing::<u32, _>(&key(), |c| c.iter().map(|n| n * 10).collect()));
        assert_eq!(store.get::<u32>(&key()), Some(im::vector![10]));
    }

    #[test]
    fn replace_none_removes() {
        let store = CacheStore::new();
        store.set::<u32, _>(&key(), |_| im::vector![7]);
        store.replace::<u32>(&key(), None);

        assert!(store.get::<u32>(&key()).is_none());
        assert!(store.keys().is_empty());
    }

    #[test]
    fn cancelled_fetch_is_discarded() {
        let store = CacheStore::new();
        store.set::<u32, _>(&key(), |_| im::vector![1]);

        let ticket = store.begin_fetch(&key());
        store.cancel_in_flight(&key());
        store.set::<u32, _>(&key(), |c| {
            let mut next = c.clone();
            next.push_front(0);
            next
        });

        assert!(!store.complete_fetch::<u32>(ticket, im::vector![99]));
        assert_eq!(store.get::<u32>(&key()), Some(im::vector![0, 1]));
    }

    #[test]
    fn uncancelled_fetch_applies_and_clears_stale() {
        let store = CacheStore::new();
        store.set::<u32, _>(&key(), |_| im::vector![1]);
        store.invalidate(&key());
        assert!(store.is_stale(&key()));

        let ticket = store.begin_fetch(&key());
        assert!(store.complete_fetch::<u32>(ticket, im::vector![5]));

        assert!(!store.is_stale(&key()));
        assert_eq!(store.get::<u32>(&key()), Some(im::vector![5]));
    }

    #[test]
    fn invalidate_cancels_in_flight_read() {
        let store = CacheStore::new();
        let ticket = store.begin_fetch(&key());
        store.invalidate(&key());

        assert!(!store.complete_fetch::<u32>(ticket, im::vector![5]));
        assert!(store.get::<u32>(&key()).is_none());
    }

    #[test]
    fn invalidate_unknown_key_is_harmless() {
        let store = CacheStore::new();
        store.invalidate(&key());
        store.invalidate(&key());
        assert_eq!(store.stats(), CacheStats::default());
    }

    #[test]
    fn invalidate_matching_prefix() {
        let store = CacheStore::new();
        let family = QueryKey::new("history");
        store.set::<u32, _>(&family.clone().child("a"), |_| im::vector![1]);
        store.set::<u32, _>(&family.clone().child("b"), |_| im::vector![2]);
        store.set::<u32, _>(&key(), |_| im::vector![3]);

        let mut hit = store.invalidate_matching(&family);
        hit.sort();

        assert_eq!(hit, vec![family.clone().child("a"), family.child("b")]);
        assert!(!store.is_stale(&key()));
        assert_eq!(store.stats().stale_count, 2);
        assert_eq!(store.stats().entry_count, 3);
    }

    #[test]
    fn subscribers_see_events() {
        let store = CacheStore::new();
        let mut events = store.subscribe();

        store.set::<u32, _>(&key(), |_| im::vector![1]);
        store.invalidate(&key());
        store.remove(&key());

        assert_eq!(events.try_recv().unwrap(), CacheEvent::Updated { key: key() });
        assert_eq!(events.try_recv().unwrap(), CacheEvent::Invalidated { key: key() });
        assert_eq!(events.try_recv().unwrap(), CacheEvent::Removed { key: key() });
    }

    #[tokio::test]
    async fn fetch_applies_loader_result() {
        let store = CacheStore::new();
        let loaded = store
            .fetch::<u32, _, _, std::io::Error>(&key(), || async { Ok(im::vector![4, 2]) })
            .await
            .unwrap();

        assert_eq!(loaded, Some(im::vector![4, 2]));
        assert_eq!(store.get::<u32>(&key()), Some(im::vector![4, 2]));
    }

    #[tokio::test]
    async fn fetch_error_leaves_cache_untouched() {
        let store = CacheStore::new();
        store.set::<u32, _>(&key(), |_| im::vector![1]);

        let result = store
            .fetch::<u32, _, _, String>(&key(), || async { Err("offline".to_string()) })
            .await;

        assert_eq!(result, Err("offline".to_string()));
        assert_eq!(store.get::<u32>(&key()), Some(im::vector![1]));
    }
}
