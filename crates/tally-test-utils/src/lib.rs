//! Testing utilities for the Tally workspace
//!
//! Scripted and gated remote operations, recording sinks, and fixtures.

#![allow(missing_docs)]

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tally_cache::{CacheStore, Collection, EntityId, Invalidator, QueryKey};
use tally_domain::{Task, TaskCompletion, TaskDefaults, TaskDraft};
use tally_mutation::{Draft, MutationConfig, Mutations, Notification, Notifier, RemoteError, RemoteOperation};
use tokio::sync::oneshot;

/// Remote operation that answers from a script, in order
///
/// Calls past the end of the script fail with a network error.
pub struct StubRemote<V, O> {
    script: Mutex<VecDeque<Result<O, RemoteError>>>,
    calls: Mutex<Vec<V>>,
}

impl<V, O> StubRemote<V, O> {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn then_ok(self, value: O) -> Self {
        self.script.lock().push_back(Ok(value));
        self
    }

    pub fn then_err(self, err: RemoteError) -> Self {
        self.script.lock().push_back(Err(err));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.calls.lock().clone()
    }
}

impl<V, O> Default for StubRemote<V, O> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl<V, O> RemoteOperation<V, O> for StubRemote<V, O>
where
    V: Send + 'static,
    O: Send + 'static,
{
    async fn call(&self, variables: V) -> Result<O, RemoteError> {
        self.calls.lock().push(variables);
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(RemoteError::Network("no scripted response".into())))
    }
}

/// Remote operation that parks until its [`Gate`] releases it
///
/// Lets a test observe the cache while the mutation is in flight.
pub struct GatedRemote<V, O> {
    entered: Mutex<Option<oneshot::Sender<V>>>,
    release: Mutex<Option<oneshot::Receiver<Result<O, RemoteError>>>>,
}

/// Test side of a [`GatedRemote`]
pub struct Gate<V, O> {
    entered: oneshot::Receiver<V>,
    release: oneshot::Sender<Result<O, RemoteError>>,
}

/// One-shot gated remote and its gate
pub fn gated<V, O>() -> (GatedRemote<V, O>, Gate<V, O>) {
    let (entered_tx, entered_rx) = oneshot::channel();
    let (release_tx, release_rx) = oneshot::channel();
    (
        GatedRemote {
            entered: Mutex::new(Some(entered_tx)),
            release: Mutex::new(Some(release_rx)),
        },
        Gate {
            entered: entered_rx,
            release: release_tx,
        },
    )
}

impl<V, O> Gate<V, O> {
    /// Wait until the remote call starts; yields the variables it received
    pub async fn entered(&mut self) -> Option<V> {
        (&mut self.entered).await.ok()
    }

    /// Let the remote call return `outcome`
    pub fn release(self, outcome: Result<O, RemoteError>) {
        let _ = self.release.send(outcome);
    }
}

#[async_trait::async_trait]
impl<V, O> RemoteOperation<V, O> for GatedRemote<V, O>
where
    V: Send + 'static,
    O: Send + 'static,
{
    async fn call(&self, variables: V) -> Result<O, RemoteError> {
        if let Some(entered) = self.entered.lock().take() {
            let _ = entered.send(variables);
        }
        let release = self.release.lock().take();
        match release {
            Some(release) => release
                .await
                .unwrap_or_else(|_| Err(RemoteError::Network("gate dropped".into()))),
            None => Err(RemoteError::Network("gate already used".into())),
        }
    }
}

/// Issues `srv-1`, `srv-2`, ... like a database sequence
#[derive(Debug, Clone, Default)]
pub struct ServerIds {
    next: Arc<AtomicU64>,
}

impl ServerIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> EntityId {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        EntityId::server(format!("srv-{n}"))
    }
}

/// Notifier that keeps every notification
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().clone()
    }

    pub fn errors(&self) -> Vec<Notification> {
        self.seen.lock().iter().filter(|n| n.is_error()).cloned().collect()
    }

    pub fn successes(&self) -> Vec<Notification> {
        self.seen.lock().iter().filter(|n| !n.is_error()).cloned().collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) {
        self.seen.lock().push(notification.clone());
    }
}

/// Invalidator that counts calls per key before passing them to the store
#[derive(Debug)]
pub struct CountingInvalidator {
    store: CacheStore,
    counts: Mutex<HashMap<QueryKey, usize>>,
}

impl CountingInvalidator {
    pub fn new(store: CacheStore) -> Self {
        Self {
            store,
            counts: Mutex::new(HashMap::new()),
        }
    }

    pub fn count(&self, key: &QueryKey) -> usize {
        self.counts.lock().get(key).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.lock().values().sum()
    }
}

impl Invalidator for CountingInvalidator {
    fn invalidate(&self, key: &QueryKey) {
        *self.counts.lock().entry(key.clone()).or_insert(0) += 1;
        self.store.invalidate(key);
    }
}

/// Store, executor handle and recording doubles wired together
pub struct Harness {
    pub store: CacheStore,
    pub mutations: Mutations,
    pub notifier: Arc<RecordingNotifier>,
    pub invalidator: Arc<CountingInvalidator>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(MutationConfig::default())
    }

    pub fn with_config(config: MutationConfig) -> Self {
        let store = CacheStore::new();
        let notifier = Arc::new(RecordingNotifier::new());
        let invalidator = Arc::new(CountingInvalidator::new(store.clone()));
        let mutations = Mutations::new(store.clone())
            .with_notifier(notifier.clone())
            .with_invalidator(invalidator.clone())
            .with_config(config);
        Self {
            store,
            mutations,
            notifier,
            invalidator,
        }
    }

    /// Seed `key` with `items`
    pub fn seed<E>(&self, key: &QueryKey, items: impl IntoIterator<Item = E>)
    where
        E: Clone + Send + Sync + 'static,
    {
        let items: Collection<E> = items.into_iter().collect();
        self.store.replace(key, Some(items));
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn fixed_time() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

/// Saved task with default fields
pub fn task(id: &str, title: &str) -> Task {
    Task {
        created_at: Some(fixed_time()),
        ..TaskDraft::new(title).build(EntityId::server(id), &TaskDefaults::default())
    }
}

pub fn completion(id: &str, task_id: &str) -> TaskCompletion {
    TaskCompletion {
        id: EntityId::server(id),
        task_id: EntityId::server(task_id),
        points: 1,
        completed_at: fixed_time(),
    }
}

/// What the server stores for a task draft
pub fn saved_task(draft: &TaskDraft, id: EntityId) -> Task {
    Task {
        created_at: Some(fixed_time()),
        ..draft.build(id, &TaskDefaults::default())
    }
}
