//! Mutation executors
//!
//! Each executor drives one [`MutationContext`] through the state machine:
//! 1. `begin`: cancel in-flight reads for the key, take the snapshot
//! 2. `apply`: write the optimistic change, then await the remote call
//! 3. `reconcile` on success, [`roll_back`] on failure
//! 4. [`settle`]: invalidate the key, unconditionally
//!
//! The transition functions are synchronous and never yield, so each cache
//! write is atomic with respect to other tasks. The only suspension point is
//! the remote call (and the per-key queue, when enabled). Dropping an
//! executor future during the remote call rolls back and settles as if the
//! call had failed.

pub mod create;
pub mod delete;
pub mod update;

pub use delete::Related;

use crate::config::MutationConfig;
use crate::context::MutationContext;
use crate::error::{MutationError, RemoteError, ValidationError};
use crate::notify::{Notification, Notifier, TracingNotifier};
use crate::queue::{KeyedQueue, QueueTurn};
use crate::remote::RemoteOperation;
use crate::state::{MutationKind, MutationState};
use crate::synth::Validate;
use std::fmt;
use std::sync::Arc;
use tally_cache::{CacheStore, Entity, EntityId, Invalidator, QueryKey, Snapshot};

/// `Idle -> Applying`: cancel in-flight reads and capture the snapshot
///
/// # Errors
/// `IllegalTransition` unless the context is idle.
pub fn begin<E: Entity>(store: &CacheStore, ctx: &mut MutationContext<E>) -> Result<(), MutationError> {
    ctx.advance(MutationState::Applying)?;
    store.cancel_in_flight(ctx.key());
    let snapshot = Snapshot::capture(store, ctx.key());
    ctx.set_snapshot(snapshot);
    Ok(())
}

/// `Applying | AwaitingRemote -> RollingBack`: restore every snapshot
///
/// The primary collection is restored first so a problem with related data
/// can never hold it back.
///
/// # Errors
/// `IllegalTransition` from any other state.
pub fn roll_back<E: Entity>(store: &CacheStore, ctx: &mut MutationContext<E>) -> Result<(), MutationError> {
    ctx.advance(MutationState::RollingBack)?;
    ctx.restore_all(store);
    Ok(())
}

/// `Reconciling | RollingBack -> Settled`: invalidate the primary key
///
/// The invalidation is issued even if the transition is out of order, so no
/// attempt leaves the cache without a fresh read being permitted.
///
/// # Errors
/// `IllegalTransition` if the attempt had not reconciled or rolled back.
pub fn settle<E: Entity>(
    invalidator: &dyn Invalidator,
    ctx: &mut MutationContext<E>,
) -> Result<(), MutationError> {
    invalidator.invalidate(ctx.key());
    ctx.advance(MutationState::Settled)
}

/// Handle through which every optimistic mutation runs
///
/// Owns no global state: the store, notifier and invalidator are supplied
/// explicitly, so tests can run any number of independent instances.
#[derive(Clone)]
pub struct Mutations {
    store: CacheStore,
    notifier: Arc<dyn Notifier>,
    invalidator: Arc<dyn Invalidator>,
    config: MutationConfig,
    queue: KeyedQueue,
}

impl Mutations {
    /// Create a handle over `store`
    ///
    /// Outcomes go to the tracing log and invalidation goes to the store
    /// until replaced.
    #[must_use]
    pub fn new(store: CacheStore) -> Self {
        Self {
            invalidator: Arc::new(store.clone()),
            store,
            notifier: Arc::new(TracingNotifier),
            config: MutationConfig::default(),
            queue: KeyedQueue::new(),
        }
    }

    /// With notification sink
    #[inline]
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// With invalidation trigger
    #[inline]
    #[must_use]
    pub fn with_invalidator(mut self, invalidator: Arc<dyn Invalidator>) -> Self {
        self.invalidator = invalidator;
        self
    }

    /// With configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: MutationConfig) -> Self {
        self.config = config;
        self
    }

    /// Cache the executors write through
    #[inline]
    #[must_use]
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &MutationConfig {
        &self.config
    }

    /// Reject invalid variables before anything touches the cache
    fn check<V>(&self, kind: MutationKind, entity: &'static str, variables: &V) -> Result<(), MutationError>
    where
        V: Validate + ?Sized,
    {
        self.check_with(kind, entity, variables.validate())
    }

    fn check_target(&self, kind: MutationKind, entity: &'static str, id: &EntityId) -> Result<(), MutationError> {
        self.check_with(kind, entity, id.validate())
    }

    fn check_with(
        &self,
        kind: MutationKind,
        entity: &'static str,
        outcome: Result<(), ValidationError>,
    ) -> Result<(), MutationError> {
        match outcome {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!("Rejected {} {} before apply: {}", entity, kind, err);
                self.notifier
                    .notify(&Notification::error(entity, kind, err.to_string()));
                Err(err.into())
            }
        }
    }

    /// Take this key's turn when per-key serialization is on
    async fn turn(&self, key: &QueryKey) -> Option<QueueTurn> {
        if self.config.serialize_per_key {
            Some(self.queue.enter(key).await)
        } else {
            None
        }
    }

    /// Await the remote write, applying the configured timeout
    async fn call_remote<V, O, R>(&self, remote: &R, variables: V) -> Result<O, RemoteError>
    where
        V: Send + 'static,
        R: RemoteOperation<V, O> + ?Sized,
    {
        match self.config.remote_timeout_ms {
            Some(limit_ms) => {
                let limit = std::time::Duration::from_millis(limit_ms);
                match tokio::time::timeout(limit, remote.call(variables)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(RemoteError::Timeout {
                        elapsed_ms: limit_ms,
                    }),
                }
            }
            None => remote.call(variables).await,
        }
    }

    /// Guard `ctx` for the duration of the remote call
    fn inflight<E: Entity>(&self, ctx: MutationContext<E>) -> Inflight<'_, E> {
        Inflight {
            mutations: self,
            ctx,
        }
    }

    /// Reconcile or roll back, notify, then settle
    fn finish<E, O, F>(
        &self,
        mut attempt: Inflight<'_, E>,
        outcome: Result<O, RemoteError>,
        reconcile: F,
    ) -> Result<O, MutationError>
    where
        E: Entity,
        F: FnOnce(&CacheStore, &mut MutationContext<E>, &O) -> Result<(), MutationError>,
    {
        let ctx = &mut attempt.ctx;
        let kind = ctx.kind();
        let result = match outcome {
            Ok(value) => reconcile(&self.store, ctx, &value).map(|()| {
                if self.config.notify_success {
                    let detail = ctx.target().map(ToString::to_string).unwrap_or_default();
                    self.notifier
                        .notify(&Notification::success(E::KIND, kind, detail));
                }
                value
            }),
            Err(source) => {
                tracing::warn!(
                    "{} {} failed on {}, rolling back: {}",
                    E::KIND,
                    kind,
                    ctx.key(),
                    source
                );
                let rolled_back = roll_back(&self.store, ctx);
                self.notifier
                    .notify(&Notification::error(E::KIND, kind, source.to_string()));
                rolled_back.and(Err(MutationError::Remote { kind, source }))
            }
        };

        let settled = settle(self.invalidator.as_ref(), ctx);
        tracing::info!(
            "{} {} on {} settled in {:?} ({})",
            E::KIND,
            kind,
            ctx.key(),
            ctx.elapsed(),
            if result.is_ok() { "ok" } else { "failed" }
        );
        result.and_then(|value| settled.map(|()| value))
    }
}

/// Attempt awaiting its remote call
///
/// If the executor future is dropped before the outcome arrives (a caller
/// timeout, a `select!` branch, an aborted task) the guard rolls the cache
/// back, settles the key and reports the attempt as abandoned.
struct Inflight<'a, E: Entity> {
    mutations: &'a Mutations,
    ctx: MutationContext<E>,
}

impl<E: Entity> Drop for Inflight<'_, E> {
    fn drop(&mut self) {
        if !matches!(
            self.ctx.state(),
            MutationState::Applying | MutationState::AwaitingRemote
        ) {
            return;
        }
        let kind = self.ctx.kind();
        tracing::warn!(
            "{} {} on {} abandoned before the remote call resolved, rolling back",
            E::KIND,
            kind,
            self.ctx.key()
        );

        let rolled_back = roll_back(&self.mutations.store, &mut self.ctx);
        self.mutations.notifier.notify(&Notification::error(
            E::KIND,
            kind,
            "abandoned before the server answered",
        ));
        let settled = settle(self.mutations.invalidator.as_ref(), &mut self.ctx);
        if self.mutations.config.invalidate_related {
            for key in self.ctx.related_keys() {
                self.mutations.invalidator.invalidate(key);
            }
        }
        if let Err(err) = rolled_back.and(settled) {
            tracing::warn!("Abandoned {} {} did not settle cleanly: {}", E::KIND, kind, err);
        }
    }
}

impl fmt::Debug for Mutations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutations")
            .field("store", &self.store)
            .field("config", &self.config)
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Chore {
        id: EntityId,
    }

    impl Entity for Chore {
        const KIND: &'static str = "chore";

        fn id(&self) -> &EntityId {
            &self.id
        }
    }

    fn key() -> QueryKey {
        QueryKey::new("chores")
    }

    #[test]
    fn begin_snapshots_current_value() {
        let store = CacheStore::new();
        store.set::<Chore, _>(&key(), |_| {
            tally_cache::im::vector![Chore {
                id: EntityId::from("c1")
            }]
        });

        let mut ctx = MutationContext::<Chore>::new(MutationKind::Delete, key());
        begin(&store, &mut ctx).unwrap();

        assert_eq!(ctx.state(), MutationState::Applying);
        assert_eq!(ctx.snapshot().and_then(|s| s.value()).map(|c| c.len()), Some(1));
    }

    #[test]
    fn roll_back_before_remote_is_allowed() {
        let store = CacheStore::new();
        let mut ctx = MutationContext::<Chore>::new(MutationKind::Create, key());
        begin(&store, &mut ctx).unwrap();
        store.set::<Chore, _>(&key(), |_| {
            tally_cache::im::vector![Chore {
                id: EntityId::optimistic()
            }]
        });

        roll_back(&store, &mut ctx).unwrap();
        assert!(store.get::<Chore>(&key()).is_none());
    }

    #[test]
    fn settle_invalidates_even_out_of_order() {
        let store = CacheStore::new();
        store.set::<Chore, _>(&key(), |_| tally_cache::im::Vector::new());
        let mut ctx = MutationContext::<Chore>::new(MutationKind::Update, key());

        assert!(settle(&store, &mut ctx).is_err());
        assert!(store.is_stale(&key()));
    }
}
