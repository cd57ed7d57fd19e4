//! Delete executor
//!
//! The entity is filtered out optimistically. A delete may declare a
//! [`Related`] collection (usage or completion history cached under its own
//! key) whose records pointing at the deleted entity are pruned alongside
//! it. Both collections are snapshotted up front, both are restored on
//! failure, and both keys are invalidated once the attempt settles.

use super::{begin, Mutations};
use crate::context::MutationContext;
use crate::error::MutationError;
use crate::remote::RemoteOperation;
use crate::state::{MutationKind, MutationState};
use std::fmt;
use tally_cache::collection::{contains_id, remove_by_id, remove_where};
use tally_cache::{CacheStore, Entity, EntityId, QueryKey, Snapshot};

/// Dependent collection cleaned up alongside a delete
pub struct Related<H> {
    key: QueryKey,
    parent_of: fn(&H) -> Option<&EntityId>,
}

impl<H> Related<H> {
    /// Records in `key` whose `parent_of` equals the deleted id get pruned
    #[inline]
    #[must_use]
    pub fn new(key: QueryKey, parent_of: fn(&H) -> Option<&EntityId>) -> Self {
        Self { key, parent_of }
    }

    /// Related collection key
    #[inline]
    #[must_use]
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Check whether `record` belongs to `parent`
    #[inline]
    #[must_use]
    pub fn belongs_to(&self, record: &H, parent: &EntityId) -> bool {
        (self.parent_of)(record) == Some(parent)
    }
}

impl<H> Clone for Related<H> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            parent_of: self.parent_of,
        }
    }
}

impl<H> fmt::Debug for Related<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Related").field("key", &self.key).finish_non_exhaustive()
    }
}

/// `Applying -> AwaitingRemote`: filter out `id`
///
/// Returns whether the entity was cached.
///
/// # Errors
/// `IllegalTransition` unless the context is applying.
pub fn apply<E: Entity>(
    store: &CacheStore,
    ctx: &mut MutationContext<E>,
    id: &EntityId,
) -> Result<bool, MutationError> {
    ctx.advance(MutationState::AwaitingRemote)?;

    let mut matched = false;
    store.update_existing::<E, _>(ctx.key(), |current| {
        matched = contains_id(current, id);
        remove_by_id(current, id)
    });

    if !matched {
        tracing::debug!("{} {} already absent from {}", E::KIND, id, ctx.key());
    }
    ctx.set_target(id.clone());
    Ok(matched)
}

/// `AwaitingRemote -> Reconciling`: nothing to write, the entity is already gone
///
/// # Errors
/// `IllegalTransition` unless the context is awaiting the remote call.
pub fn reconcile<E: Entity>(ctx: &mut MutationContext<E>) -> Result<(), MutationError> {
    ctx.advance(MutationState::Reconciling)
}

/// Remove every record of `related` that belongs to `parent`
///
/// Returns the number of records removed, or `None` if the related key holds
/// something other than `H`. Never fails the delete.
pub fn prune_related<H>(store: &CacheStore, related: &Related<H>, parent: &EntityId) -> Option<usize>
where
    H: Clone + Send + Sync + 'static,
{
    let mut removed = 0;
    let applied = store.update_existing::<H, _>(related.key(), |current| {
        let next = remove_where(current, |record| related.belongs_to(record, parent));
        removed = current.len() - next.len();
        next
    });

    if applied {
        tracing::debug!("Pruned {} related records of {} from {}", removed, parent, related.key());
        Some(removed)
    } else if store.contains(related.key()) {
        tracing::warn!(
            "Related collection {} has an unexpected type, skipping cleanup of {}",
            related.key(),
            parent
        );
        None
    } else {
        Some(0)
    }
}

impl Mutations {
    /// Delete an entity optimistically
    ///
    /// Deleting an id that is not cached is not an error.
    ///
    /// # Errors
    /// - `MutationError::Validation` if `id` is an unsaved placeholder
    /// - `MutationError::Remote` if the remote call fails; the cache is rolled back
    pub async fn delete<E, R>(&self, key: &QueryKey, remote: &R, id: EntityId) -> Result<(), MutationError>
    where
        E: Entity,
        R: RemoteOperation<EntityId, ()> + ?Sized,
    {
        self.run_delete::<E, E, R>(key, remote, id, None).await
    }

    /// Delete an entity and prune its records from a related collection
    ///
    /// # Errors
    /// Same as [`delete`](Self::delete); a problem with the related
    /// collection is logged and never fails the delete.
    pub async fn delete_with_related<E, H, R>(
        &self,
        key: &QueryKey,
        remote: &R,
        id: EntityId,
        related: &Related<H>,
    ) -> Result<(), MutationError>
    where
        E: Entity,
        H: Clone + Send + Sync + 'static,
        R: RemoteOperation<EntityId, ()> + ?Sized,
    {
        self.run_delete::<E, H, R>(key, remote, id, Some(related)).await
    }

    async fn run_delete<E, H, R>(
        &self,
        key: &QueryKey,
        remote: &R,
        id: EntityId,
        related: Option<&Related<H>>,
    ) -> Result<(), MutationError>
    where
        E: Entity,
        H: Clone + Send + Sync + 'static,
        R: RemoteOperation<EntityId, ()> + ?Sized,
    {
        self.check(MutationKind::Delete, E::KIND, &id)?;
        let _turn = self.turn(key).await;

        let mut ctx = MutationContext::<E>::new(MutationKind::Delete, key.clone());
        begin(&self.store, &mut ctx)?;
        if let Some(related) = related {
            self.store.cancel_in_flight(related.key());
            ctx.push_related(Box::new(Snapshot::<H>::capture(&self.store, related.key())));
        }
        apply(&self.store, &mut ctx, &id)?;
        if let Some(related) = related {
            prune_related(&self.store, related, &id);
        }

        let attempt = self.inflight(ctx);
        let outcome = self.call_remote(remote, id).await;
        let result = self.finish(attempt, outcome, |_, ctx, _: &()| reconcile(ctx));

        if let Some(related) = related {
            if self.config.invalidate_related {
                self.invalidator.invalidate(related.key());
            }
        }
        result
    }
}
