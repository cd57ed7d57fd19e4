//! Update executor
//!
//! Replace-on-match: the matching entry is swapped for a fresh merged value,
//! then for the authoritative entity once the remote call returns. A target
//! that is no longer cached (deleted concurrently, say) makes both writes
//! no-ops; the invalidation at settlement corrects the view.

use super::{begin, Mutations};
use crate::context::MutationContext;
use crate::error::MutationError;
use crate::remote::RemoteOperation;
use crate::state::{MutationKind, MutationState};
use crate::synth::Patch;
use tally_cache::collection::{contains_id, replace_by_id, update_by_id};
use tally_cache::{CacheStore, Entity, QueryKey};

/// `Applying -> AwaitingRemote`: merge `patch` into the matching entry
///
/// Returns whether an entry matched.
///
/// # Errors
/// `IllegalTransition` unless the context is applying.
pub fn apply<E, P>(
    store: &CacheStore,
    ctx: &mut MutationContext<E>,
    patch: &P,
) -> Result<bool, MutationError>
where
    E: Entity,
    P: Patch<E> + ?Sized,
{
    ctx.advance(MutationState::AwaitingRemote)?;
    let target = patch.target().clone();

    let mut matched = false;
    store.update_existing::<E, _>(ctx.key(), |current| {
        matched = contains_id(current, &target);
        update_by_id(current, &target, |existing| patch.merge(existing))
    });

    if matched {
        tracing::debug!("Optimistic {} {} merged in {}", E::KIND, target, ctx.key());
    } else {
        tracing::debug!(
            "{} {} not cached in {}, optimistic update skipped",
            E::KIND,
            target,
            ctx.key()
        );
    }
    ctx.set_target(target);
    Ok(matched)
}

/// `AwaitingRemote -> Reconciling`: replace the target entry with `authoritative`
///
/// # Errors
/// `IllegalTransition` unless the context is awaiting the remote call.
pub fn reconcile<E: Entity>(
    store: &CacheStore,
    ctx: &mut MutationContext<E>,
    authoritative: E,
) -> Result<(), MutationError> {
    ctx.advance(MutationState::Reconciling)?;
    let target = ctx
        .target()
        .cloned()
        .unwrap_or_else(|| authoritative.id().clone());

    store.update_existing::<E, _>(ctx.key(), |current| {
        replace_by_id(current, &target, authoritative)
    });
    Ok(())
}

impl Mutations {
    /// Update an entity optimistically
    ///
    /// # Errors
    /// - `MutationError::Validation` if the patch is invalid or targets an
    ///   unsaved placeholder; the cache is untouched
    /// - `MutationError::Remote` if the remote call fails; the cache is rolled back
    pub async fn update<E, P, R>(&self, key: &QueryKey, remote: &R, patch: P) -> Result<E, MutationError>
    where
        E: Entity,
        P: Patch<E> + Send + 'static,
        R: RemoteOperation<P, E> + ?Sized,
    {
        self.check_target(MutationKind::Update, E::KIND, patch.target())?;
        self.check(MutationKind::Update, E::KIND, &patch)?;
        let _turn = self.turn(key).await;

        let mut ctx = MutationContext::<E>::new(MutationKind::Update, key.clone());
        begin(&self.store, &mut ctx)?;
        apply(&self.store, &mut ctx, &patch)?;

        let attempt = self.inflight(ctx);
        let outcome = self.call_remote(remote, patch).await;
        self.finish(attempt, outcome, |store, ctx, entity: &E| {
            reconcile(store, ctx, entity.clone())
        })
    }
}
