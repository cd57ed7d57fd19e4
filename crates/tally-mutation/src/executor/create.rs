//! Create executor
//!
//! The placeholder goes to the front of the collection. On success the
//! authoritative entity takes the placeholder's position; on failure the
//! snapshot is restored and the placeholder disappears with it.

use super::{begin, Mutations};
use crate::context::MutationContext;
use crate::error::MutationError;
use crate::remote::RemoteOperation;
use crate::state::{MutationKind, MutationState};
use crate::synth::{Draft, DraftSynthesizer, Synthesizer, Validate};
use tally_cache::collection::{prepend, reconcile_created};
use tally_cache::{CacheStore, Entity, QueryKey};

/// `Applying -> AwaitingRemote`: prepend the placeholder
///
/// # Errors
/// `IllegalTransition` unless the context is applying.
pub fn apply<E: Entity>(
    store: &CacheStore,
    ctx: &mut MutationContext<E>,
    placeholder: E,
) -> Result<(), MutationError> {
    ctx.advance(MutationState::AwaitingRemote)?;
    ctx.set_target(placeholder.id().clone());
    tracing::debug!("Optimistic {} {} added to {}", E::KIND, placeholder.id(), ctx.key());
    store.set::<E, _>(ctx.key(), |current| prepend(current, placeholder));
    Ok(())
}

/// `AwaitingRemote -> Reconciling`: swap the placeholder for `authoritative`
///
/// # Errors
/// `IllegalTransition` unless the context is awaiting the remote call.
pub fn reconcile<E: Entity>(
    store: &CacheStore,
    ctx: &mut MutationContext<E>,
    authoritative: E,
) -> Result<(), MutationError> {
    ctx.advance(MutationState::Reconciling)?;
    let placeholder = ctx.target().cloned();
    let authoritative_id = authoritative.id().clone();

    store.set::<E, _>(ctx.key(), |current| match &placeholder {
        Some(placeholder) => reconcile_created(current, placeholder, authoritative),
        None => prepend(current, authoritative),
    });
    ctx.set_target(authoritative_id);
    Ok(())
}

impl Mutations {
    /// Create an entity optimistically
    ///
    /// The placeholder built by `synthesizer` is visible from the moment the
    /// remote call starts until it resolves.
    ///
    /// # Errors
    /// - `MutationError::Validation` if `variables` are invalid; the cache is untouched
    /// - `MutationError::Remote` if the remote call fails; the cache is rolled back
    pub async fn create<E, V, R, S>(
        &self,
        key: &QueryKey,
        remote: &R,
        variables: V,
        synthesizer: &S,
    ) -> Result<E, MutationError>
    where
        E: Entity,
        V: Validate + Send + 'static,
        R: RemoteOperation<V, E> + ?Sized,
        S: Synthesizer<V, E> + ?Sized,
    {
        self.check(MutationKind::Create, E::KIND, &variables)?;
        let _turn = self.turn(key).await;

        let mut ctx = MutationContext::<E>::new(MutationKind::Create, key.clone());
        begin(&self.store, &mut ctx)?;
        let placeholder = synthesizer.synthesize(&variables, tally_cache::EntityId::optimistic());
        apply(&self.store, &mut ctx, placeholder)?;

        let attempt = self.inflight(ctx);
        let outcome = self.call_remote(remote, variables).await;
        self.finish(attempt, outcome, |store, ctx, entity: &E| {
            reconcile(store, ctx, entity.clone())
        })
    }

    /// Create an entity from a draft, filling omitted fields from the draft's defaults table
    ///
    /// # Errors
    /// Same as [`create`](Self::create).
    pub async fn create_draft<E, V, R>(
        &self,
        key: &QueryKey,
        remote: &R,
        draft: V,
    ) -> Result<E, MutationError>
    where
        E: Entity,
        V: Draft<E> + Send + 'static,
        R: RemoteOperation<V, E> + ?Sized,
    {
        let synthesizer = DraftSynthesizer::<V::Defaults, E>::default();
        self.create(key, remote, draft, &synthesizer).await
    }
}
