//! Per-attempt mutation context
//!
//! Carries what one attempt needs from start to settlement: the current
//! state, the snapshots to roll back to, and the id the attempt targets
//! (the placeholder id for a create). Created at start, dropped at the end,
//! never persisted.

use crate::error::MutationError;
use crate::state::{validate_transition, MutationKind, MutationState};
use std::fmt;
use std::time::{Duration, Instant};
use tally_cache::{CacheStore, Entity, EntityId, QueryKey, Snapshot};
use uuid::Uuid;

/// A captured collection that can be written back
pub trait Restorable: Send + Sync {
    /// Key the capture belongs to
    fn key(&self) -> &QueryKey;

    /// Write the captured value back into `store`
    fn restore(&self, store: &CacheStore);
}

impl<E> Restorable for Snapshot<E>
where
    E: Clone + Send + Sync + 'static,
{
    fn key(&self) -> &QueryKey {
        Snapshot::key(self)
    }

    fn restore(&self, store: &CacheStore) {
        Snapshot::restore(self, store);
    }
}

/// State carried through one mutation attempt
pub struct MutationContext<E: Entity> {
    attempt: Uuid,
    kind: MutationKind,
    key: QueryKey,
    state: MutationState,
    snapshot: Option<Snapshot<E>>,
    related: Vec<Box<dyn Restorable>>,
    target: Option<EntityId>,
    started: Instant,
}

impl<E: Entity> MutationContext<E> {
    /// Create a context in the `Idle` state
    #[must_use]
    pub fn new(kind: MutationKind, key: QueryKey) -> Self {
        Self {
            attempt: Uuid::new_v4(),
            kind,
            key,
            state: MutationState::Idle,
            snapshot: None,
            related: Vec::new(),
            target: None,
            started: Instant::now(),
        }
    }

    /// Move to `to`, rejecting transitions the state machine does not allow
    ///
    /// # Errors
    /// `MutationError::IllegalTransition` on an out-of-order step.
    pub fn advance(&mut self, to: MutationState) -> Result<(), MutationError> {
        validate_transition(self.state, to)?;
        tracing::trace!(
            "{} {} {}: {:?} -> {:?}",
            E::KIND,
            self.kind,
            self.attempt,
            self.state,
            to
        );
        self.state = to;
        Ok(())
    }

    /// Attempt identifier, for correlating log lines
    #[inline]
    #[must_use]
    pub fn attempt(&self) -> Uuid {
        self.attempt
    }

    /// Executor kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    /// Primary query key
    #[inline]
    #[must_use]
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> MutationState {
        self.state
    }

    /// Snapshot of the primary collection, once taken
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> Option<&Snapshot<E>> {
        self.snapshot.as_ref()
    }

    /// Entity id the attempt targets (placeholder id for a create)
    #[inline]
    #[must_use]
    pub fn target(&self) -> Option<&EntityId> {
        self.target.as_ref()
    }

    /// Time since the context was created
    #[inline]
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub(crate) fn set_snapshot(&mut self, snapshot: Snapshot<E>) {
        self.snapshot = Some(snapshot);
    }

    pub(crate) fn set_target(&mut self, id: EntityId) {
        self.target = Some(id);
    }

    pub(crate) fn push_related(&mut self, snapshot: Box<dyn Restorable>) {
        self.related.push(snapshot);
    }

    /// Keys of the related snapshots
    pub(crate) fn related_keys(&self) -> impl Iterator<Item = &QueryKey> {
        self.related.iter().map(|related| related.key())
    }

    /// Restore the primary snapshot, then every related snapshot
    pub(crate) fn restore_all(&self, store: &CacheStore) {
        if let Some(snapshot) = &self.snapshot {
            snapshot.restore(store);
        }
        for related in &self.related {
            related.restore(store);
        }
    }
}

impl<E: Entity> fmt::Debug for MutationContext<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationContext")
            .field("attempt", &self.attempt)
            .field("entity", &E::KIND)
            .field("kind", &self.kind)
            .field("key", &self.key)
            .field("state", &self.state)
            .field("target", &self.target)
            .field(
                "related",
                &self.related.iter().map(|r| r.key()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: EntityId,
    }

    impl Entity for Note {
        const KIND: &'static str = "note";

        fn id(&self) -> &EntityId {
            &self.id
        }
    }

    #[test]
    fn new_context_is_idle() {
        let ctx = MutationContext::<Note>::new(MutationKind::Create, QueryKey::new("notes"));
        assert_eq!(ctx.state(), MutationState::Idle);
        assert!(ctx.snapshot().is_none());
        assert!(ctx.target().is_none());
    }

    #[test]
    fn advance_follows_state_machine() {
        let mut ctx = MutationContext::<Note>::new(MutationKind::Update, QueryKey::new("notes"));
        ctx.advance(MutationState::Applying).unwrap();
        ctx.advance(MutationState::AwaitingRemote).unwrap();

        let err = ctx.advance(MutationState::Idle).unwrap_err();
        assert!(matches!(err, MutationError::IllegalTransition { .. }));
        assert_eq!(ctx.state(), MutationState::AwaitingRemote);
    }

    #[test]
    fn restore_all_covers_related_snapshots() {
        let store = CacheStore::new();
        let primary = QueryKey::new("notes");
        let related = QueryKey::new("note-links");
        store.set::<Note, _>(&primary, |_| {
            tally_cache::im::vector![Note {
                id: EntityId::from("n1")
            }]
        });
        store.set::<u32, _>(&related, |_| tally_cache::im::vector![1, 2]);

        let mut ctx = MutationContext::<Note>::new(MutationKind::Delete, primary.clone());
        ctx.set_snapshot(Snapshot::capture(&store, &primary));
        ctx.push_related(Box::new(Snapshot::<u32>::capture(&store, &related)));

        store.replace::<Note>(&primary, None);
        store.set::<u32, _>(&related, |_| tally_cache::im::Vector::new());
        ctx.restore_all(&store);

        assert_eq!(store.get::<Note>(&primary).map(|c| c.len()), Some(1));
        assert_eq!(store.get::<u32>(&related), Some(tally_cache::im::vector![1, 2]));
    }
}
