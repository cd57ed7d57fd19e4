//! Optimistic item synthesis and variable contracts
//!
//! - [`Synthesizer`]: builds the placeholder entity shown while a create is
//!   in flight
//! - [`Draft`]: create variables that know how to build a complete entity
//!   from a table of per-field defaults
//! - [`Patch`]: update variables that merge into an existing entity
//! - [`Validate`]: preconditions checked before the cache is touched

use crate::error::ValidationError;
use std::marker::PhantomData;
use tally_cache::EntityId;

/// Preconditions on mutation variables
pub trait Validate {
    /// Check the variables; the default accepts everything
    ///
    /// # Errors
    /// The first violated precondition.
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

// Delete variables: only ids the authority has issued can be removed remotely.
impl Validate for EntityId {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.is_optimistic() {
            Err(ValidationError::Unsaved(self.clone()))
        } else {
            Ok(())
        }
    }
}

/// Builds a complete placeholder entity from create variables
///
/// Must be pure: the same variables and id always give the same entity.
pub trait Synthesizer<V, E> {
    /// Build the placeholder for `variables` with id `id`
    fn synthesize(&self, variables: &V, id: EntityId) -> E;
}

impl<V, E, F> Synthesizer<V, E> for F
where
    F: Fn(&V, EntityId) -> E,
{
    fn synthesize(&self, variables: &V, id: EntityId) -> E {
        self(variables, id)
    }
}

/// Create variables for entity kind `E`
///
/// `Defaults` enumerates every field the caller may leave out, so a
/// placeholder is always complete.
pub trait Draft<E>: Validate {
    /// Per-field defaults table
    type Defaults: Default;

    /// Build a complete entity with id `id`
    fn build(&self, id: EntityId, defaults: &Self::Defaults) -> E;
}

/// Synthesizer backed by a [`Draft`] and its defaults table
#[derive(Debug, Clone)]
pub struct DraftSynthesizer<D, E> {
    defaults: D,
    _entity: PhantomData<fn() -> E>,
}

impl<D, E> DraftSynthesizer<D, E> {
    /// Synthesizer using a custom defaults table
    #[inline]
    #[must_use]
    pub fn new(defaults: D) -> Self {
        Self {
            defaults,
            _entity: PhantomData,
        }
    }

    /// Defaults table in use
    #[inline]
    #[must_use]
    pub fn defaults(&self) -> &D {
        &self.defaults
    }
}

impl<D: Default, E> Default for DraftSynthesizer<D, E> {
    fn default() -> Self {
        Self::new(D::default())
    }
}

impl<V, E> Synthesizer<V, E> for DraftSynthesizer<V::Defaults, E>
where
    V: Draft<E>,
{
    fn synthesize(&self, variables: &V, id: EntityId) -> E {
        variables.build(id, &self.defaults)
    }
}

/// Update variables for entity kind `E`
pub trait Patch<E>: Validate {
    /// Id of the entity being updated
    fn target(&self) -> &EntityId;

    /// Shallow merge of the patch over `existing`, as a fresh value
    fn merge(&self, existing: &E) -> E;
}
