//! Collection values and pure id-based edits
//!
//! Collections are persistent vectors: every edit returns a new value and
//! leaves the input untouched, so a clone taken before an edit is a valid
//! snapshot for as long as anyone holds it.

use crate::entity::{Entity, EntityId};

/// Ordered sequence of entities of a single kind
pub type Collection<E> = im::Vector<E>;

/// Index of the first entity with `id`
#[must_use]
pub fn position_of<E: Entity>(collection: &Collection<E>, id: &EntityId) -> Option<usize> {
    collection.iter().position(|item| item.id() == id)
}

/// Check whether an entity with `id` is present
#[inline]
#[must_use]
pub fn contains_id<E: Entity>(collection: &Collection<E>, id: &EntityId) -> bool {
    position_of(collection, id).is_some()
}

/// New collection with `item` at the front
#[must_use]
pub fn prepend<E: Clone>(collection: &Collection<E>, item: E) -> Collection<E> {
    let mut next = collection.clone();
    next.push_front(item);
    next
}

/// New collection where the entry matching `id` is replaced by `f(entry)`
///
/// No entry matching means no change.
#[must_use]
pub fn update_by_id<E, F>(collection: &Collection<E>, id: &EntityId, f: F) -> Collection<E>
where
    E: Entity,
    F: FnOnce(&E) -> E,
{
    let mut next = collection.clone();
    if let Some(index) = position_of(collection, id) {
        next.set(index, f(&collection[index]));
    }
    next
}

/// New collection where the entry matching `id` is replaced by `item`
#[inline]
#[must_use]
pub fn replace_by_id<E: Entity>(collection: &Collection<E>, id: &EntityId, item: E) -> Collection<E> {
    update_by_id(collection, id, move |_| item)
}

/// New collection without entries whose id equals `id`
#[must_use]
pub fn remove_by_id<E: Entity>(collection: &Collection<E>, id: &EntityId) -> Collection<E> {
    remove_where(collection, |item| item.id() == id)
}

/// New collection without entries matching `predicate`
#[must_use]
pub fn remove_where<E, P>(collection: &Collection<E>, mut predicate: P) -> Collection<E>
where
    E: Clone,
    P: FnMut(&E) -> bool,
{
    let mut next = collection.clone();
    next.retain(|item| !predicate(item));
    next
}

/// Swap a create placeholder for the authoritative entity
///
/// The authoritative entity takes the placeholder's position. When the
/// placeholder is already gone it takes the position of an existing entry
/// with the authoritative id, or goes to the front. Afterwards the result
/// holds exactly one entry with the authoritative id and none with the
/// placeholder id.
#[must_use]
pub fn reconcile_created<E: Entity>(
    collection: &Collection<E>,
    placeholder: &EntityId,
    authoritative: E,
) -> Collection<E> {
    let authoritative_id = authoritative.id().clone();
    let slot = position_of(collection, placeholder)
        .or_else(|| position_of(collection, &authoritative_id));

    let Some(slot) = slot else {
        return prepend(collection, authoritative);
    };

    let mut authoritative = Some(authoritative);
    collection
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            if index == slot {
                authoritative.take()
            } else if item.id() == placeholder || item.id() == &authoritative_id {
                None
            } else {
                Some(item.clone())
            }
        })
        .collect()
}
