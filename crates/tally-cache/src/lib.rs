//! Tally Cache
//!
//! In-memory collection cache that the optimistic mutation layer writes
//! through and that the rendering layer reads from.
//!
//! # Core Pieces
//!
//! - **Query keys**: ordered segment lists naming one collection each
//! - **Cache store**: keyed collections with functional `set`, read
//!   cancellation, invalidation and change events
//! - **Snapshots**: capture a collection before a speculative change and
//!   restore it verbatim
//!
//! # Example
//!
//! ```rust
//! use tally_cache::{CacheStore, QueryKey, Snapshot};
//!
//! let store = CacheStore::new();
//! let key = QueryKey::new("scores");
//! store.set::<u32, _>(&key, |_| tally_cache::im::vector![1, 2, 3]);
//!
//! let before = Snapshot::<u32>::capture(&store, &key);
//! store.set::<u32, _>(&key, |_| tally_cache::im::Vector::new());
//! before.restore(&store);
//!
//! assert_eq!(store.get::<u32>(&key).map(|c| c.len()), Some(3));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod collection;
pub mod entity;
pub mod event;
pub mod key;
pub mod snapshot;
pub mod store;

pub use collection::Collection;
pub use entity::{Entity, EntityId};
pub use event::CacheEvent;
pub use key::QueryKey;
pub use snapshot::{restore, snapshot, Snapshot};
pub use store::{CacheStats, CacheStore, FetchTicket, Invalidator};

/// Persistent collection crate, re-exported so callers build values with the same version
pub use im;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
