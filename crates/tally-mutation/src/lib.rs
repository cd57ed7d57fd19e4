//! Tally Mutation - optimistic writes over the collection cache
//!
//! Every create, update and delete:
//! - Validates its variables before the cache is touched
//! - Cancels in-flight reads for the target key and snapshots it
//! - Applies the speculative change so it is visible immediately
//! - Reconciles with the authoritative result, or restores the snapshot
//! - Notifies the user and invalidates the key, whatever the outcome
//!
//! # Example
//!
//! ```rust
//! use tally_cache::{CacheStore, Entity, EntityId, QueryKey};
//! use tally_mutation::{remote_fn, Mutations, NoopNotifier, RemoteError, Validate};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone)]
//! struct Note {
//!     id: EntityId,
//!     text: String,
//! }
//!
//! impl Entity for Note {
//!     const KIND: &'static str = "note";
//!     fn id(&self) -> &EntityId {
//!         &self.id
//!     }
//! }
//!
//! struct NewNote(String);
//! impl Validate for NewNote {}
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let store = CacheStore::new();
//! let mutations = Mutations::new(store.clone()).with_notifier(Arc::new(NoopNotifier));
//! let key = QueryKey::new("notes");
//!
//! let remote = remote_fn(|vars: NewNote| async move {
//!     Ok::<_, RemoteError>(Note { id: EntityId::server("n-1"), text: vars.0 })
//! });
//! let synthesize = |vars: &NewNote, id: EntityId| Note { id, text: vars.0.clone() };
//!
//! let created = mutations
//!     .create(&key, &remote, NewNote("hello".into()), &synthesize)
//!     .await
//!     .unwrap();
//!
//! assert_eq!(created.id, EntityId::server("n-1"));
//! assert_eq!(store.get::<Note>(&key).map(|c| c.len()), Some(1));
//! assert!(store.is_stale(&key));
//! # });
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod notify;
pub mod queue;
pub mod remote;
pub mod state;
pub mod synth;

pub use config::MutationConfig;
pub use context::{MutationContext, Restorable};
pub use error::{MutationError, MutationResult, RemoteError, ValidationError};
pub use executor::{Mutations, Related};
pub use notify::{NoopNotifier, Notification, NotificationKind, Notifier, TracingNotifier};
pub use queue::{KeyedQueue, QueueTurn};
pub use remote::{remote_fn, RemoteFn, RemoteOperation};
pub use state::{allowed_transitions, validate_transition, MutationKind, MutationState};
pub use synth::{Draft, DraftSynthesizer, Patch, Synthesizer, Validate};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for writing mutations
    pub use crate::{
        remote_fn, Draft, MutationConfig, MutationError, MutationKind, Mutations, Notifier, Patch,
        Related, RemoteError, RemoteOperation, Synthesizer, Validate,
    };
    pub use tally_cache::{CacheStore, Entity, EntityId, QueryKey};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
