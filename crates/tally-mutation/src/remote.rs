//! Remote operation boundary
//!
//! The executors treat the network write as an opaque async function from
//! variables to an authoritative result. Failures must come back as
//! `Err(RemoteError)`, never as a silent empty value.

use crate::error::RemoteError;
use std::fmt;
use std::future::Future;

/// The remote write behind a mutation
///
/// Create and update use `RemoteOperation<V, E>` returning the stored entity;
/// delete uses `RemoteOperation<EntityId, ()>`.
#[async_trait::async_trait]
pub trait RemoteOperation<V, O>: Send + Sync
where
    V: Send + 'static,
{
    /// Perform the write
    async fn call(&self, variables: V) -> Result<O, RemoteError>;
}

/// Remote operation backed by an async function
#[derive(Clone)]
pub struct RemoteFn<F> {
    f: F,
}

impl<F> fmt::Debug for RemoteFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteFn").finish_non_exhaustive()
    }
}

/// Wrap an async function as a [`RemoteOperation`]
///
/// ```rust
/// use tally_mutation::{remote_fn, RemoteError, RemoteOperation};
///
/// # tokio_test_block(async {
/// let double = remote_fn(|n: u32| async move { Ok::<_, RemoteError>(n * 2) });
/// assert_eq!(double.call(21).await, Ok(42));
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f);
/// # }
/// ```
#[inline]
#[must_use]
pub fn remote_fn<F>(f: F) -> RemoteFn<F> {
    RemoteFn { f }
}

#[async_trait::async_trait]
impl<V, O, F, Fut> RemoteOperation<V, O> for RemoteFn<F>
where
    F: Fn(V) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O, RemoteError>> + Send,
    V: Send + 'static,
    O: Send + 'static,
{
    async fn call(&self, variables: V) -> Result<O, RemoteError> {
        (self.f)(variables).await
    }
}
