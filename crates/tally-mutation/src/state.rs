//! Mutation state machine
//!
//! ```text
//! Idle -> Applying -> AwaitingRemote -> Reconciling -> Settled
//!            |              |
//!            +------> RollingBack --------------------> Settled
//! ```

use crate::error::MutationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of one mutation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationState {
    /// Constructed, nothing touched yet
    Idle,
    /// In-flight reads cancelled, snapshot taken
    Applying,
    /// Optimistic change visible, remote call running
    AwaitingRemote,
    /// Writing the authoritative result into the cache
    Reconciling,
    /// Restoring the snapshot after a failure
    RollingBack,
    /// Invalidation issued; the attempt is over
    Settled,
}

impl MutationState {
    /// Check if no further transition is possible
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Settled)
    }
}

/// Which executor is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    /// Insert a new entity
    Create,
    /// Replace an existing entity
    Update,
    /// Remove an entity
    Delete,
}

impl MutationKind {
    /// Past-tense verb for notifications
    #[must_use]
    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Update => "updated",
            Self::Delete => "deleted",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// Validates a state transition
///
/// # Errors
/// `MutationError::IllegalTransition` if `to` is not reachable from `from`.
pub fn validate_transition(from: MutationState, to: MutationState) -> Result<(), MutationError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(MutationError::IllegalTransition { from, to })
    }
}

/// States reachable in one step from `from`
#[must_use]
pub fn allowed_transitions(from: MutationState) -> &'static [MutationState] {
    use MutationState::{Applying, AwaitingRemote, Idle, Reconciling, RollingBack, Settled};
    match from {
        Idle => &[Applying],
        Applying => &[AwaitingRemote, RollingBack],
        AwaitingRemote => &[Reconciling, RollingBack],
        Reconciling | RollingBack => &[Settled],
        Settled => &[],
    }
}
