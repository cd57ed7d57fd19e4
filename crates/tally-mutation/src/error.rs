//! Error types for the mutation layer
//!
//! Three sources of failure:
//! - Validation: the caller's variables fail a precondition; rejected
//!   before the cache is touched
//! - Remote: the remote operation rejects; triggers rollback
//! - Illegal transition: the executor state machine was driven out of order
//!
//! Cache-invariant violations (an update or delete whose target is no longer
//! cached) are not errors; they are absorbed and corrected by invalidation.

use crate::state::{MutationKind, MutationState};
use tally_cache::EntityId;

/// Precondition failure on mutation variables
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Required field absent or blank
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Field present but out of range or malformed
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// Target is a placeholder that the remote authority has never seen
    #[error("entity {0} has not been saved yet")]
    Unsaved(EntityId),
}

impl ValidationError {
    /// Create invalid field error
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Failure reported by the remote operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// Transport-level failure
    #[error("network error: {0}")]
    Network(String),

    /// No response within the configured limit
    #[error("remote call timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// Server refused the write (rule violation, bad request)
    #[error("rejected by server ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Concurrent modification on the server
    #[error("conflict: {0}")]
    Conflict(String),

    /// Target does not exist on the server
    #[error("not found: {0}")]
    NotFound(EntityId),
}

impl RemoteError {
    /// Create rejection error
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Check if a caller could reasonably retry
    ///
    /// Executors never retry on their own.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout { .. })
    }
}

/// Main mutation error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    /// Variables rejected before any cache write
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Remote operation failed; the cache was rolled back
    #[error("{kind} failed: {source}")]
    Remote {
        kind: MutationKind,
        #[source]
        source: RemoteError,
    },

    /// State machine driven out of order
    #[error("illegal mutation transition: {from:?} -> {to:?}")]
    IllegalTransition {
        from: MutationState,
        to: MutationState,
    },
}

impl MutationError {
    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Remote { source, .. } => source.is_retryable(),
            Self::Validation(_) | Self::IllegalTransition { .. } => false,
        }
    }

    /// Underlying remote error, if the remote call failed
    #[inline]
    #[must_use]
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            Self::Remote { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type alias for mutation operations
pub type MutationResult<T> = Result<T, MutationError>;
