//! Entity identity
//!
//! Every cached record carries an [`EntityId`]. Ids issued by the remote
//! authority and ids synthesized on the client live in disjoint variants, so
//! a placeholder can never be mistaken for a server record.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// Prefix used when an optimistic id is rendered as text
const OPTIMISTIC_PREFIX: &str = "optimistic-";

/// Unique identifier of an entity within a collection
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityId {
    /// Id issued by the remote authority
    Server(String),
    /// Client-generated placeholder id (UUID v4), valid until reconciliation
    Optimistic(Uuid),
}

impl EntityId {
    /// Wrap an authority-issued id
    #[inline]
    #[must_use]
    pub fn server(id: impl Into<String>) -> Self {
        Self::Server(id.into())
    }

    /// Generate a fresh optimistic id
    #[inline]
    #[must_use]
    pub fn optimistic() -> Self {
        Self::Optimistic(Uuid::new_v4())
    }

    /// Check if this is a client-side placeholder
    #[inline]
    #[must_use]
    pub fn is_optimistic(&self) -> bool {
        matches!(self, Self::Optimistic(_))
    }

    /// Authority-issued id, if any
    #[inline]
    #[must_use]
    pub fn as_server(&self) -> Option<&str> {
        match self {
            Self::Server(id) => Some(id),
            Self::Optimistic(_) => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server(id) => f.write_str(id),
            Self::Optimistic(uuid) => write!(f, "{OPTIMISTIC_PREFIX}{uuid}"),
        }
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::server(id)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self::Server(id)
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// Placeholders never travel to the authority, so anything read back is a server id.
impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::Server)
    }
}

/// A record that can live in a cached collection
pub trait Entity: Clone + Send + Sync + 'static {
    /// Human-readable entity name, used in notifications and logs
    const KIND: &'static str;

    /// Identifier, unique within one collection
    fn id(&self) -> &EntityId;
}
