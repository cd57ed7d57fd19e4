//! Mutation executor configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Executor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    /// Run mutations against the same query key one at a time, in arrival order
    pub serialize_per_key: bool,
    /// Fail the remote call with a timeout after this many milliseconds
    pub remote_timeout_ms: Option<u64>,
    /// Report successful mutations to the notifier (failures are always reported)
    pub notify_success: bool,
    /// Invalidate a delete's related collection after it was pruned
    pub invalidate_related: bool,
}

impl MutationConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With per-key serialization
    #[inline]
    #[must_use]
    pub fn with_serialize_per_key(mut self, enabled: bool) -> Self {
        self.serialize_per_key = enabled;
        self
    }

    /// With remote timeout
    #[inline]
    #[must_use]
    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// With success notifications on or off
    #[inline]
    #[must_use]
    pub fn with_notify_success(mut self, enabled: bool) -> Self {
        self.notify_success = enabled;
        self
    }

    /// With related-key invalidation on or off
    #[inline]
    #[must_use]
    pub fn with_invalidate_related(mut self, enabled: bool) -> Self {
        self.invalidate_related = enabled;
        self
    }

    /// Remote timeout as a duration
    #[inline]
    #[must_use]
    pub fn remote_timeout(&self) -> Option<Duration> {
        self.remote_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            serialize_per_key: false,
            remote_timeout_ms: None,
            notify_success: true,
            invalidate_related: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = MutationConfig::new();
        assert!(!config.serialize_per_key);
        assert!(config.notify_success);
        assert!(config.invalidate_related);
        assert_eq!(config.remote_timeout(), None);
    }

    #[test]
    fn builder_methods() {
        let config = MutationConfig::new()
            .with_serialize_per_key(true)
            .with_remote_timeout(Duration::from_millis(750))
            .with_notify_success(false);

        assert!(config.serialize_per_key);
        assert_eq!(config.remote_timeout_ms, Some(750));
        assert!(!config.notify_success);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: MutationConfig = toml::from_str("serialize_per_key = true").unwrap();
        assert!(config.serialize_per_key);
        assert!(config.notify_success);
        assert_eq!(config.remote_timeout_ms, None);
    }
}
