//! Notification sink boundary
//!
//! Executors report every settled mutation (and every rejected one) to a
//! [`Notifier`]. Delivery is fire-and-forget; how the message reaches the
//! user (toast, status line, log) belongs to the sink.

use crate::state::MutationKind;
use serde::Serialize;

/// Outcome class of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// The mutation was confirmed by the remote authority
    Success,
    /// The mutation was rejected or failed
    Error,
}

/// One user-facing mutation outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Success or error
    pub kind: NotificationKind,
    /// Entity name, e.g. `"task"`
    pub entity: &'static str,
    /// Executor that produced the outcome
    pub action: MutationKind,
    /// Human-readable detail (entity id on success, error text on failure)
    pub detail: String,
}

impl Notification {
    /// Success notification
    pub fn success(entity: &'static str, action: MutationKind, detail: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            entity,
            action,
            detail: detail.into(),
        }
    }

    /// Error notification
    pub fn error(entity: &'static str, action: MutationKind, detail: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            entity,
            action,
            detail: detail.into(),
        }
    }

    /// Short headline, e.g. "Task created" or "Failed to delete reward"
    #[must_use]
    pub fn title(&self) -> String {
        match self.kind {
            NotificationKind::Success => {
                format!("{} {}", capitalize(self.entity), self.action.past_tense())
            }
            NotificationKind::Error => format!("Failed to {} {}", self.action, self.entity),
        }
    }

    /// Check if this reports a failure
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == NotificationKind::Error
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Sink for mutation outcomes
pub trait Notifier: Send + Sync {
    /// Deliver one notification
    fn notify(&self, notification: &Notification);
}

/// Notifier that writes outcomes to the tracing log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: &Notification) {
        match notification.kind {
            NotificationKind::Success => {
                tracing::info!("{}: {}", notification.title(), notification.detail);
            }
            NotificationKind::Error => {
                tracing::error!("{}: {}", notification.title(), notification.detail);
            }
        }
    }
}

/// Notifier that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notification: &Notification) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_title() {
        let n = Notification::success("task", MutationKind::Create, "srv-1");
        assert_eq!(n.title(), "Task created");
        assert!(!n.is_error());
    }

    #[test]
    fn error_title() {
        let n = Notification::error("reward", MutationKind::Delete, "offline");
        assert_eq!(n.title(), "Failed to delete reward");
        assert!(n.is_error());
    }

    #[test]
    fn serializes_for_ui_bridges() {
        let n = Notification::error("rule", MutationKind::Update, "conflict");
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["kind"], "error");
        assert_eq!(json["action"], "update");
        assert_eq!(json["entity"], "rule");
    }
}
