//! History records that hang off tasks and rewards
//!
//! Deleting a task or reward prunes its history from the cache through
//! [`Related`]; the remote store cascades on its own.

use crate::keys;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_cache::{Entity, EntityId};
use tally_mutation::Related;

/// One completion of a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCompletion {
    /// Identity
    pub id: EntityId,
    /// Completed task
    pub task_id: EntityId,
    /// Points awarded
    pub points: i32,
    /// When
    pub completed_at: DateTime<Utc>,
}

impl Entity for TaskCompletion {
    const KIND: &'static str = "task completion";

    fn id(&self) -> &EntityId {
        &self.id
    }
}

/// One use of a reward
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardUsage {
    /// Identity
    pub id: EntityId,
    /// Reward spent
    pub reward_id: EntityId,
    /// When
    pub used_at: DateTime<Utc>,
}

impl Entity for RewardUsage {
    const KIND: &'static str = "reward usage";

    fn id(&self) -> &EntityId {
        &self.id
    }
}

/// Task a completion belongs to
#[must_use]
pub fn completion_parent(completion: &TaskCompletion) -> Option<&EntityId> {
    Some(&completion.task_id)
}

/// Reward a usage belongs to
#[must_use]
pub fn usage_parent(usage: &RewardUsage) -> Option<&EntityId> {
    Some(&usage.reward_id)
}

/// Completion history pruned when a task is deleted
#[must_use]
pub fn task_completions() -> Related<TaskCompletion> {
    Related::new(keys::task_completions(), completion_parent)
}

/// Usage history pruned when a reward is deleted
#[must_use]
pub fn reward_usages() -> Related<RewardUsage> {
    Related::new(keys::reward_usages(), usage_parent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn related_matches_by_parent() {
        let completion = TaskCompletion {
            id: EntityId::server("h1"),
            task_id: EntityId::server("t1"),
            points: 3,
            completed_at: Utc::now(),
        };
        let related = task_completions();
        assert!(related.belongs_to(&completion, &EntityId::server("t1")));
        assert!(!related.belongs_to(&completion, &EntityId::server("t2")));
        assert_eq!(related.key(), &keys::task_completions());
    }
}
