//! Query keys for every cached collection

use tally_cache::{EntityId, QueryKey};

/// All tasks
#[must_use]
pub fn tasks() -> QueryKey {
    QueryKey::new("tasks")
}

/// All rewards
#[must_use]
pub fn rewards() -> QueryKey {
    QueryKey::new("rewards")
}

/// All punishments
#[must_use]
pub fn punishments() -> QueryKey {
    QueryKey::new("punishments")
}

/// All rules
#[must_use]
pub fn rules() -> QueryKey {
    QueryKey::new("rules")
}

/// Completion history across tasks; prefix of [`task_completions_for`]
#[must_use]
pub fn task_completions() -> QueryKey {
    QueryKey::new("task-completions")
}

/// Completion history of one task
#[must_use]
pub fn task_completions_for(task_id: &EntityId) -> QueryKey {
    task_completions().child(task_id)
}

/// Reward usage history
#[must_use]
pub fn reward_usages() -> QueryKey {
    QueryKey::new("reward-usages")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_task_keys_nest_under_history() {
        let key = task_completions_for(&EntityId::server("t1"));
        assert!(key.starts_with(&task_completions()));
        assert!(!key.starts_with(&tasks()));
        assert_eq!(key.segments(), ["task-completions", "t1"]);
    }
}
