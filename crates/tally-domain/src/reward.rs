//! Rewards: bought with earned points

use crate::checks::{self, DEFAULT_COLOR};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_cache::{Entity, EntityId};
use tally_mutation::{Draft, Patch, Validate, ValidationError};

/// A reward as stored remotely
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    /// Identity
    pub id: EntityId,
    /// Display title
    pub title: String,
    /// Longer description
    pub description: Option<String>,
    /// Price in points
    pub cost: i32,
    /// Units available
    pub supply: u32,
    /// Hex color
    pub color: String,
    /// Icon name
    pub icon: Option<String>,
    /// Assigned by the server; `None` on placeholders
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Reward {
    const KIND: &'static str = "reward";

    fn id(&self) -> &EntityId {
        &self.id
    }
}

/// Values for every reward field a draft may leave out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardDefaults {
    /// Description
    pub description: Option<String>,
    /// Cost
    pub cost: i32,
    /// Supply
    pub supply: u32,
    /// Color
    pub color: String,
    /// Icon
    pub icon: Option<String>,
}

impl Default for RewardDefaults {
    fn default() -> Self {
        Self {
            description: None,
            cost: 10,
            supply: 1,
            color: DEFAULT_COLOR.to_string(),
            icon: None,
        }
    }
}

/// Variables for creating a reward
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardDraft {
    /// Required title
    pub title: String,
    /// Description
    pub description: Option<String>,
    /// Cost
    pub cost: Option<i32>,
    /// Supply
    pub supply: Option<u32>,
    /// Color
    pub color: Option<String>,
    /// Icon
    pub icon: Option<String>,
}

impl RewardDraft {
    /// Draft with only a title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// With cost
    #[must_use]
    pub fn with_cost(mut self, cost: i32) -> Self {
        self.cost = Some(cost);
        self
    }
}

impl Validate for RewardDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        checks::title(&self.title)?;
        checks::optional(self.cost.as_ref(), |c| checks::non_negative("cost", *c))?;
        checks::optional(self.color.as_deref(), checks::color)
    }
}

impl Draft<Reward> for RewardDraft {
    type Defaults = RewardDefaults;

    fn build(&self, id: EntityId, defaults: &RewardDefaults) -> Reward {
        Reward {
            id,
            title: self.title.clone(),
            description: self.description.clone().or_else(|| defaults.description.clone()),
            cost: self.cost.unwrap_or(defaults.cost),
            supply: self.supply.unwrap_or(defaults.supply),
            color: self.color.clone().unwrap_or_else(|| defaults.color.clone()),
            icon: self.icon.clone().or_else(|| defaults.icon.clone()),
            created_at: None,
        }
    }
}

/// Variables for updating a reward; absent fields keep their value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPatch {
    /// Target
    pub id: EntityId,
    /// Title
    pub title: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Cost
    pub cost: Option<i32>,
    /// Supply
    pub supply: Option<u32>,
    /// Color
    pub color: Option<String>,
    /// Icon
    pub icon: Option<String>,
}

impl RewardPatch {
    /// Empty patch for `id`
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            title: None,
            description: None,
            cost: None,
            supply: None,
            color: None,
            icon: None,
        }
    }

    /// With cost
    #[must_use]
    pub fn with_cost(mut self, cost: i32) -> Self {
        self.cost = Some(cost);
        self
    }

    /// With supply
    #[must_use]
    pub fn with_supply(mut self, supply: u32) -> Self {
        self.supply = Some(supply);
        self
    }
}

impl Validate for RewardPatch {
    fn validate(&self) -> Result<(), ValidationError> {
        checks::optional(self.title.as_deref(), checks::title)?;
        checks::optional(self.cost.as_ref(), |c| checks::non_negative("cost", *c))?;
        checks::optional(self.color.as_deref(), checks::color)
    }
}

impl Patch<Reward> for RewardPatch {
    fn target(&self) -> &EntityId {
        &self.id
    }

    fn merge(&self, existing: &Reward) -> Reward {
        Reward {
            id: existing.id.clone(),
            title: self.title.clone().unwrap_or_else(|| existing.title.clone()),
            description: self.description.clone().or_else(|| existing.description.clone()),
            cost: self.cost.unwrap_or(existing.cost),
            supply: self.supply.unwrap_or(existing.supply),
            color: self.color.clone().unwrap_or_else(|| existing.color.clone()),
            icon: self.icon.clone().or_else(|| existing.icon.clone()),
            created_at: existing.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_cost_and_supply() {
        let reward = RewardDraft::new("Movie night").build(EntityId::optimistic(), &RewardDefaults::default());
        assert_eq!(reward.cost, 10);
        assert_eq!(reward.supply, 1);
        assert!(reward.created_at.is_none());
    }

    #[test]
    fn negative_cost_rejected() {
        assert!(RewardDraft::new("Movie night").with_cost(-1).validate().is_err());
        assert!(RewardPatch::new(EntityId::server("r1")).with_cost(-1).validate().is_err());
    }

    #[test]
    fn patch_keeps_untouched_fields() {
        let existing = RewardDraft::new("Movie night").build(EntityId::server("r1"), &RewardDefaults::default());
        let merged = RewardPatch::new(EntityId::server("r1")).with_supply(4).merge(&existing);
        assert_eq!(merged.supply, 4);
        assert_eq!(merged.cost, existing.cost);
    }
}
