//! Rules: household rules shown by priority

use crate::checks::{self, DEFAULT_COLOR};
use crate::kinds::Priority;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_cache::{Entity, EntityId};
use tally_mutation::{Draft, Patch, Validate, ValidationError};

/// A rule as stored remotely
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Identity
    pub id: EntityId,
    /// Display title
    pub title: String,
    /// Longer description
    pub description: Option<String>,
    /// Ordering weight
    pub priority: Priority,
    /// Hex color
    pub color: String,
    /// Icon name
    pub icon: Option<String>,
    /// Assigned by the server; `None` on placeholders
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Rule {
    const KIND: &'static str = "rule";

    fn id(&self) -> &EntityId {
        &self.id
    }
}

/// Values for every rule field a draft may leave out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDefaults {
    /// Description
    pub description: Option<String>,
    /// Priority
    pub priority: Priority,
    /// Color
    pub color: String,
    /// Icon
    pub icon: Option<String>,
}

impl Default for RuleDefaults {
    fn default() -> Self {
        Self {
            description: None,
            priority: Priority::Medium,
            color: DEFAULT_COLOR.to_string(),
            icon: None,
        }
    }
}

/// Variables for creating a rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDraft {
    /// Required title
    pub title: String,
    /// Description
    pub description: Option<String>,
    /// Priority
    pub priority: Option<Priority>,
    /// Color
    pub color: Option<String>,
    /// Icon
    pub icon: Option<String>,
}

impl RuleDraft {
    /// Draft with only a title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// With priority
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }
}

impl Validate for RuleDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        checks::title(&self.title)?;
        checks::optional(self.color.as_deref(), checks::color)
    }
}

impl Draft<Rule> for RuleDraft {
    type Defaults = RuleDefaults;

    fn build(&self, id: EntityId, defaults: &RuleDefaults) -> Rule {
        Rule {
            id,
            title: self.title.clone(),
            description: self.description.clone().or_else(|| defaults.description.clone()),
            priority: self.priority.unwrap_or(defaults.priority),
            color: self.color.clone().unwrap_or_else(|| defaults.color.clone()),
            icon: self.icon.clone().or_else(|| defaults.icon.clone()),
            created_at: None,
        }
    }
}

/// Variables for updating a rule; absent fields keep their value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulePatch {
    /// Target
    pub id: EntityId,
    /// Title
    pub title: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Priority
    pub priority: Option<Priority>,
    /// Color
    pub color: Option<String>,
    /// Icon
    pub icon: Option<String>,
}

impl RulePatch {
    /// Empty patch for `id`
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            title: None,
            description: None,
            priority: None,
            color: None,
            icon: None,
        }
    }

    /// With priority
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }
}

impl Validate for RulePatch {
    fn validate(&self) -> Result<(), ValidationError> {
        checks::optional(self.title.as_deref(), checks::title)?;
        checks::optional(self.color.as_deref(), checks::color)
    }
}

impl Patch<Rule> for RulePatch {
    fn target(&self) -> &EntityId {
        &self.id
    }

    fn merge(&self, existing: &Rule) -> Rule {
        Rule {
            id: existing.id.clone(),
            title: self.title.clone().unwrap_or_else(|| existing.title.clone()),
            description: self.description.clone().or_else(|| existing.description.clone()),
            priority: self.priority.unwrap_or(existing.priority),
            color: self.color.clone().unwrap_or_else(|| existing.color.clone()),
            icon: self.icon.clone().or_else(|| existing.icon.clone()),
            created_at: existing.created_at,
        }
    }
}
