//! Tasks: recurring chores that earn points when completed

use crate::checks::{self, DEFAULT_COLOR};
use crate::kinds::Frequency;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_cache::{Entity, EntityId};
use tally_mutation::{Draft, Patch, Validate, ValidationError};

/// A task as stored remotely
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Identity
    pub id: EntityId,
    /// Display title
    pub title: String,
    /// Longer description
    pub description: Option<String>,
    /// Points earned per completion
    pub points: i32,
    /// Recurrence
    pub frequency: Frequency,
    /// Hex color
    pub color: String,
    /// Icon name
    pub icon: Option<String>,
    /// Completed in the current period
    pub completed: bool,
    /// Assigned by the server; `None` on placeholders
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Task {
    const KIND: &'static str = "task";

    fn id(&self) -> &EntityId {
        &self.id
    }
}

/// Values for every task field a draft may leave out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefaults {
    /// Description
    pub description: Option<String>,
    /// Points
    pub points: i32,
    /// Frequency
    pub frequency: Frequency,
    /// Color
    pub color: String,
    /// Icon
    pub icon: Option<String>,
}

impl Default for TaskDefaults {
    fn default() -> Self {
        Self {
            description: None,
            points: 0,
            frequency: Frequency::Daily,
            color: DEFAULT_COLOR.to_string(),
            icon: None,
        }
    }
}

/// Variables for creating a task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    /// Required title
    pub title: String,
    /// Description
    pub description: Option<String>,
    /// Points
    pub points: Option<i32>,
    /// Frequency
    pub frequency: Option<Frequency>,
    /// Color
    pub color: Option<String>,
    /// Icon
    pub icon: Option<String>,
}

impl TaskDraft {
    /// Draft with only a title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// With points
    #[must_use]
    pub fn with_points(mut self, points: i32) -> Self {
        self.points = Some(points);
        self
    }

    /// With frequency
    #[must_use]
    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = Some(frequency);
        self
    }

    /// With color
    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

impl Validate for TaskDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        checks::title(&self.title)?;
        checks::optional(self.points.as_ref(), |p| checks::non_negative("points", *p))?;
        checks::optional(self.color.as_deref(), checks::color)
    }
}

impl Draft<Task> for TaskDraft {
    type Defaults = TaskDefaults;

    fn build(&self, id: EntityId, defaults: &TaskDefaults) -> Task {
        Task {
            id,
            title: self.title.clone(),
            description: self.description.clone().or_else(|| defaults.description.clone()),
            points: self.points.unwrap_or(defaults.points),
            frequency: self.frequency.unwrap_or(defaults.frequency),
            color: self.color.clone().unwrap_or_else(|| defaults.color.clone()),
            icon: self.icon.clone().or_else(|| defaults.icon.clone()),
            completed: false,
            created_at: None,
        }
    }
}

/// Variables for updating a task; absent fields keep their value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    /// Target
    pub id: EntityId,
    /// Title
    pub title: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Points
    pub points: Option<i32>,
    /// Frequency
    pub frequency: Option<Frequency>,
    /// Color
    pub color: Option<String>,
    /// Icon
    pub icon: Option<String>,
    /// Completed flag
    pub completed: Option<bool>,
}

impl TaskPatch {
    /// Empty patch for `id`
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            title: None,
            description: None,
            points: None,
            frequency: None,
            color: None,
            icon: None,
            completed: None,
        }
    }

    /// With title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// With points
    #[must_use]
    pub fn with_points(mut self, points: i32) -> Self {
        self.points = Some(points);
        self
    }

    /// With completed flag
    #[must_use]
    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }
}

impl Validate for TaskPatch {
    fn validate(&self) -> Result<(), ValidationError> {
        checks::optional(self.title.as_deref(), checks::title)?;
        checks::optional(self.points.as_ref(), |p| checks::non_negative("points", *p))?;
        checks::optional(self.color.as_deref(), checks::color)
    }
}

impl Patch<Task> for TaskPatch {
    fn target(&self) -> &EntityId {
        &self.id
    }

    fn merge(&self, existing: &Task) -> Task {
        Task {
            id: existing.id.clone(),
            title: self.title.clone().unwrap_or_else(|| existing.title.clone()),
            description: self.description.clone().or_else(|| existing.description.clone()),
            points: self.points.unwrap_or(existing.points),
            frequency: self.frequency.unwrap_or(existing.frequency),
            color: self.color.clone().unwrap_or_else(|| existing.color.clone()),
            icon: self.icon.clone().or_else(|| existing.icon.clone()),
            completed: self.completed.unwrap_or(existing.completed),
            created_at: existing.created_at,
        }
    }
}
