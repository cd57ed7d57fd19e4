//! Punishments: deduct points

use crate::checks;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_cache::{Entity, EntityId};
use tally_mutation::{Draft, Patch, Validate, ValidationError};

/// A punishment as stored remotely
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Punishment {
    /// Identity
    pub id: EntityId,
    /// Display title
    pub title: String,
    /// Longer description
    pub description: Option<String>,
    /// Points deducted
    pub points: i32,
    /// Hex color
    pub color: String,
    /// Icon name
    pub icon: Option<String>,
    /// Assigned by the server; `None` on placeholders
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Punishment {
    const KIND: &'static str = "punishment";

    fn id(&self) -> &EntityId {
        &self.id
    }
}

/// Values for every punishment field a draft may leave out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PunishmentDefaults {
    /// Description
    pub description: Option<String>,
    /// Points
    pub points: i32,
    /// Color
    pub color: String,
    /// Icon
    pub icon: Option<String>,
}

impl Default for PunishmentDefaults {
    fn default() -> Self {
        Self {
            description: None,
            points: 5,
            color: "#ef4444".to_string(),
            icon: None,
        }
    }
}

/// Variables for creating a punishment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunishmentDraft {
    /// Required title
    pub title: String,
    /// Description
    pub description: Option<String>,
    /// Points
    pub points: Option<i32>,
    /// Color
    pub color: Option<String>,
    /// Icon
    pub icon: Option<String>,
}

impl PunishmentDraft {
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
}

impl Validate for PunishmentDraft {
    fn validate(&self) -> Result<(), ValidationError> {
        checks::title(&self.title)?;
        checks::optional(self.points.as_ref(), |p| checks::non_negative("points", *p))?;
        checks::optional(self.color.as_deref(), checks::color)
    }
}

impl Draft<Punishment> for PunishmentDraft {
    type Defaults = PunishmentDefaults;

    fn build(&self, id: EntityId, defaults: &PunishmentDefaults) -> Punishment {
        Punishment {
            id,
            title: self.title.clone(),
            description: self.description.clone().or_else(|| defaults.description.clone()),
            points: self.points.unwrap_or(defaults.points),
            color: self.color.clone().unwrap_or_else(|| defaults.color.clone()),
            icon: self.icon.clone().or_else(|| defaults.icon.clone()),
            created_at: None,
        }
    }
}

/// Variables for updating a punishment; absent fields keep their value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PunishmentPatch {
    /// Target
    pub id: EntityId,
    /// Title
    pub title: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Points
    pub points: Option<i32>,
    /// Color
    pub color: Option<String>,
    /// Icon
    pub icon: Option<String>,
}

impl PunishmentPatch {
    /// Empty patch for `id`
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            title: None,
            description: None,
            points: None,
            color: None,
            icon: None,
        }
    }

    /// With points
    #[must_use]
    pub fn with_points(mut self, points: i32) -> Self {
        self.points = Some(points);
        self
    }
}

impl Validate for PunishmentPatch {
    fn validate(&self) -> Result<(), ValidationError> {
        checks::optional(self.title.as_deref(), checks::title)?;
        checks::optional(self.points.as_ref(), |p| checks::non_negative("points", *p))?;
        checks::optional(self.color.as_deref(), checks::color)
    }
}

impl Patch<Punishment> for PunishmentPatch {
    fn target(&self) -> &EntityId {
        &self.id
    }

    fn merge(&self, existing: &Punishment) -> Punishment {
        Punishment {
            id: existing.id.clone(),
            title: self.title.clone().unwrap_or_else(|| existing.title.clone()),
            description: self.description.clone().or_else(|| existing.description.clone()),
            points: self.points.unwrap_or(existing.points),
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
    fn default_color_is_valid() {
        assert!(checks::color(&PunishmentDefaults::default().color).is_ok());
    }

    #[test]
    fn patch_merges_points() {
        let existing = PunishmentDraft::new("Late").build(EntityId::server("p1"), &PunishmentDefaults::default());
        let merged = PunishmentPatch::new(EntityId::server("p1")).with_points(8).merge(&existing);
        assert_eq!(merged.points, 8);
        assert_eq!(merged.title, "Late");
    }
}
