//! Tally Domain - the tracked entity kinds
//!
//! - [`Task`], [`Reward`], [`Punishment`], [`Rule`] with their drafts
//!   (create variables), defaults tables and patches (update variables)
//! - [`TaskCompletion`] and [`RewardUsage`] history records
//! - [`keys`]: the query key of every cached collection
//!
//! Drafts build complete placeholder entities from a defaults table, so an
//! optimistic item always carries every field a renderer reads.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod checks;
pub mod error;
pub mod history;
pub mod keys;
pub mod kinds;
pub mod punishment;
pub mod reward;
pub mod rule;
pub mod task;

pub use error::{DomainError, DomainResult};
pub use history::{RewardUsage, TaskCompletion};
pub use kinds::{Frequency, Priority};
pub use punishment::{Punishment, PunishmentDefaults, PunishmentDraft, PunishmentPatch};
pub use reward::{Reward, RewardDefaults, RewardDraft, RewardPatch};
pub use rule::{Rule, RuleDefaults, RuleDraft, RulePatch};
pub use task::{Task, TaskDefaults, TaskDraft, TaskPatch};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
