//! Configuration file
//!
//! ```toml
//! [mutation]
//! serialize_per_key = true
//! remote_timeout_ms = 2000
//!
//! [simulation]
//! operations = 500
//! failure_rate = 0.1
//! ```
//!
//! Every table and key is optional; command-line flags override the file.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tally_mutation::MutationConfig;

use crate::simulator::SimulatorConfig;

/// Effective configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Mutation executor settings
    pub mutation: MutationConfig,
    /// Simulator defaults
    pub simulation: SimulatorConfig,
}

impl Settings {
    /// Parse settings from TOML text
    ///
    /// # Errors
    /// Malformed TOML or mistyped values.
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("invalid configuration")
    }

    /// Load settings from `path`, or defaults when no path is given
    ///
    /// # Errors
    /// Unreadable file or invalid contents.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let settings = Self::from_toml(&text).with_context(|| format!("in {}", path.display()))?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(settings)
    }

    /// Render as TOML
    ///
    /// # Errors
    /// Only if a value cannot be represented in TOML.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("failed to render configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn missing_path_gives_defaults() {
        assert_eq!(Settings::load(None).unwrap(), Settings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[mutation]\nserialize_per_key = true\n\n[simulation]\noperations = 12").unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();

        assert!(settings.mutation.serialize_per_key);
        assert!(settings.mutation.notify_success);
        assert_eq!(settings.simulation.operations, 12);
        assert_eq!(settings.simulation.seed, SimulatorConfig::default().seed);
    }

    #[test]
    fn bad_value_is_reported() {
        let err = Settings::from_toml("[mutation]\nserialize_per_key = \"yes\"").unwrap_err();
        assert!(err.to_string().contains("invalid configuration"));
    }

    #[test]
    fn unreadable_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let err = Settings::load(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn rendered_toml_parses_back() {
        let settings = Settings {
            mutation: MutationConfig::new().with_serialize_per_key(true),
            ..Settings::default()
        };
        let text = settings.to_toml().unwrap();
        assert_eq!(Settings::from_toml(&text).unwrap(), settings);
    }
}
