//! Tally CLI - workload simulator for the optimistic mutation layer
//!
//! - [`backend`]: seeded in-memory remote authority
//! - [`simulator`]: mixed concurrent workload with consistency checks
//! - [`settings`]: TOML configuration
//! - [`cli`]: command-line surface of the `tally` binary

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod backend;
pub mod cli;
pub mod settings;
pub mod simulator;

pub use backend::SimBackend;
pub use settings::Settings;
pub use simulator::{run_simulator, SimulatorConfig, SimulatorReport, SimulatorStats, Violation};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
