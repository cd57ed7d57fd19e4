//! Command-line surface
//!
//! - `tally simulate`: run the workload simulator
//! - `tally config`: print the effective configuration as TOML

use crate::settings::Settings;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

/// Build the `tally` command
#[must_use]
pub fn command() -> Command {
    Command::new("tally")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Optimistic mutation layer workload simulator")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run a seeded mixed workload and check cache consistency")
                .arg(
                    Arg::new("operations")
                        .long("operations")
                        .value_parser(value_parser!(u64))
                        .help("Number of mutation attempts"),
                )
                .arg(
                    Arg::new("batch-size")
                        .long("batch-size")
                        .value_parser(value_parser!(usize))
                        .help("Attempts started concurrently"),
                )
                .arg(
                    Arg::new("failure-rate")
                        .long("failure-rate")
                        .value_parser(value_parser!(f64))
                        .help("Probability that a remote call fails (0.0 - 1.0)"),
                )
                .arg(
                    Arg::new("latency-ms")
                        .long("latency-ms")
                        .value_parser(value_parser!(u64))
                        .help("Base remote latency in milliseconds"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("serialize-per-key")
                        .long("serialize-per-key")
                        .action(ArgAction::SetTrue)
                        .help("Run mutations on the same key one at a time"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output the report as JSON"),
                ),
        )
        .subcommand(Command::new("config").about("Print the effective configuration"))
}

/// Configuration file named by `--config`, if any
#[must_use]
pub fn config_path(matches: &ArgMatches) -> Option<PathBuf> {
    matches.get_one::<PathBuf>("config").cloned()
}

/// Apply `simulate` flags over loaded settings
pub fn apply_overrides(settings: &mut Settings, args: &ArgMatches) {
    let simulation = &mut settings.simulation;
    if let Some(operations) = args.get_one::<u64>("operations") {
        simulation.operations = *operations;
    }
    if let Some(batch_size) = args.get_one::<usize>("batch-size") {
        simulation.batch_size = *batch_size;
    }
    if let Some(rate) = args.get_one::<f64>("failure-rate") {
        simulation.failure_rate = *rate;
    }
    if let Some(latency) = args.get_one::<u64>("latency-ms") {
        simulation.latency_ms = *latency;
    }
    if let Some(seed) = args.get_one::<u64>("seed") {
        simulation.seed = *seed;
    }
    if args.get_flag("serialize-per-key") {
        settings.mutation.serialize_per_key = true;
    }
}
