use anyhow::Context;
use tally_cli::cli::{apply_overrides, command, config_path};
use tally_cli::{run_simulator, Settings};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let matches = command().get_matches();
    let mut settings = Settings::load(config_path(&matches).as_deref())?;

    match matches.subcommand() {
        Some(("simulate", args)) => {
            apply_overrides(&mut settings, args);
            let json = args.get_flag("json");

            tracing::info!(
                "Running {} operations (seed {}, failure rate {:.2})",
                settings.simulation.operations,
                settings.simulation.seed,
                settings.simulation.failure_rate
            );
            let report = run_simulator(settings.simulation, settings.mutation)
                .await
                .context("simulation could not read the backend")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.generate_text());
            }

            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        Some(("config", _)) => {
            print!("{}", settings.to_toml()?);
        }
        _ => {}
    }
    Ok(())
}
