//! gpss Simulator CLI
//!
//! Run one of the built-in scenarios and print its report.
//!
//! # Example
//!
//! ```bash
//! # The barbershop over a working day, parallel ticks
//! gpss-sim barbershop
//!
//! # Reproducible run with a fixed seed
//! gpss-sim restaurant --sequential --seed 42
//!
//! # Machine-readable report
//! gpss-sim cafe --ticks 960 --json
//! ```

use clap::Parser;
use gpss_simulation::TickMode;
use gpss_simulator::{Scenario, Simulator, SimulatorConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// gpss Simulator
///
/// Runs a discrete-event scenario. Ticks run in parallel by default; pass
/// --sequential for runs that are reproducible from the seed.
#[derive(Parser, Debug)]
#[command(name = "gpss-sim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Scenario to run
    #[arg(value_enum, default_value = "barbershop")]
    scenario: Scenario,

    /// Model time to simulate. Defaults to the scenario's working day.
    #[arg(short = 't', long)]
    ticks: Option<u64>,

    /// Random seed
    #[arg(short = 's', long, default_value = "12345")]
    seed: u64,

    /// Handle blocks one after another in registration order
    #[arg(long)]
    sequential: bool,

    /// Worker threads for parallel ticks
    #[arg(long, conflicts_with = "sequential")]
    threads: Option<usize>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Log block activity
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize tracing
    let default_filter = if args.verbose {
        "info,gpss_blocks=debug,gpss_simulation=debug"
    } else {
        "warn,gpss_simulation=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = SimulatorConfig::new(args.scenario).with_seed(args.seed);
    if let Some(ticks) = args.ticks {
        config = config.with_ticks(ticks);
    }
    if args.sequential {
        config = config.with_mode(TickMode::Sequential);
    }
    if let Some(threads) = args.threads {
        config = config.with_threads(threads);
    }

    info!(
        scenario = %args.scenario,
        ticks = config.horizon(),
        seed = args.seed,
        "Starting gpss simulator"
    );

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let report = rt.block_on(Simulator::new(config).run())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print_summary();
    }
    Ok(())
}
