//! `cambrian` — drive simulations, analyze tool complexity, report metrics.

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "cambrian", version, about = "Agent tool-economy engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation and print per-round results
    Run(commands::run::RunArgs),
    /// Batch-analyze a directory of .tool sources
    Analyze(commands::analyze::AnalyzeArgs),
    /// Recompute emergence metrics from a persisted run
    Metrics(commands::metrics::MetricsArgs),
    /// Show version and engine configuration
    Info,
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run(args) => commands::run::execute(args).await,
        Commands::Analyze(args) => commands::analyze::execute(args),
        Commands::Metrics(args) => commands::metrics::execute(args).await,
        Commands::Info => commands::info::execute(),
    }
}
