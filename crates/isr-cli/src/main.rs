mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "isr", about = "CCD instrument signature removal tool")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show FITS frame metadata
    Info(commands::info::InfoArgs),
    /// Build and persist master calibration frames
    Masters(commands::masters::MastersArgs),
    /// Run the full ISR pipeline
    Run(commands::run::RunArgs),
    /// Plate-solve a calibrated image via the remote service
    Solve(commands::solve::SolveArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Masters(args) => commands::masters::run(args),
        Commands::Run(args) => commands::run::run(args),
        Commands::Solve(args) => commands::solve::run(args),
    }
}
