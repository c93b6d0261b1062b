use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use isr_core::solver::SolverClient;

#[derive(Args)]
pub struct SolveArgs {
    /// Calibrated FITS image to plate-solve
    pub file: PathBuf,

    /// API key for the plate-solving service (or ASTROMETRY_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Seconds to wait for the remote job before giving up
    #[arg(long, default_value = "600")]
    pub timeout: u64,

    /// Output file path for the solved image
    #[arg(short, long, default_value = "solved.fits")]
    pub output: PathBuf,
}

pub fn run(args: &SolveArgs) -> Result<()> {
    let api_key = match &args.api_key {
        Some(key) => key.clone(),
        None => std::env::var("ASTROMETRY_API_KEY")
            .context("pass --api-key or set ASTROMETRY_API_KEY")?,
    };

    let mut client = SolverClient::new(api_key)?;

    println!("Uploading {}...", args.file.display());
    let bytes = client.solve_file(&args.file, Duration::from_secs(args.timeout))?;

    std::fs::write(&args.output, &bytes)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    println!("Saved solved image to {}", args.output.display());

    Ok(())
}
