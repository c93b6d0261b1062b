use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use isr_core::pipeline::{run_isr_reported, PipelineStage, ProgressReporter, RunConfig};

use crate::summary;

#[derive(Args)]
pub struct RunArgs {
    /// Directory containing bias, flat, and light frames
    pub raw_dir: Option<PathBuf>,

    /// Run config file (TOML); overrides the other options
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Target name used in output file names
    #[arg(long, default_value = "target")]
    pub target: String,

    /// Directory containing dark frames (defaults to the raw directory)
    #[arg(long)]
    pub dark_dir: Option<PathBuf>,

    /// Calibration store directory (defaults to <raw_dir>/mcalib)
    #[arg(long)]
    pub calib_dir: Option<PathBuf>,

    /// Calibrated output directory (defaults to <raw_dir>/ISR_Images)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let config = load_config(args)?;
    summary::print_run_summary(&config);

    let reporter = BarReporter::default();
    let report = run_isr_reported(&config, &reporter)?;
    reporter.clear();

    summary::print_run_report(&report);

    if report.filters.iter().all(|f| f.error.is_some()) {
        anyhow::bail!("calibration failed for every filter");
    }
    Ok(())
}

fn load_config(args: &RunArgs) -> Result<RunConfig> {
    if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        return toml::from_str(&contents).context("Invalid run config");
    }

    let raw_dir = args
        .raw_dir
        .clone()
        .context("either a raw directory or --config is required")?;
    let mut config = RunConfig::new(raw_dir, args.target.clone());
    config.dark_dir = args.dark_dir.clone();
    config.calib_dir = args.calib_dir.clone();
    config.output_dir = args.output_dir.clone();
    Ok(config)
}

/// Progress reporter backed by an indicatif bar, one bar per stage.
#[derive(Default)]
struct BarReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl BarReporter {
    fn clear(&self) {
        if let Some(bar) = self.bar.lock().expect("progress bar lock").take() {
            bar.finish_and_clear();
        }
    }
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        let bar = match total_items {
            Some(total) => {
                let bar = ProgressBar::new(total as u64);
                if let Ok(style) =
                    ProgressStyle::default_bar().template("{msg:24} [{bar:40}] {pos}/{len}")
                {
                    bar.set_style(style.progress_chars("=> "));
                }
                bar
            }
            None => ProgressBar::new_spinner(),
        };
        bar.set_message(stage.to_string());
        *self.bar.lock().expect("progress bar lock") = Some(bar);
    }

    fn advance(&self, items_done: usize) {
        if let Some(bar) = self.bar.lock().expect("progress bar lock").as_ref() {
            bar.set_position(items_done as u64);
        }
    }

    fn finish_stage(&self) {
        if let Some(bar) = self.bar.lock().expect("progress bar lock").take() {
            bar.finish_and_clear();
        }
    }
}
