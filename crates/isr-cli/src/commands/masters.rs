use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use isr_core::classify::FrameSet;
use isr_core::master::{build_master_bias, build_master_dark, build_master_flat, CentralRegion};
use isr_core::store::CalibrationStore;

#[derive(Args)]
pub struct MastersArgs {
    /// Directory containing bias, flat, and light frames
    pub raw_dir: PathBuf,

    /// Directory containing dark frames (defaults to the raw directory)
    #[arg(long)]
    pub dark_dir: Option<PathBuf>,

    /// Calibration store directory (defaults to <raw_dir>/mcalib)
    #[arg(long)]
    pub calib_dir: Option<PathBuf>,

    /// Fractional margin excluded on each side for flat normalization
    #[arg(long, default_value = "0.25")]
    pub flat_margin: f64,
}

pub fn run(args: &MastersArgs) -> Result<()> {
    let dark_dir = args.dark_dir.as_deref().unwrap_or(&args.raw_dir);
    let set = if dark_dir == args.raw_dir {
        FrameSet::from_dirs(&[&args.raw_dir])?
    } else {
        FrameSet::from_dirs(&[&args.raw_dir, dark_dir])?
    };
    if set.is_empty() {
        bail!("no classifiable frames in {}", args.raw_dir.display());
    }

    let store = CalibrationStore::new(
        args.calib_dir
            .clone()
            .unwrap_or_else(|| args.raw_dir.join("mcalib")),
    );
    let region = CentralRegion {
        margin: args.flat_margin,
    };

    println!("Classified {} frames", set.len());
    for (path, reason) in &set.skipped {
        println!("  skipped {}: {}", path.display(), reason);
    }

    let bias = build_master_bias(&set)?;
    println!("Master bias:  {}", store.save(&bias)?.display());

    let dark = build_master_dark(&set, &bias)?;
    println!("Master dark:  {}", store.save(&dark)?.display());

    for filter in set.all_filters() {
        match build_master_flat(&set, &filter, &bias, region) {
            Ok(flat) => println!("Master flat:  {}", store.save(&flat)?.display()),
            Err(err) => println!("Master flat ({filter}) failed: {err}"),
        }
    }

    Ok(())
}
