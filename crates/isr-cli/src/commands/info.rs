use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use isr_core::io::{read_info, read_pixels};

#[derive(Args)]
pub struct InfoArgs {
    /// Input FITS file
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let info = read_info(&args.file)?;
    let pixels = read_pixels(&args.file)?;
    let (h, w) = pixels.dim();

    println!("File:        {}", info.path.display());
    println!("Role:        {}", info.role);
    println!("Dimensions:  {}x{}", w, h);

    if let Some(exposure) = info.exposure_s {
        println!("Exposure:    {exposure} s");
    }
    if let Some(ref filter) = info.filter {
        println!("Filter:      {filter}");
    }

    let mean = pixels.mean().unwrap_or(0.0);
    println!("Mean level:  {mean:.2} ADU");

    Ok(())
}
