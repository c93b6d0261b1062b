use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::{FULL_WELL_ADU, SATURATION_MARGIN};
use crate::master::CentralRegion;

/// Full configuration of one ISR run.
///
/// Every root the pipeline touches is named here; nothing is derived from
/// hidden directory conventions. Only `raw_dir` and `target` are required,
/// the remaining roots default to subdirectories of `raw_dir`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfig {
    /// Directory containing bias, flat, and raw science frames.
    pub raw_dir: PathBuf,
    /// Directory containing dark frames; defaults to `raw_dir`.
    pub dark_dir: Option<PathBuf>,
    /// Calibration store root; defaults to `<raw_dir>/mcalib`.
    pub calib_dir: Option<PathBuf>,
    /// Calibrated output root; defaults to `<raw_dir>/ISR_Images`.
    pub output_dir: Option<PathBuf>,
    /// Target name used in output file names.
    pub target: String,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub central_region: CentralRegion,
}

impl RunConfig {
    pub fn new(raw_dir: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            dark_dir: None,
            calib_dir: None,
            output_dir: None,
            target: target.into(),
            detector: DetectorConfig::default(),
            central_region: CentralRegion::default(),
        }
    }

    pub fn dark_dir(&self) -> &Path {
        self.dark_dir.as_deref().unwrap_or(&self.raw_dir)
    }

    pub fn calib_dir(&self) -> PathBuf {
        self.calib_dir
            .clone()
            .unwrap_or_else(|| self.raw_dir.join("mcalib"))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.raw_dir.join("ISR_Images"))
    }
}

/// Detector response parameters.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Full-well capacity in ADU.
    pub full_well_adu: f64,
    /// Fraction of the computed linear limit reported as SATLEVEL.
    pub saturation_margin: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            full_well_adu: FULL_WELL_ADU,
            saturation_margin: SATURATION_MARGIN,
        }
    }
}
