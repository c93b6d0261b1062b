//! On-disk stores for master frames and calibrated output.
//!
//! Every write overwrites any previous file at the same path, so repeating
//! a run regenerates identical stores instead of failing on leftovers.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::frame::{CalibratedFrame, MasterFrame};
use crate::io;

/// Calibration store: one directory holding the persisted masters.
///
/// Layout: `mbias.fits`, `mdark.fits`, and `<filter>_mflat.fits` per filter.
#[derive(Clone, Debug)]
pub struct CalibrationStore {
    root: PathBuf,
}

impl CalibrationStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bias_path(&self) -> PathBuf {
        self.root.join("mbias.fits")
    }

    pub fn dark_path(&self) -> PathBuf {
        self.root.join("mdark.fits")
    }

    pub fn flat_path(&self, filter: &str) -> PathBuf {
        self.root.join(format!("{filter}_mflat.fits"))
    }

    fn master_path(&self, master: &MasterFrame) -> PathBuf {
        use crate::frame::FrameRole::*;
        match (master.role, master.filter.as_deref()) {
            (Flat, Some(filter)) => self.flat_path(filter),
            (Dark, _) => self.dark_path(),
            _ => self.bias_path(),
        }
    }

    /// Persist a master frame, creating the store directory if needed.
    pub fn save(&self, master: &MasterFrame) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)?;
        let path = self.master_path(master);
        debug!(path = %path.display(), role = %master.role, "writing master frame");
        io::write_master(&path, master)?;
        Ok(path)
    }

    pub fn load_bias(&self) -> Result<MasterFrame> {
        io::read_master(&self.bias_path())
    }

    pub fn load_dark(&self) -> Result<MasterFrame> {
        io::read_master(&self.dark_path())
    }

    pub fn load_flat(&self, filter: &str) -> Result<MasterFrame> {
        io::read_master(&self.flat_path(filter))
    }
}

/// Output store: one subdirectory per filter under the ISR images root,
/// with deterministic file names keyed by target, filter, and sequence
/// index.
#[derive(Clone, Debug)]
pub struct OutputStore {
    root: PathBuf,
    target: String,
}

impl OutputStore {
    pub fn new(root: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            target: target.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn filter_dir(&self, filter: &str) -> PathBuf {
        self.root.join(filter)
    }

    pub fn frame_path(&self, filter: &str, index: usize) -> PathBuf {
        self.filter_dir(filter)
            .join(format!("{}_{}_{}.fits", self.target, filter, index))
    }

    /// Write one calibrated frame at its deterministic path.
    pub fn save(&self, frame: &CalibratedFrame, index: usize) -> Result<PathBuf> {
        let path = self.frame_path(&frame.filter, index);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        io::write_calibrated(&path, frame)?;
        Ok(path)
    }
}
