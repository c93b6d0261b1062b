//! ISR run orchestration.
//!
//! Phases run in a fixed order: classification, master bias, master dark,
//! per-filter master flats, per-filter calibration. Every master is
//! finalized and persisted before any light frame is touched. A failure in
//! one filter's flat or calibration is recorded and the remaining filters
//! still run; bias and dark failures abort the run.

pub mod config;

use std::fmt;
use std::path::PathBuf;

use tracing::{error, info};

pub use config::{DetectorConfig, RunConfig};

use crate::calibrate::{calibrate_frame, FilterMasters, SaturationModel};
use crate::classify::FrameSet;
use crate::error::{IsrError, Result};
use crate::frame::FrameRole;
use crate::io;
use crate::master::{build_master_bias, build_master_dark, build_master_flat};
use crate::store::{CalibrationStore, OutputStore};

/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug)]
pub enum PipelineStage {
    Classifying,
    MasterBias,
    MasterDark,
    MasterFlats,
    Calibrating,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classifying => write!(f, "Classifying frames"),
            Self::MasterBias => write!(f, "Building master bias"),
            Self::MasterDark => write!(f, "Building master dark"),
            Self::MasterFlats => write!(f, "Building master flats"),
            Self::Calibrating => write!(f, "Calibrating lights"),
        }
    }
}

/// Progress reporting for the pipeline. All methods default to no-ops.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage, if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// Outcome of one filter's flat construction and calibration.
#[derive(Clone, Debug)]
pub struct FilterReport {
    pub filter: String,
    /// Number of calibrated frames written.
    pub calibrated: usize,
    /// Failure that stopped this filter, if any.
    pub error: Option<String>,
}

/// Summary of a completed run.
#[derive(Debug)]
pub struct RunSummary {
    /// Frames that were classified into a group.
    pub classified: usize,
    /// Files excluded at classification, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
    /// Paths of the persisted master frames.
    pub master_paths: Vec<PathBuf>,
    /// Per-filter outcomes, in filter order.
    pub filters: Vec<FilterReport>,
}

impl RunSummary {
    pub fn calibrated_total(&self) -> usize {
        self.filters.iter().map(|f| f.calibrated).sum()
    }

    pub fn failed_filters(&self) -> impl Iterator<Item = &FilterReport> {
        self.filters.iter().filter(|f| f.error.is_some())
    }
}

/// Run the full ISR pipeline.
pub fn run_isr(config: &RunConfig) -> Result<RunSummary> {
    run_isr_reported(config, &NoOpReporter)
}

/// Run the full ISR pipeline with progress reporting.
pub fn run_isr_reported(
    config: &RunConfig,
    reporter: &dyn ProgressReporter,
) -> Result<RunSummary> {
    let calib_store = CalibrationStore::new(config.calib_dir());
    let output_store = OutputStore::new(config.output_dir(), &config.target);
    let model = SaturationModel {
        full_well_adu: config.detector.full_well_adu,
        margin: config.detector.saturation_margin,
    };

    reporter.begin_stage(PipelineStage::Classifying, None);
    let set = classify_inputs(config)?;
    reporter.finish_stage();

    let filters = set.light_filters();
    if filters.is_empty() {
        return Err(IsrError::MissingFrames {
            role: FrameRole::Light,
            filter: None,
        });
    }
    info!(
        frames = set.len(),
        skipped = set.skipped.len(),
        filters = ?filters,
        "classified raw frames"
    );

    let mut master_paths = Vec::new();

    // Masters must be complete before any light frame is calibrated.
    reporter.begin_stage(PipelineStage::MasterBias, Some(set.biases().len()));
    let bias = build_master_bias(&set)?;
    master_paths.push(calib_store.save(&bias)?);
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::MasterDark, Some(set.darks().len()));
    let dark = build_master_dark(&set, &bias)?;
    master_paths.push(calib_store.save(&dark)?);
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::MasterFlats, Some(filters.len()));
    let mut reports: Vec<FilterReport> = Vec::with_capacity(filters.len());
    for (done, filter) in filters.iter().enumerate() {
        match build_master_flat(&set, filter, &bias, config.central_region) {
            Ok(flat) => {
                master_paths.push(calib_store.save(&flat)?);
                reports.push(FilterReport {
                    filter: filter.clone(),
                    calibrated: 0,
                    error: None,
                });
            }
            Err(err) => {
                error!(%filter, %err, "master flat failed; skipping filter");
                reports.push(FilterReport {
                    filter: filter.clone(),
                    calibrated: 0,
                    error: Some(err.to_string()),
                });
            }
        }
        reporter.advance(done + 1);
    }
    reporter.finish_stage();

    let total_lights: usize = filters.iter().map(|f| set.lights(f).len()).sum();
    reporter.begin_stage(PipelineStage::Calibrating, Some(total_lights));
    let mut done = 0;
    for report in reports.iter_mut() {
        if report.error.is_some() {
            done += set.lights(&report.filter).len();
            reporter.advance(done);
            continue;
        }
        let filter = report.filter.clone();
        match calibrate_filter(&set, &filter, &calib_store, &output_store, model, || {
            done += 1;
            reporter.advance(done);
        }) {
            Ok(count) => report.calibrated = count,
            Err(err) => {
                error!(filter = %report.filter, %err, "calibration failed for filter");
                report.error = Some(err.to_string());
            }
        }
    }
    reporter.finish_stage();

    Ok(RunSummary {
        classified: set.len(),
        skipped: set.skipped,
        master_paths,
        filters: reports,
    })
}

fn classify_inputs(config: &RunConfig) -> Result<FrameSet> {
    let raw = config.raw_dir.as_path();
    let dark = config.dark_dir();
    if dark == raw {
        FrameSet::from_dirs(&[raw])
    } else {
        FrameSet::from_dirs(&[raw, dark])
    }
}

fn calibrate_filter(
    set: &FrameSet,
    filter: &str,
    calib_store: &CalibrationStore,
    output_store: &OutputStore,
    model: SaturationModel,
    mut on_frame: impl FnMut(),
) -> Result<usize> {
    let masters = FilterMasters::load(calib_store, filter)?;

    let mut count = 0;
    for (index, light) in set.lights(filter).iter().enumerate() {
        let raw = io::read_raw(light)?;
        let calibrated = calibrate_frame(&raw, &masters, model)?;
        let path = output_store.save(&calibrated, index)?;
        info!(path = %path.display(), filter, "wrote calibrated frame");
        count += 1;
        on_frame();
    }
    Ok(count)
}
