//! Master calibration frame synthesis.
//!
//! Bias frames combine by per-pixel median, which rejects single-frame
//! transients like cosmic-ray hits. Darks are converted to dark-current
//! rates (ADU/s) before the median so exposures need not match, and the
//! master is stored back at a reference exposure recorded in its EXPTIME
//! header. Flats are bias-subtracted, normalized to a unit central-region
//! mean, and combined by per-pixel average.

use ndarray::{s, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::classify::FrameSet;
use crate::consts::CENTRAL_REGION_MARGIN;
use crate::error::{IsrError, Result};
use crate::frame::{FrameRole, MasterFrame};
use crate::io;
use crate::stack::{MeanReducer, MedianReducer, StackReducer};

/// Central sub-region of the detector used to normalize flats, expressed as
/// a fractional margin excluded on every side.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CentralRegion {
    pub margin: f64,
}

impl Default for CentralRegion {
    fn default() -> Self {
        Self {
            margin: CENTRAL_REGION_MARGIN,
        }
    }
}

impl CentralRegion {
    /// View of the central region. Falls back to the full frame when the
    /// margins would leave nothing.
    pub fn view<'a>(&self, data: &'a Array2<f64>) -> ArrayView2<'a, f64> {
        let (h, w) = data.dim();
        let r0 = (h as f64 * self.margin) as usize;
        let c0 = (w as f64 * self.margin) as usize;
        let (r1, c1) = (h - r0, w - c0);
        if r1 <= r0 || c1 <= c0 {
            return data.view();
        }
        data.slice(s![r0..r1, c0..c1])
    }

    /// Mean pixel value inside the central region.
    pub fn mean_of(&self, data: &Array2<f64>) -> f64 {
        self.view(data).mean().unwrap_or(0.0)
    }
}

/// Build the master bias: per-pixel median across all bias frames.
pub fn build_master_bias(set: &FrameSet) -> Result<MasterFrame> {
    let biases = set.biases();
    if biases.is_empty() {
        return Err(IsrError::MissingFrames {
            role: FrameRole::Bias,
            filter: None,
        });
    }

    let mut reducer = MedianReducer::default();
    for info in biases {
        reducer.push(io::read_raw(info)?.data)?;
    }
    info!(frames = reducer.len(), "stacking master bias");

    Ok(MasterFrame {
        data: reducer.finish()?,
        role: FrameRole::Bias,
        exposure_s: None,
        filter: None,
    })
}

/// Build the master dark at a reference exposure time.
///
/// Each dark is bias-subtracted and divided by its own exposure to give a
/// dark-current rate; the per-pixel median rate is then scaled back to the
/// reference exposure (the first dark's native exposure), which is stored
/// with the master so calibration can rescale to any light exposure.
pub fn build_master_dark(set: &FrameSet, bias: &MasterFrame) -> Result<MasterFrame> {
    let darks = set.darks();
    if darks.is_empty() {
        return Err(IsrError::MissingFrames {
            role: FrameRole::Dark,
            filter: None,
        });
    }

    // Classification guarantees EXPTIME on dark frames.
    let reference_s = darks[0].exposure_s.unwrap_or(1.0);

    let mut reducer = MedianReducer::default();
    for dark in darks {
        let mut data = io::read_raw(dark)?.data;
        ensure_same_dims(bias.dim(), data.dim())?;
        let exposure = dark.exposure_s.unwrap_or(reference_s);
        data -= &bias.data;
        data /= exposure;
        reducer.push(data)?;
    }
    info!(
        frames = reducer.len(),
        reference_s, "stacking master dark from rate frames"
    );

    let mut rate = reducer.finish()?;
    rate *= reference_s;

    Ok(MasterFrame {
        data: rate,
        role: FrameRole::Dark,
        exposure_s: Some(reference_s),
        filter: None,
    })
}

/// Build one filter's master flat: bias-subtract, normalize each flat by its
/// central-region mean, then average the normalized stack.
pub fn build_master_flat(
    set: &FrameSet,
    filter: &str,
    bias: &MasterFrame,
    region: CentralRegion,
) -> Result<MasterFrame> {
    let flats = set.flats(filter);
    if flats.is_empty() {
        return Err(IsrError::MissingFrames {
            role: FrameRole::Flat,
            filter: Some(filter.to_string()),
        });
    }

    let mut reducer = MeanReducer::default();
    for flat in flats {
        let mut data = io::read_raw(flat)?.data;
        ensure_same_dims(bias.dim(), data.dim())?;
        data -= &bias.data;

        let scale = region.mean_of(&data);
        if scale <= f64::EPSILON {
            return Err(IsrError::ZeroNormalization(format!(
                "central region mean is not positive in {}",
                flat.path.display()
            )));
        }
        data /= scale;
        reducer.push(data)?;
    }
    info!(filter, frames = reducer.len(), "stacking master flat");

    Ok(MasterFrame {
        data: reducer.finish()?,
        role: FrameRole::Flat,
        exposure_s: None,
        filter: Some(filter.to_string()),
    })
}

pub(crate) fn ensure_same_dims(expected: (usize, usize), actual: (usize, usize)) -> Result<()> {
    if expected != actual {
        return Err(IsrError::DimensionMismatch { expected, actual });
    }
    Ok(())
}
