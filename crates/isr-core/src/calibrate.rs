//! Science frame calibration.
//!
//! The correction order is an invariant: subtract the master bias, subtract
//! the master dark rescaled to the light frame's exposure, then divide by
//! the normalized master flat. Flat division must operate on signal already
//! free of additive offsets.

use tracing::debug;

use crate::error::{IsrError, Result};
use crate::frame::{CalibratedFrame, MasterFrame, RawFrame};
use crate::master::ensure_same_dims;
use crate::stack::median::median_of;
use crate::store::CalibrationStore;

/// The three masters needed to calibrate one filter's light frames.
#[derive(Clone, Debug)]
pub struct FilterMasters {
    pub bias: MasterFrame,
    pub dark: MasterFrame,
    pub flat: MasterFrame,
}

impl FilterMasters {
    /// Load the bias, dark, and the given filter's flat from the store.
    pub fn load(store: &CalibrationStore, filter: &str) -> Result<Self> {
        Ok(Self {
            bias: store.load_bias()?,
            dark: store.load_dark()?,
            flat: store.load_flat(filter)?,
        })
    }

    /// Reference exposure time the master dark was stored at.
    fn dark_reference_s(&self) -> Result<f64> {
        self.dark
            .exposure_s
            .ok_or_else(|| IsrError::MissingMetadata {
                path: "master dark".into(),
                key: "EXPTIME".into(),
            })
    }
}

/// Detector response model feeding the saturation estimate.
#[derive(Clone, Copy, Debug)]
pub struct SaturationModel {
    /// Full-well capacity in ADU.
    pub full_well_adu: f64,
    /// Fraction of the computed linear limit reported as safe.
    pub margin: f64,
}

impl Default for SaturationModel {
    fn default() -> Self {
        Self {
            full_well_adu: crate::consts::FULL_WELL_ADU,
            margin: crate::consts::SATURATION_MARGIN,
        }
    }
}

/// Expected saturation level in ADU for a light frame of the given
/// exposure.
///
/// Starts from the detector full well, removes the bias and exposure-scaled
/// dark medians, normalizes by the flat mean, and applies the safety
/// margin, truncated to an integer.
pub fn saturation_level(
    masters: &FilterMasters,
    light_exposure_s: f64,
    model: SaturationModel,
) -> Result<i64> {
    let bias_values: Vec<f64> = masters.bias.data.iter().copied().collect();
    let dark_values: Vec<f64> = masters.dark.data.iter().copied().collect();
    let ratio = light_exposure_s / masters.dark_reference_s()?;

    let flat_mean = masters.flat.data.mean().unwrap_or(0.0);
    if flat_mean <= f64::EPSILON {
        return Err(IsrError::ZeroNormalization(
            "master flat mean is not positive".into(),
        ));
    }

    let mut level = model.full_well_adu;
    level -= median_of(&bias_values)?;
    level -= median_of(&dark_values)? * ratio;
    level /= flat_mean;
    level *= model.margin;
    Ok(level as i64)
}

/// Calibrate one light frame against the filter's masters.
///
/// The saturation level is computed from this frame's own exposure time, so
/// runs mixing exposure times stay correct per output frame.
pub fn calibrate_frame(
    light: &RawFrame,
    masters: &FilterMasters,
    model: SaturationModel,
) -> Result<CalibratedFrame> {
    ensure_same_dims(masters.bias.dim(), light.data.dim())?;
    ensure_same_dims(masters.dark.dim(), light.data.dim())?;
    ensure_same_dims(masters.flat.dim(), light.data.dim())?;

    let exposure_s = light.info.exposure_s.ok_or_else(|| IsrError::MissingMetadata {
        path: light.info.path.clone(),
        key: "EXPTIME".into(),
    })?;
    let filter = light
        .info
        .filter
        .clone()
        .ok_or_else(|| IsrError::MissingMetadata {
            path: light.info.path.clone(),
            key: "FILTER".into(),
        })?;

    let saturation_adu = saturation_level(masters, exposure_s, model)?;
    let ratio = exposure_s / masters.dark_reference_s()?;

    let mut data = light.data.clone();
    data -= &masters.bias.data;
    data.zip_mut_with(&masters.dark.data, |d, &s| *d -= s * ratio);
    data.zip_mut_with(&masters.flat.data, |d, &s| {
        if s.abs() > f64::EPSILON {
            *d /= s;
        }
    });

    debug!(
        path = %light.info.path.display(),
        filter,
        exposure_s,
        saturation_adu,
        "calibrated light frame"
    );

    Ok(CalibratedFrame {
        data,
        exposure_s,
        filter,
        saturation_adu,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameRole;
    use ndarray::Array2;

    fn masters(bias: f64, dark: f64, flat: f64) -> FilterMasters {
        FilterMasters {
            bias: MasterFrame {
                data: Array2::from_elem((4, 4), bias),
                role: FrameRole::Bias,
                exposure_s: None,
                filter: None,
            },
            dark: MasterFrame {
                data: Array2::from_elem((4, 4), dark),
                role: FrameRole::Dark,
                exposure_s: Some(30.0),
                filter: None,
            },
            flat: MasterFrame {
                data: Array2::from_elem((4, 4), flat),
                role: FrameRole::Flat,
                exposure_s: None,
                filter: Some("V".to_string()),
            },
        }
    }

    #[test]
    fn test_saturation_level_value() {
        // (65535 - 100 - 50*2) / 1.0 * 0.97, truncated
        let level =
            saturation_level(&masters(100.0, 50.0, 1.0), 60.0, SaturationModel::default()).unwrap();
        assert_eq!(level, ((65535.0 - 100.0 - 100.0) * 0.97) as i64);
    }

    #[test]
    fn test_saturation_monotonic_in_bias_and_dark() {
        let model = SaturationModel::default();
        let base = saturation_level(&masters(100.0, 50.0, 1.0), 30.0, model).unwrap();
        let more_bias = saturation_level(&masters(200.0, 50.0, 1.0), 30.0, model).unwrap();
        let more_dark = saturation_level(&masters(100.0, 80.0, 1.0), 30.0, model).unwrap();
        assert!(more_bias < base);
        assert!(more_dark < base);
    }

    #[test]
    fn test_saturation_monotonic_in_flat_mean() {
        let model = SaturationModel::default();
        let dim = saturation_level(&masters(100.0, 50.0, 0.5), 30.0, model).unwrap();
        let bright = saturation_level(&masters(100.0, 50.0, 1.5), 30.0, model).unwrap();
        assert!(bright > dim);
    }

    #[test]
    fn test_zero_flat_mean_is_an_error() {
        let err = saturation_level(&masters(100.0, 50.0, 0.0), 30.0, SaturationModel::default());
        assert!(matches!(err, Err(IsrError::ZeroNormalization(_))));
    }
}
