use std::fmt;
use std::path::PathBuf;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Role of a raw frame, taken from the IMAGETYP header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FrameRole {
    Bias,
    Dark,
    Flat,
    Light,
}

impl FrameRole {
    /// Parse an IMAGETYP header value. Returns None for unrecognized tags.
    pub fn from_imagetyp(value: &str) -> Option<Self> {
        match value.trim() {
            "Bias Frame" => Some(Self::Bias),
            "Dark Frame" => Some(Self::Dark),
            "Flat Field" => Some(Self::Flat),
            "Light Frame" => Some(Self::Light),
            _ => None,
        }
    }

    /// The IMAGETYP header value written for this role.
    pub fn imagetyp(&self) -> &'static str {
        match self {
            Self::Bias => "Bias Frame",
            Self::Dark => "Dark Frame",
            Self::Flat => "Flat Field",
            Self::Light => "Light Frame",
        }
    }

    /// Whether frames of this role must carry an EXPTIME header.
    pub fn requires_exposure(&self) -> bool {
        matches!(self, Self::Dark | Self::Light)
    }

    /// Whether frames of this role must carry a FILTER header.
    pub fn requires_filter(&self) -> bool {
        matches!(self, Self::Flat | Self::Light)
    }
}

impl fmt::Display for FrameRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bias => write!(f, "bias"),
            Self::Dark => write!(f, "dark"),
            Self::Flat => write!(f, "flat"),
            Self::Light => write!(f, "light"),
        }
    }
}

/// Header metadata of a raw frame, read without touching pixel data.
#[derive(Clone, Debug)]
pub struct FrameInfo {
    pub path: PathBuf,
    pub role: FrameRole,
    /// Exposure time in seconds (Dark and Light frames).
    pub exposure_s: Option<f64>,
    /// Filter name (Flat and Light frames).
    pub filter: Option<String>,
}

/// A raw frame with pixel data loaded. Pixel values are f64 in ADU.
#[derive(Clone, Debug)]
pub struct RawFrame {
    /// Pixel data, row-major, shape = (height, width)
    pub data: Array2<f64>,
    pub info: FrameInfo,
}

impl RawFrame {
    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }
}

/// A statistically combined calibration frame.
#[derive(Clone, Debug)]
pub struct MasterFrame {
    pub data: Array2<f64>,
    pub role: FrameRole,
    /// Reference exposure time in seconds (master dark only).
    pub exposure_s: Option<f64>,
    /// Filter name (master flat only).
    pub filter: Option<String>,
}

impl MasterFrame {
    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }
}

/// A calibrated science frame ready to be written out.
#[derive(Clone, Debug)]
pub struct CalibratedFrame {
    pub data: Array2<f64>,
    /// Exposure time inherited from the light frame.
    pub exposure_s: f64,
    pub filter: String,
    /// Expected saturation level in ADU, stored as the SATLEVEL header.
    pub saturation_adu: i64,
}
