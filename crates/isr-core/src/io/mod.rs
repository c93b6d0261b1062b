//! FITS frame I/O.
//!
//! All pixel data is stored on disk as 64-bit floats so that writing and
//! re-reading a frame preserves values exactly. Headers follow the common
//! acquisition-software conventions: IMAGETYP for the frame role, EXPTIME
//! in seconds, FILTER for the photometric band, SATLEVEL on calibrated
//! output.

use std::path::Path;

use fitsio::hdu::{FitsHdu, HduInfo};
use fitsio::images::{ImageDescription, ImageType};
use fitsio::FitsFile;
use ndarray::Array2;

use crate::error::{IsrError, Result};
use crate::frame::{CalibratedFrame, FrameInfo, FrameRole, MasterFrame, RawFrame};

/// Recognized FITS file extensions.
const FITS_EXTENSIONS: [&str; 3] = ["fit", "fits", "fts"];

/// Whether a path looks like a FITS file (by extension, case-insensitive).
pub fn is_fits_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| FITS_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

/// Read classification headers from a frame without loading pixel data.
///
/// IMAGETYP must be present and recognized; EXPTIME and FILTER are required
/// only for the roles that carry them.
pub fn read_info(path: &Path) -> Result<FrameInfo> {
    let mut fptr = FitsFile::open(path)?;
    let hdu = fptr.primary_hdu()?;

    let imagetyp: String = read_key_optional(&hdu, &mut fptr, "IMAGETYP").ok_or_else(|| {
        IsrError::MissingMetadata {
            path: path.to_path_buf(),
            key: "IMAGETYP".into(),
        }
    })?;
    let role = FrameRole::from_imagetyp(&imagetyp).ok_or_else(|| IsrError::MissingMetadata {
        path: path.to_path_buf(),
        key: format!("IMAGETYP ({imagetyp:?})"),
    })?;

    let exposure_s: Option<f64> = read_key_optional(&hdu, &mut fptr, "EXPTIME");
    if role.requires_exposure() && exposure_s.is_none() {
        return Err(IsrError::MissingMetadata {
            path: path.to_path_buf(),
            key: "EXPTIME".into(),
        });
    }

    let filter: Option<String> =
        read_key_optional::<String>(&hdu, &mut fptr, "FILTER").map(|f| f.trim().to_string());
    if role.requires_filter() && filter.is_none() {
        return Err(IsrError::MissingMetadata {
            path: path.to_path_buf(),
            key: "FILTER".into(),
        });
    }

    Ok(FrameInfo {
        path: path.to_path_buf(),
        role,
        exposure_s,
        // Filter tags only apply to flats and lights.
        filter: if role.requires_filter() { filter } else { None },
    })
}

/// Read the primary-HDU pixel data of a frame as f64.
pub fn read_pixels(path: &Path) -> Result<Array2<f64>> {
    let mut fptr = FitsFile::open(path)?;
    let hdu = fptr.primary_hdu()?;
    read_hdu_pixels(&hdu, &mut fptr, path)
}

/// Read a classified frame together with its pixel data.
pub fn read_raw(info: &FrameInfo) -> Result<RawFrame> {
    let data = read_pixels(&info.path)?;
    Ok(RawFrame {
        data,
        info: info.clone(),
    })
}

/// Write a master calibration frame, overwriting any existing file.
pub fn write_master(path: &Path, master: &MasterFrame) -> Result<()> {
    let mut fptr = create_double_image(path, master.dim())?;
    let hdu = fptr.primary_hdu()?;

    write_f64_pixels(&hdu, &mut fptr, &master.data)?;
    hdu.write_key(&mut fptr, "IMAGETYP", master.role.imagetyp().to_string())?;
    if let Some(exposure) = master.exposure_s {
        hdu.write_key(&mut fptr, "EXPTIME", exposure)?;
    }
    if let Some(ref filter) = master.filter {
        hdu.write_key(&mut fptr, "FILTER", filter.clone())?;
    }
    Ok(())
}

/// Read a master calibration frame back from the calibration store.
pub fn read_master(path: &Path) -> Result<MasterFrame> {
    let mut fptr = FitsFile::open(path)?;
    let hdu = fptr.primary_hdu()?;

    let imagetyp: String = read_key_optional(&hdu, &mut fptr, "IMAGETYP").ok_or_else(|| {
        IsrError::MissingMetadata {
            path: path.to_path_buf(),
            key: "IMAGETYP".into(),
        }
    })?;
    let role = FrameRole::from_imagetyp(&imagetyp).ok_or_else(|| IsrError::MissingMetadata {
        path: path.to_path_buf(),
        key: format!("IMAGETYP ({imagetyp:?})"),
    })?;

    let data = read_hdu_pixels(&hdu, &mut fptr, path)?;
    Ok(MasterFrame {
        data,
        role,
        exposure_s: read_key_optional(&hdu, &mut fptr, "EXPTIME"),
        filter: read_key_optional::<String>(&hdu, &mut fptr, "FILTER")
            .map(|f| f.trim().to_string()),
    })
}

/// Write a calibrated light frame, overwriting any existing file.
///
/// The output carries the light frame's role, exposure, and filter headers
/// plus the computed SATLEVEL.
pub fn write_calibrated(path: &Path, frame: &CalibratedFrame) -> Result<()> {
    let mut fptr = create_double_image(path, frame.data.dim())?;
    let hdu = fptr.primary_hdu()?;

    write_f64_pixels(&hdu, &mut fptr, &frame.data)?;
    hdu.write_key(&mut fptr, "IMAGETYP", FrameRole::Light.imagetyp().to_string())?;
    hdu.write_key(&mut fptr, "EXPTIME", frame.exposure_s)?;
    hdu.write_key(&mut fptr, "FILTER", frame.filter.clone())?;
    hdu.write_key(&mut fptr, "SATLEVEL", frame.saturation_adu)?;
    Ok(())
}

fn create_double_image(path: &Path, (height, width): (usize, usize)) -> Result<FitsFile> {
    let dimensions = [height, width];
    let description = ImageDescription {
        data_type: ImageType::Double,
        dimensions: &dimensions,
    };
    Ok(FitsFile::create(path)
        .overwrite()
        .with_custom_primary(&description)
        .open()?)
}

fn write_f64_pixels(hdu: &FitsHdu, fptr: &mut FitsFile, data: &Array2<f64>) -> Result<()> {
    let flat: Vec<f64> = data.iter().copied().collect();
    hdu.write_image(fptr, &flat)?;
    Ok(())
}

fn read_hdu_pixels(hdu: &FitsHdu, fptr: &mut FitsFile, path: &Path) -> Result<Array2<f64>> {
    let shape = match &hdu.info {
        HduInfo::ImageInfo { shape, .. } if shape.len() == 2 => (shape[0], shape[1]),
        _ => {
            return Err(IsrError::MissingMetadata {
                path: path.to_path_buf(),
                key: "NAXIS (expected 2-D image)".into(),
            })
        }
    };

    let pixels: Vec<f64> = hdu.read_image(fptr)?;
    Array2::from_shape_vec(shape, pixels).map_err(|_| IsrError::DimensionMismatch {
        expected: shape,
        actual: (0, 0),
    })
}

/// Read an optional header key, treating absence as None.
fn read_key_optional<T: fitsio::headers::ReadsKey>(
    hdu: &FitsHdu,
    fptr: &mut FitsFile,
    key: &str,
) -> Option<T> {
    hdu.read_key(fptr, key).ok()
}
