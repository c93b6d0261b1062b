#![allow(dead_code)]

use std::path::{Path, PathBuf};

use ndarray::Array2;

use isr_core::frame::{FrameRole, MasterFrame};
use isr_core::io;

/// Write a synthetic raw frame with the headers of the given role.
///
/// Raw fixtures use the same on-disk representation as master frames
/// (f64 pixels plus IMAGETYP/EXPTIME/FILTER headers), which is exactly what
/// the classifier and builders read back.
pub fn write_frame(
    path: &Path,
    role: FrameRole,
    data: Array2<f64>,
    exposure_s: Option<f64>,
    filter: Option<&str>,
) {
    let frame = MasterFrame {
        data,
        role,
        exposure_s,
        filter: filter.map(str::to_string),
    };
    io::write_master(path, &frame).expect("write fixture frame");
}

/// Constant-valued frame of the default fixture size.
pub fn const_frame(value: f64) -> Array2<f64> {
    Array2::from_elem((8, 8), value)
}

/// Write a constant-valued frame into `dir` and return its path.
pub fn write_const(
    dir: &Path,
    name: &str,
    role: FrameRole,
    value: f64,
    exposure_s: Option<f64>,
    filter: Option<&str>,
) -> PathBuf {
    let path = dir.join(name);
    write_frame(&path, role, const_frame(value), exposure_s, filter);
    path
}

/// Write a frame whose IMAGETYP is an arbitrary string, bypassing the role
/// enum. Used to exercise the unrecognized-tag path.
pub fn write_with_imagetyp(path: &Path, imagetyp: &str) {
    let mut fptr = fitsio::FitsFile::create(path)
        .overwrite()
        .with_custom_primary(&fitsio::images::ImageDescription {
            data_type: fitsio::images::ImageType::Double,
            dimensions: &[8, 8],
        })
        .open()
        .expect("create fixture");
    let hdu = fptr.primary_hdu().expect("primary hdu");
    hdu.write_image(&mut fptr, &vec![0.0f64; 64]).expect("write pixels");
    hdu.write_key(&mut fptr, "IMAGETYP", imagetyp.to_string())
        .expect("write IMAGETYP");
}

/// Populate a raw-frame directory with the worked calibration scenario:
/// biases 10/12/11, two 30 s darks at 16/18 ADU, one V flat at 13 ADU, and
/// one 60 s V light at 122 ADU.
///
/// With these inputs the master bias is 11, the master dark is 6 ADU at a
/// 30 s reference, the V master flat is 1.0, and the calibrated light is 99.
pub fn write_scenario(dir: &Path) {
    write_const(dir, "bias1.fit", FrameRole::Bias, 10.0, None, None);
    write_const(dir, "bias2.fit", FrameRole::Bias, 12.0, None, None);
    write_const(dir, "bias3.fit", FrameRole::Bias, 11.0, None, None);

    write_const(dir, "dark1.fit", FrameRole::Dark, 16.0, Some(30.0), None);
    write_const(dir, "dark2.fit", FrameRole::Dark, 18.0, Some(30.0), None);

    write_const(dir, "flat_v.fit", FrameRole::Flat, 13.0, None, Some("V"));

    write_const(dir, "light_v.fit", FrameRole::Light, 122.0, Some(60.0), Some("V"));
}
