mod common;

use approx::assert_relative_eq;
use ndarray::Array2;
use tempfile::TempDir;

use isr_core::classify::FrameSet;
use isr_core::error::IsrError;
use isr_core::frame::FrameRole;
use isr_core::master::{
    build_master_bias, build_master_dark, build_master_flat, CentralRegion,
};

use common::{const_frame, write_const, write_frame, write_scenario};

fn scenario_set(dir: &TempDir) -> FrameSet {
    write_scenario(dir.path());
    FrameSet::from_dirs(&[dir.path()]).unwrap()
}

#[test]
fn test_master_bias_is_per_pixel_median() {
    let dir = TempDir::new().unwrap();
    let set = scenario_set(&dir);

    let bias = build_master_bias(&set).unwrap();
    assert_eq!(bias.role, FrameRole::Bias);
    assert!(bias.data.iter().all(|&v| v == 11.0));
}

#[test]
fn test_master_bias_requires_frames() {
    let dir = TempDir::new().unwrap();
    write_const(
        dir.path(),
        "light.fit",
        FrameRole::Light,
        100.0,
        Some(60.0),
        Some("V"),
    );
    let set = FrameSet::from_dirs(&[dir.path()]).unwrap();

    let err = build_master_bias(&set).unwrap_err();
    assert!(matches!(
        err,
        IsrError::MissingFrames {
            role: FrameRole::Bias,
            filter: None
        }
    ));
}

#[test]
fn test_master_dark_rate_median_at_reference_exposure() {
    let dir = TempDir::new().unwrap();
    let set = scenario_set(&dir);

    let bias = build_master_bias(&set).unwrap();
    let dark = build_master_dark(&set, &bias).unwrap();

    // Darks of 16 and 18 ADU over bias 11 at 30 s: rates 5/30 and 7/30,
    // median rate 0.2, stored back at the 30 s reference exposure.
    assert_eq!(dark.role, FrameRole::Dark);
    assert_eq!(dark.exposure_s, Some(30.0));
    for &v in dark.data.iter() {
        assert_relative_eq!(v, 6.0, epsilon = 1e-12);
    }
}

#[test]
fn test_master_dark_mixed_exposures_use_rates() {
    let dir = TempDir::new().unwrap();
    write_const(dir.path(), "bias.fit", FrameRole::Bias, 0.0, None, None);
    // Same 0.5 ADU/s rate captured at different exposures.
    write_const(dir.path(), "dark1.fit", FrameRole::Dark, 5.0, Some(10.0), None);
    write_const(dir.path(), "dark2.fit", FrameRole::Dark, 10.0, Some(20.0), None);
    write_const(dir.path(), "dark3.fit", FrameRole::Dark, 20.0, Some(40.0), None);
    write_const(
        dir.path(),
        "light.fit",
        FrameRole::Light,
        100.0,
        Some(60.0),
        Some("V"),
    );

    let set = FrameSet::from_dirs(&[dir.path()]).unwrap();
    let bias = build_master_bias(&set).unwrap();
    let dark = build_master_dark(&set, &bias).unwrap();

    // Reference is the first dark's exposure (10 s), rate is 0.5 ADU/s.
    assert_eq!(dark.exposure_s, Some(10.0));
    for &v in dark.data.iter() {
        assert_relative_eq!(v, 5.0, epsilon = 1e-12);
    }
}

#[test]
fn test_master_dark_requires_frames() {
    let dir = TempDir::new().unwrap();
    write_const(dir.path(), "bias.fit", FrameRole::Bias, 10.0, None, None);
    let set = FrameSet::from_dirs(&[dir.path()]).unwrap();

    let bias = build_master_bias(&set).unwrap();
    let err = build_master_dark(&set, &bias).unwrap_err();
    assert!(matches!(
        err,
        IsrError::MissingFrames {
            role: FrameRole::Dark,
            filter: None
        }
    ));
}

#[test]
fn test_master_flat_normalizes_to_unit_central_mean() {
    let dir = TempDir::new().unwrap();
    let set = scenario_set(&dir);

    let bias = build_master_bias(&set).unwrap();
    let flat = build_master_flat(&set, "V", &bias, CentralRegion::default()).unwrap();

    assert_eq!(flat.role, FrameRole::Flat);
    assert_eq!(flat.filter.as_deref(), Some("V"));
    for &v in flat.data.iter() {
        assert_relative_eq!(v, 1.0, epsilon = 1e-12);
    }
}

#[test]
fn test_flats_of_varying_illumination_combine_identically() {
    // The same sensitivity pattern exposed at three illumination levels
    // must normalize to the same master flat as a single exposure.
    let dir = TempDir::new().unwrap();
    write_const(dir.path(), "bias.fit", FrameRole::Bias, 0.0, None, None);

    let pattern = Array2::from_shape_fn((8, 8), |(r, c)| 1.0 + 0.01 * (r as f64 + c as f64));
    for (i, scale) in [500.0, 1000.0, 2000.0].iter().enumerate() {
        write_frame(
            &dir.path().join(format!("flat{i}.fit")),
            FrameRole::Flat,
            pattern.mapv(|v| v * scale),
            None,
            Some("V"),
        );
    }
    write_const(
        dir.path(),
        "light.fit",
        FrameRole::Light,
        100.0,
        Some(60.0),
        Some("V"),
    );

    let set = FrameSet::from_dirs(&[dir.path()]).unwrap();
    let bias = build_master_bias(&set).unwrap();
    let region = CentralRegion::default();
    let flat = build_master_flat(&set, "V", &bias, region).unwrap();

    // Central-region mean of the combined flat is 1.0 by construction.
    assert_relative_eq!(region.mean_of(&flat.data), 1.0, epsilon = 1e-12);

    // And the normalized shape matches the single-frame normalization.
    let mut single = pattern.clone();
    let scale = region.mean_of(&single);
    single /= scale;
    for (&a, &b) in flat.data.iter().zip(single.iter()) {
        assert_relative_eq!(a, b, epsilon = 1e-12);
    }
}

#[test]
fn test_master_flat_missing_filter_is_fatal_for_that_filter() {
    let dir = TempDir::new().unwrap();
    let set = scenario_set(&dir);

    let bias = build_master_bias(&set).unwrap();
    let err = build_master_flat(&set, "B", &bias, CentralRegion::default()).unwrap_err();
    match err {
        IsrError::MissingFrames { role, filter } => {
            assert_eq!(role, FrameRole::Flat);
            assert_eq!(filter.as_deref(), Some("B"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_master_flat_zero_region_is_an_error() {
    let dir = TempDir::new().unwrap();
    write_const(dir.path(), "bias.fit", FrameRole::Bias, 10.0, None, None);
    // Flat identical to the bias level: nothing left after subtraction.
    write_const(dir.path(), "flat.fit", FrameRole::Flat, 10.0, None, Some("V"));

    let set = FrameSet::from_dirs(&[dir.path()]).unwrap();
    let bias = build_master_bias(&set).unwrap();
    let err = build_master_flat(&set, "V", &bias, CentralRegion::default()).unwrap_err();
    assert!(matches!(err, IsrError::ZeroNormalization(_)));
}

#[test]
fn test_dimension_mismatch_is_an_error() {
    let dir = TempDir::new().unwrap();
    write_const(dir.path(), "bias.fit", FrameRole::Bias, 10.0, None, None);
    write_frame(
        &dir.path().join("dark.fit"),
        FrameRole::Dark,
        Array2::from_elem((4, 4), 16.0),
        Some(30.0),
        None,
    );

    let set = FrameSet::from_dirs(&[dir.path()]).unwrap();
    let bias = build_master_bias(&set).unwrap();
    assert!(matches!(
        build_master_dark(&set, &bias),
        Err(IsrError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_bias_outlier_pixel_rejected_exactly() {
    let dir = TempDir::new().unwrap();
    let mut hot = const_frame(10.0);
    hot[[3, 3]] = 9999.0;
    write_frame(&dir.path().join("b1.fit"), FrameRole::Bias, hot, None, None);
    write_const(dir.path(), "b2.fit", FrameRole::Bias, 10.0, None, None);
    write_const(dir.path(), "b3.fit", FrameRole::Bias, 10.0, None, None);

    let set = FrameSet::from_dirs(&[dir.path()]).unwrap();
    let bias = build_master_bias(&set).unwrap();
    assert_eq!(bias.data[[3, 3]], 10.0);
}
