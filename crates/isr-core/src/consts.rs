use std::time::Duration;

/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Full-well capacity of a 16-bit detector in ADU.
pub const FULL_WELL_ADU: f64 = 65_535.0;

/// Safety margin applied to the computed saturation level, keeping the
/// reported limit below the onset of detector nonlinearity.
pub const SATURATION_MARGIN: f64 = 0.97;

/// Default fractional margin of the detector excluded on each side when
/// measuring the flat-field normalization region (0.25 keeps the central
/// half in both axes, away from vignetted edges).
pub const CENTRAL_REGION_MARGIN: f64 = 0.25;

/// Fixed interval between job-status polls against the remote solver.
pub const SOLVER_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Request timeout for individual solver HTTP calls.
pub const SOLVER_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
