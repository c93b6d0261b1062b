use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{IsrError, Result};

/// Stack frames by computing the median at each pixel position.
///
/// Uses `select_nth_unstable` for O(n) median without full sort.
/// Parallelizes at the row level for images >= 256x256.
pub fn median_stack(frames: &[Array2<f64>]) -> Result<Array2<f64>> {
    if frames.is_empty() {
        return Err(IsrError::EmptyStack);
    }

    let (h, w) = frames[0].dim();
    let n = frames.len();

    if h * w >= PARALLEL_PIXEL_THRESHOLD && n > 1 {
        // Row-parallel: each row allocates its own pixel_values
        let rows: Vec<Vec<f64>> = (0..h)
            .into_par_iter()
            .map(|row| {
                let mut pixel_values = vec![0.0f64; n];
                let mut row_result = vec![0.0f64; w];
                for (col, result) in row_result.iter_mut().enumerate() {
                    for (i, frame) in frames.iter().enumerate() {
                        pixel_values[i] = frame[[row, col]];
                    }
                    *result = compute_median(&mut pixel_values, n);
                }
                row_result
            })
            .collect();

        let mut result = Array2::<f64>::zeros((h, w));
        for (row, row_data) in rows.into_iter().enumerate() {
            for (col, val) in row_data.into_iter().enumerate() {
                result[[row, col]] = val;
            }
        }
        Ok(result)
    } else {
        // Sequential for small images
        let mut result = Array2::<f64>::zeros((h, w));
        let mut pixel_values = vec![0.0f64; n];

        for row in 0..h {
            for col in 0..w {
                for (i, frame) in frames.iter().enumerate() {
                    pixel_values[i] = frame[[row, col]];
                }
                result[[row, col]] = compute_median(&mut pixel_values, n);
            }
        }
        Ok(result)
    }
}

fn compute_median(pixel_values: &mut [f64], n: usize) -> f64 {
    if n == 1 {
        pixel_values[0]
    } else if n % 2 == 1 {
        let mid = n / 2;
        *pixel_values
            .select_nth_unstable_by(mid, |a, b| a.total_cmp(b))
            .1
    } else {
        let mid = n / 2;
        pixel_values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
        pixel_values[..mid].select_nth_unstable_by(mid - 1, |a, b| a.total_cmp(b));
        (pixel_values[mid - 1] + pixel_values[mid]) / 2.0
    }
}

/// Median of a flat slice of values, used for scalar frame statistics.
pub fn median_of(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(IsrError::EmptyStack);
    }
    let mut sorted = values.to_vec();
    Ok(compute_median(&mut sorted, sorted.len()))
}
