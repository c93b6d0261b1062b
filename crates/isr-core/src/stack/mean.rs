use ndarray::Array2;

use crate::error::{IsrError, Result};

/// Stack frames by computing the mean at each pixel.
pub fn mean_stack(frames: &[Array2<f64>]) -> Result<Array2<f64>> {
    if frames.is_empty() {
        return Err(IsrError::EmptyStack);
    }

    let (h, w) = frames[0].dim();
    let n = frames.len() as f64;

    let mut sum = Array2::<f64>::zeros((h, w));

    for frame in frames {
        sum += frame;
    }

    sum /= n;

    Ok(sum)
}
