pub mod mean;
pub mod median;

use ndarray::Array2;

use crate::error::{IsrError, Result};

/// Streaming reduction of a frame stack into a single combined frame.
///
/// Call sites feed frames one at a time and never hold the whole stack
/// themselves, so an incremental or out-of-core implementation can replace
/// the in-memory ones without touching callers.
pub trait StackReducer {
    /// Add one frame to the stack. Frames must share dimensions.
    fn push(&mut self, frame: Array2<f64>) -> Result<()>;

    /// Number of frames accumulated so far.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Combine the accumulated stack. Fails on an empty stack.
    fn finish(self) -> Result<Array2<f64>>;
}

/// In-memory per-pixel median reducer.
#[derive(Debug, Default)]
pub struct MedianReducer {
    frames: Vec<Array2<f64>>,
}

impl StackReducer for MedianReducer {
    fn push(&mut self, frame: Array2<f64>) -> Result<()> {
        check_dims(&self.frames, &frame)?;
        self.frames.push(frame);
        Ok(())
    }

    fn len(&self) -> usize {
        self.frames.len()
    }

    fn finish(self) -> Result<Array2<f64>> {
        median::median_stack(&self.frames)
    }
}

/// In-memory per-pixel mean reducer. Keeps only a running sum.
#[derive(Debug, Default)]
pub struct MeanReducer {
    sum: Option<Array2<f64>>,
    count: usize,
}

impl StackReducer for MeanReducer {
    fn push(&mut self, frame: Array2<f64>) -> Result<()> {
        match self.sum.as_mut() {
            None => self.sum = Some(frame),
            Some(sum) => {
                if sum.dim() != frame.dim() {
                    return Err(IsrError::DimensionMismatch {
                        expected: sum.dim(),
                        actual: frame.dim(),
                    });
                }
                *sum += &frame;
            }
        }
        self.count += 1;
        Ok(())
    }

    fn len(&self) -> usize {
        self.count
    }

    fn finish(self) -> Result<Array2<f64>> {
        let mut sum = self.sum.ok_or(IsrError::EmptyStack)?;
        sum /= self.count as f64;
        Ok(sum)
    }
}

fn check_dims(frames: &[Array2<f64>], frame: &Array2<f64>) -> Result<()> {
    if let Some(first) = frames.first() {
        if first.dim() != frame.dim() {
            return Err(IsrError::DimensionMismatch {
                expected: first.dim(),
                actual: frame.dim(),
            });
        }
    }
    Ok(())
}
