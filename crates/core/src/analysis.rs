//! Field statistics
//!
//! Summaries used to report on input frames and solved flow fields. All
//! accumulation happens in `f64` so large frames do not lose precision.

use crate::buffer::FloatBuffer;
use crate::error::{FlowError, FlowResult};
use crate::solver::FLOW_CHANNELS;
use nalgebra::Vector2;
use serde::Serialize;

/// Min, max, mean and population variance of one channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FieldStats {
    /// Smallest value seen
    pub min: f64,
    /// Largest value seen
    pub max: f64,
    /// Arithmetic mean over all cells
    pub mean: f64,
    /// Population variance (divides by the cell count, not count - 1)
    pub variance: f64,
}

impl FieldStats {
    /// Statistics of `channel` over every cell of `buffer`
    ///
    /// Pass `buffer.interior()` to exclude a mirrored border. An empty buffer gives
    /// all zeros.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `channel` is not a channel of a non-empty `buffer`.
    pub fn of_channel<S: AsRef<[f32]>>(buffer: &FloatBuffer<S>, channel: usize) -> FlowResult<Self> {
        if buffer.bounds().is_empty() {
            return Ok(Self::default());
        }
        if channel >= buffer.channels() {
            return Err(FlowError::invalid_argument(
                "channel",
                format!(
                    "channel {channel} out of range for {} channels",
                    buffer.channels()
                ),
            ));
        }

        let count = buffer.bounds().area() as f64;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for cell in buffer.cells() {
            let v = f64::from(cell[channel]);
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }
        let mean = sum / count;
        let variance = buffer
            .cells()
            .map(|cell| {
                let d = f64::from(cell[channel]) - mean;
                d * d
            })
            .sum::<f64>()
            / count;

        Ok(Self {
            min,
            max,
            mean,
            variance,
        })
    }

    /// Population standard deviation
    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }
}

/// Average `(u, v)` vector of a flow field
///
/// An empty field gives the zero vector.
///
/// # Errors
///
/// `InvalidArgument` if `flow` does not have two channels.
pub fn mean_flow<S: AsRef<[f32]>>(flow: &FloatBuffer<S>) -> FlowResult<Vector2<f32>> {
    if flow.bounds().is_empty() {
        return Ok(Vector2::zeros());
    }
    if flow.channels() != FLOW_CHANNELS {
        return Err(FlowError::invalid_argument(
            "flow",
            format!(
                "expected {FLOW_CHANNELS} channels, got {}",
                flow.channels()
            ),
        ));
    }

    let sum = flow.cells().fold(Vector2::<f64>::zeros(), |acc, uv| {
        acc + Vector2::new(f64::from(uv[0]), f64::from(uv[1]))
    });
    let mean = sum / flow.bounds().area() as f64;
    Ok(Vector2::new(mean.x as f32, mean.y as f32))
}

/// Number of NaN or infinite values across every channel of `buffer`
pub fn count_non_finite<S: AsRef<[f32]>>(buffer: &FloatBuffer<S>) -> usize {
    buffer
        .cells()
        .flatten()
        .filter(|v| !v.is_finite())
        .count()
}
