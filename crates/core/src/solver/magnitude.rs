//! Flow magnitude field

use super::jacobi::FLOW_CHANNELS;
use super::scheduler::RowBandScheduler;
use crate::buffer::FloatBuffer;
use crate::error::{FlowError, FlowResult};
use nalgebra::Vector2;

/// Compute `sqrt(u² + v²)` for every cell of a 2-channel vector field
///
/// # Errors
///
/// `InvalidArgument` if `flow` does not have exactly two channels.
pub fn magnitude_field<S>(flow: &FloatBuffer<S>, scheduler: &RowBandScheduler) -> FlowResult<FloatBuffer>
where
    S: AsRef<[f32]> + Sync,
{
    if flow.channels() != FLOW_CHANNELS {
        return Err(FlowError::invalid_argument(
            "flow",
            format!(
                "expected {FLOW_CHANNELS} channels, got {}",
                flow.channels()
            ),
        ));
    }

    let bounds = flow.bounds();
    let mut magnitude = FloatBuffer::new(bounds, 1)?;
    scheduler.run(&mut magnitude, bounds.min_y..bounds.max_y, |band| {
        for y in band.rows() {
            let vectors = flow.row_slice(y).chunks_exact(FLOW_CHANNELS);
            for (m, uv) in band.row_mut(y).iter_mut().zip(vectors) {
                *m = Vector2::new(uv[0], uv[1]).norm();
            }
        }
    });
    Ok(magnitude)
}
