//! Spatiotemporal derivative field
//!
//! Computes the Horn–Schunck derivatives of two frames on a unit grid
//! (`hx = hy = 1`):
//!
//! ```text
//! Fx = (f1[i+1,j] - f1[i-1,j] + f2[i+1,j] - f2[i-1,j]) / (4 hx)
//! Fy = (f1[i,j+1] - f1[i,j-1] + f2[i,j+1] - f2[i,j-1]) / (4 hy)
//! Fz = f2[i,j] - f1[i,j]
//! ```
//!
//! i.e. the central-difference spatial gradient averaged over both frames, and the
//! forward temporal difference. The stencil reads one cell past every interior
//! cell, so both frames must carry a mirrored border. Border cells of the result
//! are never written and stay zero.

use super::scheduler::RowBandScheduler;
use crate::buffer::FloatBuffer;
use crate::error::{FlowError, FlowResult};

/// Channel holding the x derivative
pub const FX: usize = 0;
/// Channel holding the y derivative
pub const FY: usize = 1;
/// Channel holding the temporal derivative
pub const FZ: usize = 2;
/// Channels of a derivative field
pub const DERIVATIVE_CHANNELS: usize = 3;

/// Grid spacing in x
const HX: f32 = 1.0;
/// Grid spacing in y
const HY: f32 = 1.0;

/// Compute the `(Fx, Fy, Fz)` field of two bordered single-channel frames
///
/// # Arguments
///
/// * `f1` - First frame, mirrored border applied
/// * `f2` - Second frame, same bounds as `f1`, mirrored border applied
/// * `scheduler` - Row-band scheduler for the parallel pass
///
/// # Returns
///
/// A 3-channel buffer over the same bounds as the inputs
///
/// # Errors
///
/// `InvalidArgument` if the frames differ in bounds or are not single-channel.
pub fn derive_mixed<A, B>(
    f1: &FloatBuffer<A>,
    f2: &FloatBuffer<B>,
    scheduler: &RowBandScheduler,
) -> FlowResult<FloatBuffer>
where
    A: AsRef<[f32]> + Sync,
    B: AsRef<[f32]> + Sync,
{
    if f1.bounds() != f2.bounds() {
        return Err(FlowError::invalid_argument(
            "f2",
            format!(
                "bounds {} do not match first frame bounds {}",
                f2.bounds(),
                f1.bounds()
            ),
        ));
    }
    for (name, channels) in [("f1", f1.channels()), ("f2", f2.channels())] {
        if channels != 1 {
            return Err(FlowError::invalid_argument(
                name,
                format!("expected a single-channel frame, got {channels} channels"),
            ));
        }
    }

    let bounds = f1.bounds();
    let mut derivs = FloatBuffer::new(bounds, DERIVATIVE_CHANNELS)?;
    if bounds.width() < 3 {
        return Ok(derivs);
    }
    let width = bounds.width() as usize;

    scheduler.run(&mut derivs, bounds.min_y + 1..bounds.max_y - 1, |band| {
        for y in band.rows() {
            let (up1, row1, down1) = (f1.row_slice(y - 1), f1.row_slice(y), f1.row_slice(y + 1));
            let (up2, row2, down2) = (f2.row_slice(y - 1), f2.row_slice(y), f2.row_slice(y + 1));
            let out = band.row_mut(y);

            for i in 1..width - 1 {
                let fx = (row1[i + 1] - row1[i - 1] + row2[i + 1] - row2[i - 1]) / (4.0 * HX);
                let fy = (down1[i] - up1[i] + down2[i] - up2[i]) / (4.0 * HY);
                let fz = row2[i] - row1[i];

                let cell = &mut out[i * DERIVATIVE_CHANNELS..(i + 1) * DERIVATIVE_CHANNELS];
                cell[FX] = fx;
                cell[FY] = fy;
                cell[FZ] = fz;
            }
        }
    });

    Ok(derivs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Rect;
    use approx::assert_relative_eq;

    /// Bordered frame sampled from `f(x, y)` over a `w x h` interior
    fn frame(w: i32, h: i32, f: impl Fn(i32, i32) -> f32) -> FloatBuffer {
        let mut buffer = FloatBuffer::new(Rect::from_size(w, h).outset(1), 1).unwrap();
        for y in 0..h {
            for x in 0..w {
                buffer.set(x, y, 0, f(x, y)).unwrap();
            }
        }
        buffer.apply_mirror_border();
        buffer
    }

    #[test]
    fn test_linear_ramp_gradient() {
        // f1 = 2x + 3y, f2 = f1 + 5: constant gradient, constant temporal change
        let f1 = frame(6, 5, |x, y| (2 * x + 3 * y) as f32);
        let f2 = frame(6, 5, |x, y| (2 * x + 3 * y) as f32 + 5.0);
        let derivs = derive_mixed(&f1, &f2, &RowBandScheduler::default()).unwrap();

        assert_eq!(derivs.channels(), DERIVATIVE_CHANNELS);
        assert_eq!(derivs.bounds(), f1.bounds());

        // Away from the border the central differences are exact
        for y in 1..4 {
            for x in 1..5 {
                let cell = derivs.cell(x, y).unwrap();
                assert_relative_eq!(cell[FX], 2.0);
                assert_relative_eq!(cell[FY], 3.0);
                assert_relative_eq!(cell[FZ], 5.0);
            }
        }
    }

    #[test]
    fn test_border_cells_stay_zero() {
        let f1 = frame(4, 4, |x, y| (x * y) as f32);
        let f2 = frame(4, 4, |x, y| (x + y) as f32);
        let derivs = derive_mixed(&f1, &f2, &RowBandScheduler::default()).unwrap();
        let b = derivs.bounds();
        for x in b.min_x..b.max_x {
            assert_eq!(derivs.cell(x, b.min_y).unwrap(), &[0.0; 3]);
            assert_eq!(derivs.cell(x, b.max_y - 1).unwrap(), &[0.0; 3]);
        }
        for y in b.min_y..b.max_y {
            assert_eq!(derivs.cell(b.min_x, y).unwrap(), &[0.0; 3]);
            assert_eq!(derivs.cell(b.max_x - 1, y).unwrap(), &[0.0; 3]);
        }
    }

    #[test]
    fn test_mirrored_edge_halves_gradient() {
        // At the left interior edge the mirrored border equals the edge cell, so
        // the x difference spans one cell instead of two.
        let f = frame(4, 3, |x, _| (10 * x) as f32);
        let derivs = derive_mixed(&f, &f, &RowBandScheduler::default()).unwrap();
        assert_relative_eq!(derivs.value(0, 1, FX).unwrap(), 5.0);
        assert_relative_eq!(derivs.value(1, 1, FX).unwrap(), 10.0);
        assert_relative_eq!(derivs.value(1, 1, FZ).unwrap(), 0.0);
    }

    #[test]
    fn test_bounds_mismatch_rejected() {
        let f1 = frame(4, 4, |_, _| 0.0);
        let f2 = frame(5, 4, |_, _| 0.0);
        let err = derive_mixed(&f1, &f2, &RowBandScheduler::default()).unwrap_err();
        assert!(matches!(err, FlowError::InvalidArgument { name: "f2", .. }));
    }

    #[test]
    fn test_multi_channel_frame_rejected() {
        let f1 = FloatBuffer::new(Rect::from_size(4, 4), 2).unwrap();
        let f2 = FloatBuffer::new(Rect::from_size(4, 4), 1).unwrap();
        let err = derive_mixed(&f1, &f2, &RowBandScheduler::default()).unwrap_err();
        assert!(matches!(err, FlowError::InvalidArgument { name: "f1", .. }));
    }
}
