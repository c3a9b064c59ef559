//! Jacobi relaxation sweep for the Horn–Schunck flow field
//!
//! # Discretization
//!
//! For each cell `(i, j)` of the flow field, with `help = 1 / alpha`, the
//! neighbor sums `uSum`, `vSum` over the in-bounds 4-neighborhood of the previous
//! iterate, neighbor count `nn`, and the previous value `(u_old, v_old)` at the cell:
//!
//! ```text
//! u = (uSum - help * Fx * (Fy * v_old + Fz)) / (nn + help * Fx²)
//! v = (vSum - help * Fy * (Fx * u_old + Fz)) / (nn + help * Fy²)
//! ```
//!
//! Neighbors outside the flow field's bounds are simply absent (`nn` drops to 3 on
//! an edge and 2 in a corner); there is no wraparound.
//!
//! # Read/write separation
//!
//! Every read comes from `previous` and every write goes to `current`. Workers
//! therefore never observe a value another worker is writing during the same
//! sweep, which is what makes the row-band split safe and bit-deterministic.

use super::derivatives::{DERIVATIVE_CHANNELS, FX, FY, FZ};
use super::scheduler::RowBandScheduler;
use crate::buffer::FloatBuffer;
use crate::error::{FlowError, FlowResult};

/// Channels of a flow field: `(u, v)`
pub const FLOW_CHANNELS: usize = 2;

/// Run one relaxation sweep over `current`'s bounds
///
/// # Arguments
///
/// * `alpha` - Smoothness weight (> 0, validated by the caller)
/// * `derivs` - 3-channel derivative field covering at least `current`'s bounds
/// * `previous` - Previous 2-channel iterate, same bounds as `current`
/// * `current` - 2-channel iterate being written
/// * `scheduler` - Row-band scheduler for the parallel sweep
///
/// # Errors
///
/// `InvalidArgument` if a field has the wrong channel count, `previous` and
/// `current` differ in bounds, or `derivs` does not cover them. Nothing is written
/// in that case. An empty `current` is a no-op.
pub fn relax_sweep(
    alpha: f32,
    derivs: &FloatBuffer,
    previous: &FloatBuffer,
    current: &mut FloatBuffer,
    scheduler: &RowBandScheduler,
) -> FlowResult<()> {
    let bounds = current.bounds();
    if bounds.is_empty() {
        return Ok(());
    }
    for (name, channels, expected) in [
        ("derivs", derivs.channels(), DERIVATIVE_CHANNELS),
        ("previous", previous.channels(), FLOW_CHANNELS),
        ("current", current.channels(), FLOW_CHANNELS),
    ] {
        if channels != expected {
            return Err(FlowError::invalid_argument(
                name,
                format!("expected {expected} channels, got {channels}"),
            ));
        }
    }
    if previous.bounds() != bounds {
        return Err(FlowError::invalid_argument(
            "previous",
            format!(
                "bounds {} do not match current bounds {bounds}",
                previous.bounds()
            ),
        ));
    }
    if derivs.bounds().intersect(&bounds) != bounds {
        return Err(FlowError::invalid_argument(
            "derivs",
            format!(
                "bounds {} do not cover flow bounds {bounds}",
                derivs.bounds()
            ),
        ));
    }

    let help = 1.0 / alpha;
    let width = bounds.width().max(0) as usize;
    let d_offset = (bounds.min_x - derivs.bounds().min_x) as usize * DERIVATIVE_CHANNELS;

    scheduler.run(current, bounds.min_y..bounds.max_y, |band| {
        for y in band.rows() {
            let prev = previous.row_slice(y);
            let above = (y > bounds.min_y).then(|| previous.row_slice(y - 1));
            let below = (y < bounds.max_y - 1).then(|| previous.row_slice(y + 1));
            let d_row = &derivs.row_slice(y)[d_offset..];
            let out = band.row_mut(y);

            for i in 0..width {
                let mut nn = 0_u8;
                let mut u_sum = 0.0_f32;
                let mut v_sum = 0.0_f32;

                if i > 0 {
                    nn += 1;
                    u_sum += prev[2 * (i - 1)];
                    v_sum += prev[2 * (i - 1) + 1];
                }
                if i + 1 < width {
                    nn += 1;
                    u_sum += prev[2 * (i + 1)];
                    v_sum += prev[2 * (i + 1) + 1];
                }
                if let Some(row) = above {
                    nn += 1;
                    u_sum += row[2 * i];
                    v_sum += row[2 * i + 1];
                }
                if let Some(row) = below {
                    nn += 1;
                    u_sum += row[2 * i];
                    v_sum += row[2 * i + 1];
                }

                let d = &d_row[i * DERIVATIVE_CHANNELS..(i + 1) * DERIVATIVE_CHANNELS];
                let (fx, fy, fz) = (d[FX], d[FY], d[FZ]);
                let (u_old, v_old) = (prev[2 * i], prev[2 * i + 1]);
                let nn = f32::from(nn);

                u_sum -= help * fx * (fy * v_old + fz);
                u_sum /= nn + help * fx * fx;
                v_sum -= help * fy * (fx * u_old + fz);
                v_sum /= nn + help * fy * fy;

                out[2 * i] = u_sum;
                out[2 * i + 1] = v_sum;
            }
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Rect;
    use approx::assert_relative_eq;

    fn derivs_with(bounds: Rect, fx: f32, fy: f32, fz: f32) -> FloatBuffer {
        let mut derivs = FloatBuffer::new(bounds.outset(1), DERIVATIVE_CHANNELS).unwrap();
        for y in bounds.min_y..bounds.max_y {
            for x in bounds.min_x..bounds.max_x {
                derivs.cell_mut(x, y).unwrap().copy_from_slice(&[fx, fy, fz]);
            }
        }
        derivs
    }

    #[test]
    fn test_zero_data_term_is_fixed_point() {
        let bounds = Rect::from_size(5, 4);
        let derivs = derivs_with(bounds, 3.0, -2.0, 0.0);
        let previous = FloatBuffer::new(bounds, FLOW_CHANNELS).unwrap();
        let mut current = FloatBuffer::with_value(bounds, FLOW_CHANNELS, 7.0).unwrap();

        relax_sweep(100.0, &derivs, &previous, &mut current, &RowBandScheduler::default()).unwrap();
        assert!(current.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_single_cell_update_matches_formula() {
        let bounds = Rect::from_size(3, 3);
        let (fx, fy, fz) = (2.0_f32, 1.0_f32, -4.0_f32);
        let derivs = derivs_with(bounds, fx, fy, fz);
        let mut previous = FloatBuffer::new(bounds, FLOW_CHANNELS).unwrap();
        for y in 0..3 {
            for x in 0..3 {
                previous
                    .cell_mut(x, y)
                    .unwrap()
                    .copy_from_slice(&[x as f32, y as f32]);
            }
        }
        let mut current = FloatBuffer::new(bounds, FLOW_CHANNELS).unwrap();
        let alpha = 10.0_f32;
        relax_sweep(alpha, &derivs, &previous, &mut current, &RowBandScheduler::default()).unwrap();

        let help = 1.0 / alpha;

        // Centre: 4 neighbours, u sums to 1+1+0+2 = 4, v sums to 1+1+0+2 = 4
        let (u_old, v_old) = (1.0_f32, 1.0_f32);
        let u = (4.0 - help * fx * (fy * v_old + fz)) / (4.0 + help * fx * fx);
        let v = (4.0 - help * fy * (fx * u_old + fz)) / (4.0 + help * fy * fy);
        assert_relative_eq!(current.value(1, 1, 0).unwrap(), u, epsilon = 1e-6);
        assert_relative_eq!(current.value(1, 1, 1).unwrap(), v, epsilon = 1e-6);

        // Corner (0, 0): 2 neighbours, (1, 0) and (0, 1)
        let u = (1.0 - help * fx * fz) / (2.0 + help * fx * fx);
        let v = (1.0 - help * fy * fz) / (2.0 + help * fy * fy);
        assert_relative_eq!(current.value(0, 0, 0).unwrap(), u, epsilon = 1e-6);
        assert_relative_eq!(current.value(0, 0, 1).unwrap(), v, epsilon = 1e-6);
    }

    #[test]
    fn test_sweep_is_independent_of_band_size() {
        let bounds = Rect::new(-2, 3, 9, 14);
        let mut derivs = FloatBuffer::new(bounds.outset(1), DERIVATIVE_CHANNELS).unwrap();
        let mut previous = FloatBuffer::new(bounds, FLOW_CHANNELS).unwrap();
        for y in bounds.min_y..bounds.max_y {
            for x in bounds.min_x..bounds.max_x {
                let s = (x * 31 + y * 17) as f32;
                derivs
                    .cell_mut(x, y)
                    .unwrap()
                    .copy_from_slice(&[s.sin(), s.cos(), (0.3 * s).sin()]);
                previous
                    .cell_mut(x, y)
                    .unwrap()
                    .copy_from_slice(&[0.1 * s.cos(), -0.1 * s.sin()]);
            }
        }

        let mut reference = FloatBuffer::new(bounds, FLOW_CHANNELS).unwrap();
        relax_sweep(5.0, &derivs, &previous, &mut reference, &RowBandScheduler::default()).unwrap();

        for rows_per_band in [2, 4, 1000] {
            let mut current = FloatBuffer::new(bounds, FLOW_CHANNELS).unwrap();
            let scheduler = RowBandScheduler::new(rows_per_band).unwrap();
            relax_sweep(5.0, &derivs, &previous, &mut current, &scheduler).unwrap();
            assert_eq!(current, reference, "rows_per_band = {rows_per_band}");
        }
    }

    #[test]
    fn test_sweep_rejects_wrong_channel_counts() {
        let bounds = Rect::from_size(3, 3);
        let scheduler = RowBandScheduler::default();
        let derivs = derivs_with(bounds, 1.0, 1.0, 1.0);
        let flow = FloatBuffer::new(bounds, FLOW_CHANNELS).unwrap();
        let gray = FloatBuffer::new(bounds, 1).unwrap();
        let gray_derivs = FloatBuffer::new(bounds.outset(1), 1).unwrap();

        let mut current = flow.clone();
        assert!(matches!(
            relax_sweep(1.0, &gray_derivs, &flow, &mut current, &scheduler),
            Err(FlowError::InvalidArgument { name: "derivs", .. })
        ));
        assert!(matches!(
            relax_sweep(1.0, &derivs, &gray, &mut current, &scheduler),
            Err(FlowError::InvalidArgument { name: "previous", .. })
        ));
        let mut gray_current = gray.clone();
        assert!(matches!(
            relax_sweep(1.0, &derivs, &flow, &mut gray_current, &scheduler),
            Err(FlowError::InvalidArgument { name: "current", .. })
        ));
    }

    #[test]
    fn test_sweep_rejects_mismatched_iterates() {
        let scheduler = RowBandScheduler::default();
        let derivs = derivs_with(Rect::from_size(4, 3), 1.0, 1.0, 1.0);
        let previous = FloatBuffer::new(Rect::from_size(4, 3), FLOW_CHANNELS).unwrap();
        let mut current = FloatBuffer::with_value(Rect::from_size(3, 3), FLOW_CHANNELS, 5.0).unwrap();
        assert!(matches!(
            relax_sweep(1.0, &derivs, &previous, &mut current, &scheduler),
            Err(FlowError::InvalidArgument { name: "previous", .. })
        ));
        assert!(current.as_slice().iter().all(|&v| v == 5.0));
    }

    #[test]
    fn test_sweep_rejects_uncovered_flow() {
        let scheduler = RowBandScheduler::default();
        let derivs = FloatBuffer::new(Rect::from_size(3, 3), DERIVATIVE_CHANNELS).unwrap();
        let bounds = Rect::new(1, 1, 5, 5);
        let previous = FloatBuffer::new(bounds, FLOW_CHANNELS).unwrap();
        let mut current = FloatBuffer::new(bounds, FLOW_CHANNELS).unwrap();
        assert!(matches!(
            relax_sweep(1.0, &derivs, &previous, &mut current, &scheduler),
            Err(FlowError::InvalidArgument { name: "derivs", .. })
        ));
    }

    #[test]
    fn test_sweep_over_empty_flow_is_noop() {
        let empty = Rect::new(7, 7, 7, 9);
        let derivs = FloatBuffer::new(Rect::from_size(2, 2), DERIVATIVE_CHANNELS).unwrap();
        let previous = FloatBuffer::new(empty, FLOW_CHANNELS).unwrap();
        let mut current = FloatBuffer::new(empty, FLOW_CHANNELS).unwrap();
        let scheduler = RowBandScheduler::default();
        assert!(relax_sweep(1.0, &derivs, &previous, &mut current, &scheduler).is_ok());
    }
}
