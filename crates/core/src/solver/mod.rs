//! Horn–Schunck optical-flow solver
//!
//! This module wires the phases of one solve together:
//!
//! 1. `derivatives` - `(Fx, Fy, Fz)` from the two bordered frames, computed once
//! 2. `jacobi` - fixed-count relaxation of the `(u, v)` field over the interior
//! 3. `magnitude` - `|(u, v)|` per cell, on request
//!
//! Each phase is a fork-join pass over row bands (`scheduler`). Phases are strictly
//! ordered: a sweep starts only after the previous sweep's output has been copied
//! into the "previous" iterate.
//!
//! # Example
//!
//! ```rust,ignore
//! use hornschunck_core::{FlowConfig, HornSchunckSolver};
//!
//! let solver = HornSchunckSolver::new(FlowConfig::default())?;
//! let flow = solver.solve(&frame1, &frame2)?;
//! let magnitude = solver.magnitude(&flow)?;
//! ```

pub mod derivatives;
pub mod jacobi;
pub mod magnitude;
mod params;
mod profiler;
pub mod scheduler;

// Re-exports
pub use derivatives::{derive_mixed, DERIVATIVE_CHANNELS, FX, FY, FZ};
pub use jacobi::{relax_sweep, FLOW_CHANNELS};
pub use magnitude::magnitude_field;
pub use params::{FlowConfig, DEFAULT_ALPHA, DEFAULT_ITERATIONS, DEFAULT_ROWS_PER_BAND};
pub use profiler::ProfilerScope;
pub use scheduler::{RowBand, RowBandScheduler};

use crate::analysis::count_non_finite;
use crate::buffer::FloatBuffer;
use crate::error::{FlowError, FlowResult};
use tracing::{info, trace, warn};

/// Smallest interior extent the relaxation supports. With fewer than two cells
/// along an axis some cell would have no neighbor along it at all.
const MIN_INTERIOR_EXTENT: i32 = 2;

/// Fixed-alpha, fixed-iteration Horn–Schunck solver
///
/// Holds a validated [`FlowConfig`] and the scheduler derived from it. The solver
/// itself is immutable; every call to [`HornSchunckSolver::solve`] allocates its
/// own derivative field and iterates.
#[derive(Debug, Clone, Copy)]
pub struct HornSchunckSolver {
    config: FlowConfig,
    scheduler: RowBandScheduler,
}

impl HornSchunckSolver {
    /// Create a solver for `config`
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `config` fails [`FlowConfig::validate`].
    pub fn new(config: FlowConfig) -> FlowResult<Self> {
        config.validate()?;
        Ok(Self {
            scheduler: config.scheduler()?,
            config,
        })
    }

    /// Configuration this solver was built with
    #[must_use]
    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Scheduler used for every parallel phase
    #[must_use]
    pub fn scheduler(&self) -> &RowBandScheduler {
        &self.scheduler
    }

    /// Compute the flow field between two bordered frames
    ///
    /// # Arguments
    ///
    /// * `f1` - First frame: single channel, mirrored 1-cell border applied
    /// * `f2` - Second frame: same bounds as `f1`, mirrored border applied
    ///
    /// # Returns
    ///
    /// A 2-channel `(u, v)` field over the interior bounds (inputs inset by one cell)
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the frames differ in bounds, are not single-channel, or
    /// have an interior smaller than 2x2.
    pub fn solve<A, B>(&self, f1: &FloatBuffer<A>, f2: &FloatBuffer<B>) -> FlowResult<FloatBuffer>
    where
        A: AsRef<[f32]> + Sync,
        B: AsRef<[f32]> + Sync,
    {
        self.solve_with_observer(f1, f2, |_, _| {})
    }

    /// Same as [`HornSchunckSolver::solve`], calling `observer` after every sweep
    ///
    /// `observer` receives the 1-based iteration number and the iterate just
    /// produced. It runs on the calling thread between sweeps.
    ///
    /// # Errors
    ///
    /// Same as [`HornSchunckSolver::solve`].
    pub fn solve_with_observer<A, B, O>(
        &self,
        f1: &FloatBuffer<A>,
        f2: &FloatBuffer<B>,
        mut observer: O,
    ) -> FlowResult<FloatBuffer>
    where
        A: AsRef<[f32]> + Sync,
        B: AsRef<[f32]> + Sync,
        O: FnMut(usize, &FloatBuffer),
    {
        let interior = f1.bounds().inset(1);
        if interior.width() < MIN_INTERIOR_EXTENT || interior.height() < MIN_INTERIOR_EXTENT {
            return Err(FlowError::invalid_argument(
                "f1",
                format!(
                    "interior {interior} of bounds {} must be at least \
                     {MIN_INTERIOR_EXTENT}x{MIN_INTERIOR_EXTENT}",
                    f1.bounds()
                ),
            ));
        }

        info!(
            width = interior.width(),
            height = interior.height(),
            alpha = self.config.alpha,
            iterations = self.config.iterations,
            rows_per_band = self.scheduler.rows_per_band(),
            "Computing Horn-Schunck optical flow"
        );

        let derivs = {
            let _scope = ProfilerScope::new("derivatives");
            derive_mixed(f1, f2, &self.scheduler)?
        };

        let mut current = FloatBuffer::new(interior, FLOW_CHANNELS)?;
        let mut previous = FloatBuffer::new(interior, FLOW_CHANNELS)?;
        {
            let _scope = ProfilerScope::new("relaxation");
            for iteration in 1..=self.config.iterations {
                relax_sweep(
                    self.config.alpha,
                    &derivs,
                    &previous,
                    &mut current,
                    &self.scheduler,
                )?;
                previous.copy_from(&current);
                trace!(iteration, "Jacobi sweep complete");
                observer(iteration, &current);
            }
        }

        let non_finite = count_non_finite(&current);
        if non_finite > 0 {
            warn!(
                non_finite,
                "Flow field contains non-finite values; consider a larger alpha"
            );
        }

        info!("Optical flow computed");
        Ok(current)
    }

    /// Magnitude field of a flow field, using this solver's scheduler
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `flow` does not have two channels.
    pub fn magnitude<S>(&self, flow: &FloatBuffer<S>) -> FlowResult<FloatBuffer>
    where
        S: AsRef<[f32]> + Sync,
    {
        let _scope = ProfilerScope::new("magnitude");
        magnitude_field(flow, &self.scheduler)
    }
}

/// Compute the flow field between two bordered frames with `config`
///
/// Convenience wrapper around [`HornSchunckSolver::new`] and
/// [`HornSchunckSolver::solve`].
///
/// # Errors
///
/// `InvalidArgument` if `config` is invalid or the frames are unusable (see
/// [`HornSchunckSolver::solve`]).
pub fn compute_flow<A, B>(
    f1: &FloatBuffer<A>,
    f2: &FloatBuffer<B>,
    config: &FlowConfig,
) -> FlowResult<FloatBuffer>
where
    A: AsRef<[f32]> + Sync,
    B: AsRef<[f32]> + Sync,
{
    HornSchunckSolver::new(*config)?.solve(f1, f2)
}
