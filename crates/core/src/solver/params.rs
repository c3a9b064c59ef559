//! Solver configuration
//!
//! `FlowConfig` is the whole configuration surface of the solver. It is passed
//! explicitly to the solver entry points; nothing is read from process-wide state.

use super::scheduler::RowBandScheduler;
use crate::error::{FlowError, FlowResult};
use serde::{Deserialize, Serialize};

/// Default smoothness weight
pub const DEFAULT_ALPHA: f32 = 100.0;
/// Default number of Jacobi sweeps
pub const DEFAULT_ITERATIONS: usize = 160;
/// Default rows per unit of parallel work
pub const DEFAULT_ROWS_PER_BAND: usize = 1;

/// Parameters of one Horn–Schunck solve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Smoothness weight (> 0). Larger values favour a smoother flow field over
    /// fidelity to the brightness-constancy data term.
    pub alpha: f32,
    /// Number of Jacobi sweeps (> 0). There is no convergence-based early exit.
    pub iterations: usize,
    /// Maximum rows per unit of parallel work (>= 1). Does not affect results.
    pub rows_per_band: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            iterations: DEFAULT_ITERATIONS,
            rows_per_band: DEFAULT_ROWS_PER_BAND,
        }
    }
}

impl FlowConfig {
    /// Check every parameter against its constraint
    ///
    /// # Errors
    ///
    /// `InvalidArgument` naming the first parameter that is out of range.
    pub fn validate(&self) -> FlowResult<()> {
        if !self.alpha.is_finite() || self.alpha <= 0.0 {
            return Err(FlowError::invalid_argument(
                "alpha",
                format!("must be finite and positive, got {}", self.alpha),
            ));
        }
        if self.iterations == 0 {
            return Err(FlowError::invalid_argument(
                "iterations",
                "must be at least 1, got 0",
            ));
        }
        if self.rows_per_band == 0 {
            return Err(FlowError::invalid_argument(
                "rows_per_band",
                "must be at least 1, got 0",
            ));
        }
        Ok(())
    }

    /// Scheduler configured with this config's band size
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `rows_per_band` is zero.
    pub fn scheduler(&self) -> FlowResult<RowBandScheduler> {
        RowBandScheduler::new(self.rows_per_band)
    }
}
