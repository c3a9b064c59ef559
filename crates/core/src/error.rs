//! Error taxonomy for the optical-flow core
//!
//! Two kinds of failure exist: invalid arguments detected at an API boundary before
//! any computation starts, and buffer accesses outside declared bounds. Neither is
//! retried; the operation that hits one is aborted.

use crate::buffer::Rect;
use thiserror::Error;

/// Result type produced by fallible core operations.
pub type FlowResult<T> = Result<T, FlowError>;

/// Errors emitted by buffer access and by the flow solver entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// A parameter or input failed validation.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        /// Name of the offending parameter (e.g. `"alpha"`, `"f2"`)
        name: &'static str,
        /// Description of the violated constraint
        reason: String,
    },

    /// A cell or channel was addressed outside the buffer.
    #[error("cell ({x}, {y}) channel {channel} lies outside buffer bounds {bounds}")]
    OutOfBounds {
        /// Requested x coordinate
        x: i32,
        /// Requested y coordinate
        y: i32,
        /// Requested channel index
        channel: usize,
        /// Bounds of the buffer that was addressed
        bounds: Rect,
    },
}

impl FlowError {
    /// Create an `InvalidArgument` error.
    ///
    /// # Arguments
    /// * `name` - The name of the invalid parameter (e.g. `"iterations"`)
    /// * `reason` - A description of the validation failure
    pub fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    /// Create an `OutOfBounds` error for a cell/channel address.
    pub fn out_of_bounds(x: i32, y: i32, channel: usize, bounds: Rect) -> Self {
        Self::OutOfBounds {
            x,
            y,
            channel,
            bounds,
        }
    }
}
