//! Horn–Schunck Optical Flow Core Library
//!
//! Estimates a dense `(u, v)` motion field between two grayscale frames by
//! minimising brightness-constancy error plus `alpha`-weighted smoothness, solved
//! with a fixed number of Jacobi relaxation sweeps.
//!
//! ## Pipeline
//!
//! - Frames arrive as single-channel [`FloatBuffer`]s with a mirrored 1-cell border
//! - [`solver::derive_mixed`] computes the `(Fx, Fy, Fz)` field once
//! - [`HornSchunckSolver`] relaxes the flow field over the interior
//! - [`solver::magnitude_field`] reduces the flow to `|(u, v)|` for display
//!
//! Every parallel phase runs over disjoint row bands on the rayon pool, and each
//! sweep reads only the previous iterate, so results are bit-identical for any band
//! size or thread count.

// Flat float storage, views and border handling
pub mod buffer;

// Error taxonomy
pub mod error;

// Derivatives, relaxation, magnitude and the driving loop
pub mod solver;

// Field statistics for reporting
pub mod analysis;

// Re-export core types
pub use buffer::{FloatBuffer, FloatBufferView, FloatBufferViewMut, Rect};
pub use error::{FlowError, FlowResult};

// Re-export solver types
pub use solver::{compute_flow, FlowConfig, HornSchunckSolver, RowBandScheduler};

// Re-export analysis types
pub use analysis::{count_non_finite, mean_flow, FieldStats};
