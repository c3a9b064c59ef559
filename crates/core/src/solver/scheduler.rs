//! Row-band fork-join scheduler
//!
//! Every parallel phase of the solver (derivative pass, one Jacobi sweep, magnitude
//! pass) has the same shape: each output row depends only on read-only inputs, so
//! the output rows can be split into disjoint bands and computed concurrently.
//! `RowBandScheduler` owns that shape. It hands each band a mutable slice of its
//! own output rows and returns only after every band has finished.
//!
//! Bands are consecutive, disjoint and exhaustive over the requested rows. The
//! order in which bands run is unspecified; per-cell results never depend on it.

use crate::buffer::FloatBuffer;
use crate::error::{FlowError, FlowResult};
use rayon::prelude::*;
use std::num::NonZeroUsize;
use std::ops::Range;

/// Rows of an output buffer owned by one unit of parallel work
pub struct RowBand<'a> {
    rows: Range<i32>,
    row_len: usize,
    stride: usize,
    data: &'a mut [f32],
}

impl RowBand<'_> {
    /// Rows covered by this band
    #[must_use]
    pub fn rows(&self) -> Range<i32> {
        self.rows.clone()
    }

    /// Output cells of row `y`, `channels` floats per cell starting at the target's first column
    ///
    /// # Panics
    ///
    /// Panics if `y` lies outside [`RowBand::rows`].
    pub fn row_mut(&mut self, y: i32) -> &mut [f32] {
        assert!(self.rows.contains(&y), "Row outside band");
        let start = (y - self.rows.start) as usize * self.stride;
        &mut self.data[start..start + self.row_len]
    }
}

/// Splits row ranges into bands and runs them on the rayon pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowBandScheduler {
    rows_per_band: NonZeroUsize,
}

impl Default for RowBandScheduler {
    fn default() -> Self {
        Self {
            rows_per_band: NonZeroUsize::MIN,
        }
    }
}

impl RowBandScheduler {
    /// Create a scheduler dispatching at most `rows_per_band` rows per unit of work
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `rows_per_band` is zero.
    pub fn new(rows_per_band: usize) -> FlowResult<Self> {
        let rows_per_band = NonZeroUsize::new(rows_per_band).ok_or_else(|| {
            FlowError::invalid_argument("rows_per_band", "must be at least 1, got 0")
        })?;
        Ok(Self { rows_per_band })
    }

    /// Maximum rows per band
    #[must_use]
    pub fn rows_per_band(&self) -> usize {
        self.rows_per_band.get()
    }

    /// The bands `rows` is split into, in row order
    pub fn bands(&self, rows: Range<i32>) -> impl Iterator<Item = Range<i32>> {
        let step = self.rows_per_band.get();
        let step_rows = i32::try_from(step).unwrap_or(i32::MAX);
        let end = rows.end;
        rows.step_by(step)
            .map(move |start| start..end.min(start.saturating_add(step_rows)))
    }

    /// Run `work` once per band of `rows` and block until all bands complete
    ///
    /// Rows are clamped to the target's bounds. Each band receives exclusive access
    /// to its rows of `target`; anything else `work` reads must be shared, read-only
    /// state.
    pub fn run<S, F>(&self, target: &mut FloatBuffer<S>, rows: Range<i32>, work: F)
    where
        S: AsRef<[f32]> + AsMut<[f32]>,
        F: Fn(&mut RowBand<'_>) + Sync,
    {
        let bounds = target.bounds();
        let first = rows.start.max(bounds.min_y);
        let last = rows.end.min(bounds.max_y);
        if first >= last || bounds.width() <= 0 || target.channels() == 0 {
            return;
        }

        let stride = target.stride();
        let row_len = target.channels() * bounds.width() as usize;
        let bands: Vec<Range<i32>> = self.bands(first..last).collect();

        let data = target.as_mut_slice();
        let begin = (first - bounds.min_y) as usize * stride;
        let end = ((last - bounds.min_y) as usize * stride).min(data.len());

        // One chunk per band: a chunk spans `rows_per_band` full strides, and only
        // the last one may be shorter
        data[begin..end]
            .par_chunks_mut(stride.saturating_mul(self.rows_per_band.get()))
            .zip(bands.into_par_iter())
            .for_each(|(chunk, rows)| {
                let mut band = RowBand {
                    rows,
                    row_len,
                    stride,
                    data: chunk,
                };
                work(&mut band);
            });
    }
}
