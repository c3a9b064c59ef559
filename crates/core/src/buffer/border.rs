//! Mirrored border and 8-bit range rescaling
//!
//! The mirrored ("dummy") border is a 1-cell ring whose values duplicate the
//! adjacent interior row or column, so finite-difference stencils at the image edge
//! can read one cell past the interior without special cases.
//!
//! Mirroring runs in two passes. The top/bottom pass copies interior columns only;
//! the left/right pass then copies every row including the border rows, so each
//! corner ends up equal to its diagonally adjacent interior cell.

use super::FloatBuffer;

impl<S: AsRef<[f32]> + AsMut<[f32]>> FloatBuffer<S> {
    /// Copy the first/last interior row and column into the adjacent border cells
    ///
    /// An axis with fewer than 3 cells has no interior to mirror from and is left
    /// unchanged.
    pub fn apply_mirror_border(&mut self) {
        let b = self.bounds;
        let channels = self.channels;

        if b.height() >= 3 {
            for x in b.min_x + 1..b.max_x - 1 {
                let top = self.offset(x, b.min_y + 1);
                let top_out = self.offset(x, b.min_y);
                let bottom = self.offset(x, b.max_y - 2);
                let bottom_out = self.offset(x, b.max_y - 1);
                let data = self.data.as_mut();
                data.copy_within(top..top + channels, top_out);
                data.copy_within(bottom..bottom + channels, bottom_out);
            }
        }

        if b.width() >= 3 {
            for y in b.min_y..b.max_y {
                let left = self.offset(b.min_x + 1, y);
                let left_out = self.offset(b.min_x, y);
                let right = self.offset(b.max_x - 2, y);
                let right_out = self.offset(b.max_x - 1, y);
                let data = self.data.as_mut();
                data.copy_within(left..left + channels, left_out);
                data.copy_within(right..right + channels, right_out);
            }
        }
    }

    /// Rescale every channel so its maximum maps to 255
    ///
    /// Assumes non-negative values. Each value becomes `255 * v / max` with `max`
    /// taken per channel over the whole buffer. A channel whose maximum is not
    /// strictly positive and finite is left untouched.
    pub fn scale_to_unit_range(&mut self) {
        let channels = self.channels;
        if channels == 0 || self.bounds.is_empty() {
            return;
        }

        let mut max = vec![f32::MIN; channels];
        for y in self.bounds.min_y..self.bounds.max_y {
            for cell in self.row_slice(y).chunks_exact(channels) {
                for (m, &v) in max.iter_mut().zip(cell) {
                    if v > *m {
                        *m = v;
                    }
                }
            }
        }

        let divisors: Vec<Option<f32>> = max
            .iter()
            .map(|&m| (m > 0.0 && m.is_finite()).then_some(m))
            .collect();

        for y in self.bounds.min_y..self.bounds.max_y {
            for cell in self.row_slice_mut(y).chunks_exact_mut(channels) {
                for (v, divisor) in cell.iter_mut().zip(&divisors) {
                    if let Some(m) = divisor {
                        *v = 255.0 * *v / m;
                    }
                }
            }
        }
    }
}
