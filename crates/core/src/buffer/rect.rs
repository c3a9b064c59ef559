//! Integer rectangle describing the region a buffer covers
//!
//! Bounds are half-open on the max side: a `Rect` from `(0, 0)` to `(4, 3)` covers
//! columns `0..4` and rows `0..3`. Coordinates may be negative, which is how a
//! 1-cell border around an image starting at the origin is addressed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rectangular region with inclusive min and exclusive max corners
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge (inclusive)
    pub min_x: i32,
    /// Top edge (inclusive)
    pub min_y: i32,
    /// Right edge (exclusive)
    pub max_x: i32,
    /// Bottom edge (exclusive)
    pub max_y: i32,
}

impl Rect {
    /// Create a rectangle from its corners.
    #[must_use]
    pub const fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Create a rectangle anchored at the origin.
    #[must_use]
    pub const fn from_size(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Horizontal extent. Negative when the corners are inverted.
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.max_x - self.min_x
    }

    /// Vertical extent. Negative when the corners are inverted.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.max_y - self.min_y
    }

    /// True if the rectangle contains no cells.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.min_x >= self.max_x || self.min_y >= self.max_y
    }

    /// Number of cells covered (zero for empty or inverted rectangles).
    #[must_use]
    pub fn area(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.width() as usize * self.height() as usize
        }
    }

    /// True if `(x, y)` lies inside the rectangle.
    #[must_use]
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        self.min_x <= x && x < self.max_x && self.min_y <= y && y < self.max_y
    }

    /// Largest rectangle contained in both `self` and `other`.
    ///
    /// An empty intersection collapses to `Rect::default()` so that callers never
    /// see an inverted rectangle.
    #[must_use]
    pub fn intersect(&self, other: &Rect) -> Rect {
        let r = Rect::new(
            self.min_x.max(other.min_x),
            self.min_y.max(other.min_y),
            self.max_x.min(other.max_x),
            self.max_y.min(other.max_y),
        );
        if r.is_empty() {
            Rect::default()
        } else {
            r
        }
    }

    /// Shrink the rectangle by `n` cells on every side.
    ///
    /// If an axis is too small to shrink, both edges collapse onto its midpoint,
    /// giving an empty rectangle.
    #[must_use]
    pub const fn inset(&self, n: i32) -> Rect {
        let mut r = *self;
        if self.width() < 2 * n {
            r.min_x = (self.min_x + self.max_x) / 2;
            r.max_x = r.min_x;
        } else {
            r.min_x += n;
            r.max_x -= n;
        }
        if self.height() < 2 * n {
            r.min_y = (self.min_y + self.max_y) / 2;
            r.max_y = r.min_y;
        } else {
            r.min_y += n;
            r.max_y -= n;
        }
        r
    }

    /// Grow the rectangle by `n` cells on every side.
    #[must_use]
    pub const fn outset(&self, n: i32) -> Rect {
        Rect::new(self.min_x - n, self.min_y - n, self.max_x + n, self.max_y + n)
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{})-({},{})",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}
