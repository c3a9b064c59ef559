//! Flat multi-channel float storage
//!
//! `FloatBuffer` stores a rectangular region of cells, each holding a fixed number of
//! `f32` channels, as one flat row-major slice. The same type describes three kinds
//! of storage, selected by the `S` parameter:
//!
//! - `FloatBuffer` (`S = Vec<f32>`): owns its storage
//! - `FloatBufferView<'a>` (`S = &'a [f32]`): read-only window into another buffer
//! - `FloatBufferViewMut<'a>` (`S = &'a mut [f32]`): writable window into another buffer
//!
//! # Addressing
//!
//! The channel vector of cell `(x, y)` occupies
//! `data[(y - min_y) * stride + (x - min_x) * channels ..][..channels]`.
//! An owning buffer is compact (`stride == channels * width`). A view keeps its
//! owner's stride and starts at its own min corner, so a view is a sub-slice of the
//! owner's storage and writes through it land in the owner.
//!
//! # Aliasing
//!
//! Views borrow from the owner and can never outlive it. While a mutable view is
//! alive the owner cannot be touched; once it is dropped every write it made is
//! visible through the owner.

mod border;
mod rect;

pub use rect::Rect;

use crate::error::{FlowError, FlowResult};

/// Multi-channel float field over a rectangular region
#[derive(Debug, Clone, PartialEq)]
pub struct FloatBuffer<S = Vec<f32>> {
    /// Cell values in row-major order, `channels` floats per cell
    data: S,
    /// Floats per row of the underlying storage
    stride: usize,
    /// Floats per cell
    channels: usize,
    /// Region covered by this buffer
    bounds: Rect,
}

/// Read-only window into another buffer's storage
pub type FloatBufferView<'a> = FloatBuffer<&'a [f32]>;

/// Writable window into another buffer's storage
pub type FloatBufferViewMut<'a> = FloatBuffer<&'a mut [f32]>;

fn check_shape(bounds: Rect, channels: usize) -> FlowResult<()> {
    if bounds.width() < 0 || bounds.height() < 0 {
        return Err(FlowError::invalid_argument(
            "bounds",
            format!("extent must not be negative, got {bounds}"),
        ));
    }
    if channels == 0 && !bounds.is_empty() {
        return Err(FlowError::invalid_argument(
            "channels",
            format!("must be at least 1 for non-empty bounds {bounds}"),
        ));
    }
    Ok(())
}

impl FloatBuffer {
    /// Create an owning buffer covering `bounds`, initialized to zero
    ///
    /// # Arguments
    ///
    /// * `bounds` - Region covered by the buffer
    /// * `channels` - Floats per cell
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `bounds` has a negative extent, or if `channels` is zero
    /// while `bounds` is non-empty. Zero-area bounds give a buffer with no storage.
    pub fn new(bounds: Rect, channels: usize) -> FlowResult<Self> {
        Self::with_value(bounds, channels, 0.0)
    }

    /// Create an owning buffer covering `bounds`, initialized to `value`
    ///
    /// # Errors
    ///
    /// Same as [`FloatBuffer::new`].
    pub fn with_value(bounds: Rect, channels: usize, value: f32) -> FlowResult<Self> {
        check_shape(bounds, channels)?;
        Ok(Self {
            data: vec![value; channels * bounds.area()],
            stride: channels * bounds.width().max(0) as usize,
            channels,
            bounds,
        })
    }

    /// Wrap existing row-major data as an owning buffer
    ///
    /// # Errors
    ///
    /// Same as [`FloatBuffer::new`], plus `InvalidArgument` if `data` does not hold
    /// exactly `channels * area` floats.
    pub fn from_vec(bounds: Rect, channels: usize, data: Vec<f32>) -> FlowResult<Self> {
        check_shape(bounds, channels)?;
        let expected = channels * bounds.area();
        if data.len() != expected {
            return Err(FlowError::invalid_argument(
                "data",
                format!(
                    "expected {expected} floats for {channels} channel(s) over {bounds}, got {}",
                    data.len()
                ),
            ));
        }
        Ok(Self {
            data,
            stride: channels * bounds.width().max(0) as usize,
            channels,
            bounds,
        })
    }

    /// Retarget this buffer to `other`'s bounds and channel count and copy its values
    ///
    /// The result is always compact. Storage is reused when its capacity suffices,
    /// so repeated copies between equally-sized buffers do not allocate.
    pub fn copy_from<T: AsRef<[f32]>>(&mut self, other: &FloatBuffer<T>) {
        let row_len = other.row_len();
        self.data.clear();
        self.data.reserve(row_len * other.bounds.height().max(0) as usize);
        if other.stride == row_len {
            let len = row_len * other.bounds.height().max(0) as usize;
            self.data.extend_from_slice(&other.data.as_ref()[..len]);
        } else {
            for y in other.bounds.min_y..other.bounds.max_y {
                self.data.extend_from_slice(other.row_slice(y));
            }
        }
        self.bounds = other.bounds;
        self.channels = other.channels;
        self.stride = row_len;
    }

    /// Consume the buffer, returning its compact row-major storage
    #[must_use]
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}

impl<S: AsRef<[f32]>> FloatBuffer<S> {
    /// Region covered by this buffer
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Floats per cell
    #[must_use]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Floats per storage row
    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Underlying storage, starting at this buffer's min corner
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        self.data.as_ref()
    }

    /// Floats occupied by one row of this buffer's own cells
    fn row_len(&self) -> usize {
        self.channels * self.bounds.width().max(0) as usize
    }

    /// Offset of the first channel of `(x, y)`; caller guarantees `(x, y)` is in bounds
    #[inline]
    fn offset(&self, x: i32, y: i32) -> usize {
        (y - self.bounds.min_y) as usize * self.stride
            + (x - self.bounds.min_x) as usize * self.channels
    }

    fn checked_offset(&self, x: i32, y: i32, channel: usize) -> FlowResult<usize> {
        if self.bounds.contains(x, y) && channel < self.channels {
            Ok(self.offset(x, y))
        } else {
            Err(FlowError::out_of_bounds(x, y, channel, self.bounds))
        }
    }

    /// Cells of row `y` as a flat slice; caller guarantees `y` is in bounds
    #[inline]
    pub(crate) fn row_slice(&self, y: i32) -> &[f32] {
        let start = (y - self.bounds.min_y) as usize * self.stride;
        &self.data.as_ref()[start..start + self.row_len()]
    }

    /// Channel vector at `(x, y)`
    ///
    /// # Errors
    ///
    /// `OutOfBounds` if `(x, y)` lies outside the buffer.
    pub fn cell(&self, x: i32, y: i32) -> FlowResult<&[f32]> {
        let i = self.checked_offset(x, y, 0)?;
        Ok(&self.data.as_ref()[i..i + self.channels])
    }

    /// Single channel value at `(x, y)`
    ///
    /// # Errors
    ///
    /// `OutOfBounds` if `(x, y)` lies outside the buffer or `channel` does not exist.
    pub fn value(&self, x: i32, y: i32, channel: usize) -> FlowResult<f32> {
        let i = self.checked_offset(x, y, channel)?;
        Ok(self.data.as_ref()[i + channel])
    }

    /// Cells of row `y`, `channels` floats per cell from `min_x` onward
    ///
    /// # Errors
    ///
    /// `OutOfBounds` if row `y` lies outside the buffer.
    pub fn row(&self, y: i32) -> FlowResult<&[f32]> {
        if y < self.bounds.min_y || y >= self.bounds.max_y {
            return Err(FlowError::out_of_bounds(self.bounds.min_x, y, 0, self.bounds));
        }
        Ok(self.row_slice(y))
    }

    /// Iterate over every channel vector in row-major order
    pub fn cells(&self) -> impl Iterator<Item = &[f32]> + '_ {
        let channels = self.channels.max(1);
        (self.bounds.min_y..self.bounds.max_y)
            .flat_map(move |y| self.row_slice(y).chunks_exact(channels))
    }

    /// Read-only view of the whole buffer
    #[must_use]
    pub fn view(&self) -> FloatBufferView<'_> {
        FloatBuffer {
            data: self.data.as_ref(),
            stride: self.stride,
            channels: self.channels,
            bounds: self.bounds,
        }
    }

    /// Read-only view of the intersection of `rect` with this buffer
    ///
    /// An empty intersection gives a zero-channel, zero-area view rather than
    /// slicing into the storage.
    #[must_use]
    pub fn sub_view(&self, rect: Rect) -> FloatBufferView<'_> {
        let r = rect.intersect(&self.bounds);
        if r.is_empty() {
            return FloatBuffer {
                data: &[],
                stride: 0,
                channels: 0,
                bounds: r,
            };
        }
        let (start, end) = self.span(r);
        FloatBuffer {
            data: &self.data.as_ref()[start..end],
            stride: self.stride,
            channels: self.channels,
            bounds: r,
        }
    }

    /// View excluding the outermost 1-cell border
    #[must_use]
    pub fn interior(&self) -> FloatBufferView<'_> {
        self.sub_view(self.bounds.inset(1))
    }

    /// Compact owning copy of this buffer's cells
    #[must_use]
    pub fn to_owned_buffer(&self) -> FloatBuffer {
        let mut owned = FloatBuffer {
            data: Vec::new(),
            stride: 0,
            channels: 0,
            bounds: Rect::default(),
        };
        owned.copy_from(self);
        owned
    }

    /// Storage span `[start, end)` covering the non-empty sub-rectangle `r`
    fn span(&self, r: Rect) -> (usize, usize) {
        let start = self.offset(r.min_x, r.min_y);
        let end = self.offset(r.min_x, r.max_y - 1) + self.channels * r.width() as usize;
        (start, end)
    }
}

impl<S: AsRef<[f32]> + AsMut<[f32]>> FloatBuffer<S> {
    /// Mutable underlying storage, starting at this buffer's min corner
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        self.data.as_mut()
    }

    /// Mutable channel vector at `(x, y)`
    ///
    /// # Errors
    ///
    /// `OutOfBounds` if `(x, y)` lies outside the buffer.
    pub fn cell_mut(&mut self, x: i32, y: i32) -> FlowResult<&mut [f32]> {
        let i = self.checked_offset(x, y, 0)?;
        let channels = self.channels;
        Ok(&mut self.data.as_mut()[i..i + channels])
    }

    /// Write a single channel at `(x, y)`
    ///
    /// # Errors
    ///
    /// `OutOfBounds` if `(x, y)` lies outside the buffer or `channel` does not exist.
    pub fn set(&mut self, x: i32, y: i32, channel: usize, value: f32) -> FlowResult<()> {
        let i = self.checked_offset(x, y, channel)?;
        self.data.as_mut()[i + channel] = value;
        Ok(())
    }

    /// Fill every cell covered by this buffer with `value`
    ///
    /// Only this buffer's own cells are touched; for a view, cells of the owner that
    /// fall outside the view keep their values.
    pub fn fill(&mut self, value: f32) {
        for y in self.bounds.min_y..self.bounds.max_y {
            self.row_slice_mut(y).fill(value);
        }
    }

    #[inline]
    pub(crate) fn row_slice_mut(&mut self, y: i32) -> &mut [f32] {
        let start = (y - self.bounds.min_y) as usize * self.stride;
        let len = self.row_len();
        &mut self.data.as_mut()[start..start + len]
    }

    /// Writable view of the intersection of `rect` with this buffer
    ///
    /// Writes through the view are visible through this buffer once the view is
    /// dropped. An empty intersection gives a zero-channel, zero-area view.
    pub fn sub_view_mut(&mut self, rect: Rect) -> FloatBufferViewMut<'_> {
        let r = rect.intersect(&self.bounds);
        if r.is_empty() {
            return FloatBuffer {
                data: &mut [],
                stride: 0,
                channels: 0,
                bounds: r,
            };
        }
        let (start, end) = self.span(r);
        FloatBuffer {
            data: &mut self.data.as_mut()[start..end],
            stride: self.stride,
            channels: self.channels,
            bounds: r,
        }
    }

    /// Writable view excluding the outermost 1-cell border
    pub fn interior_mut(&mut self) -> FloatBufferViewMut<'_> {
        let r = self.bounds.inset(1);
        self.sub_view_mut(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_creation() {
        let buffer = FloatBuffer::new(Rect::new(-1, -1, 9, 19), 3).unwrap();
        assert_eq!(buffer.bounds().width(), 10);
        assert_eq!(buffer.bounds().height(), 20);
        assert_eq!(buffer.channels(), 3);
        assert_eq!(buffer.stride(), 30);
        assert_eq!(buffer.as_slice().len(), 600);
        assert!(buffer.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_buffer_with_value() {
        let buffer = FloatBuffer::with_value(Rect::from_size(5, 5), 1, 42.0).unwrap();
        assert!(buffer.as_slice().iter().all(|&v| v == 42.0));
    }

    #[test]
    fn test_zero_area_buffer_has_no_storage() {
        let buffer = FloatBuffer::new(Rect::new(3, 3, 3, 8), 2).unwrap();
        assert!(buffer.as_slice().is_empty());
        assert_eq!(buffer.cells().count(), 0);
    }

    #[test]
    fn test_negative_extent_rejected() {
        let err = FloatBuffer::new(Rect::new(5, 0, 2, 4), 1).unwrap_err();
        assert!(matches!(
            err,
            FlowError::InvalidArgument { name: "bounds", .. }
        ));
    }

    #[test]
    fn test_zero_channels_rejected_for_non_empty_bounds() {
        let err = FloatBuffer::new(Rect::from_size(2, 2), 0).unwrap_err();
        assert!(matches!(
            err,
            FlowError::InvalidArgument {
                name: "channels",
                ..
            }
        ));
    }

    #[test]
    fn test_from_vec_length_check() {
        assert!(FloatBuffer::from_vec(Rect::from_size(2, 2), 1, vec![0.0; 4]).is_ok());
        let err = FloatBuffer::from_vec(Rect::from_size(2, 2), 2, vec![0.0; 4]).unwrap_err();
        assert!(matches!(err, FlowError::InvalidArgument { name: "data", .. }));
    }

    #[test]
    fn test_cell_addressing_with_offset_bounds() {
        let mut buffer = FloatBuffer::new(Rect::new(-1, -1, 4, 3), 2).unwrap();
        buffer.set(2, 1, 1, 123.45).unwrap();
        assert_eq!(buffer.value(2, 1, 1).unwrap(), 123.45);
        assert_eq!(buffer.cell(2, 1).unwrap(), &[0.0, 123.45]);

        // (y - min_y) * stride + (x - min_x) * channels + channel
        let index = 2 * 10 + 3 * 2 + 1;
        assert_eq!(buffer.as_slice()[index], 123.45);

        buffer.cell_mut(-1, -1).unwrap().copy_from_slice(&[7.0, 8.0]);
        assert_eq!(&buffer.as_slice()[..2], &[7.0, 8.0]);
    }

    #[test]
    fn test_out_of_bounds_access() {
        let mut buffer = FloatBuffer::new(Rect::from_size(10, 10), 1).unwrap();
        assert!(matches!(
            buffer.cell(10, 5),
            Err(FlowError::OutOfBounds { x: 10, y: 5, .. })
        ));
        assert!(matches!(
            buffer.set(0, -1, 0, 1.0),
            Err(FlowError::OutOfBounds { .. })
        ));
        // Channel index past the channel count is also out of bounds
        assert!(matches!(
            buffer.value(0, 0, 1),
            Err(FlowError::OutOfBounds { channel: 1, .. })
        ));
        assert!(buffer.row(10).is_err());
    }

    #[test]
    fn test_fill() {
        let mut buffer = FloatBuffer::new(Rect::from_size(5, 5), 2).unwrap();
        buffer.fill(99.9);
        assert!(buffer.as_slice().iter().all(|&v| v == 99.9));
    }

    #[test]
    fn test_sub_view_writes_reach_owner() {
        let mut owner = FloatBuffer::new(Rect::from_size(6, 5), 2).unwrap();
        {
            let mut view = owner.sub_view_mut(Rect::new(2, 1, 5, 4));
            assert_eq!(view.bounds(), Rect::new(2, 1, 5, 4));
            assert_eq!(view.stride(), owner_stride(6, 2));
            view.set(3, 2, 0, 5.0).unwrap();
            view.cell_mut(4, 3).unwrap()[1] = -2.5;
            // Outside the view even though inside the owner
            assert!(view.set(0, 0, 0, 1.0).is_err());
        }
        assert_eq!(owner.value(3, 2, 0).unwrap(), 5.0);
        assert_eq!(owner.value(4, 3, 1).unwrap(), -2.5);
        assert_eq!(owner.as_slice().iter().filter(|&&v| v != 0.0).count(), 2);
    }

    #[test]
    fn test_owner_writes_visible_through_view() {
        let mut owner = FloatBuffer::new(Rect::new(-1, -1, 4, 4), 1).unwrap();
        owner.set(2, 3, 0, 11.0).unwrap();
        let view = owner.sub_view(Rect::new(1, 1, 10, 10));
        assert_eq!(view.bounds(), Rect::new(1, 1, 4, 4));
        assert_eq!(view.value(2, 3, 0).unwrap(), 11.0);
        assert_eq!(view.cell(1, 1).unwrap(), &[0.0]);
    }

    #[test]
    fn test_empty_sub_view() {
        let mut owner = FloatBuffer::new(Rect::from_size(4, 4), 3).unwrap();
        let view = owner.sub_view(Rect::new(10, 10, 20, 20));
        assert!(view.bounds().is_empty());
        assert_eq!(view.channels(), 0);
        assert!(view.as_slice().is_empty());

        let mut view_mut = owner.sub_view_mut(Rect::new(-5, -5, -1, -1));
        assert_eq!(view_mut.channels(), 0);
        view_mut.fill(1.0);
        assert!(owner.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_interior_excludes_border() {
        let mut owner = FloatBuffer::with_value(Rect::new(-1, -1, 4, 3), 1, 1.0).unwrap();
        owner.interior_mut().fill(5.0);
        let interior = owner.interior();
        assert_eq!(interior.bounds(), Rect::from_size(3, 2));
        assert!(interior.cells().all(|c| c[0] == 5.0));
        assert_eq!(owner.value(-1, -1, 0).unwrap(), 1.0);
        assert_eq!(owner.value(3, 2, 0).unwrap(), 1.0);
        assert_eq!(owner.value(0, 0, 0).unwrap(), 5.0);
    }

    #[test]
    fn test_copy_from_compacts_view() {
        let mut owner = FloatBuffer::new(Rect::from_size(4, 4), 1).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                owner.set(x, y, 0, (y * 4 + x) as f32).unwrap();
            }
        }
        let mut copy = FloatBuffer::new(Rect::from_size(1, 1), 2).unwrap();
        copy.copy_from(&owner.sub_view(Rect::new(1, 1, 3, 3)));
        assert_eq!(copy.bounds(), Rect::new(1, 1, 3, 3));
        assert_eq!(copy.channels(), 1);
        assert_eq!(copy.stride(), 2);
        assert_eq!(copy.as_slice(), &[5.0, 6.0, 9.0, 10.0]);
    }

    #[test]
    fn test_copy_from_reuses_storage() {
        let source = FloatBuffer::with_value(Rect::from_size(8, 8), 2, 3.0).unwrap();
        let mut target = FloatBuffer::new(Rect::from_size(8, 8), 2).unwrap();
        let before = target.as_slice().as_ptr();
        target.copy_from(&source);
        assert_eq!(target.as_slice().as_ptr(), before);
        assert_eq!(target, source);
    }

    #[test]
    fn test_to_owned_buffer() {
        let mut owner = FloatBuffer::new(Rect::from_size(3, 3), 1).unwrap();
        owner.set(1, 1, 0, 4.0).unwrap();
        let owned = owner.interior().to_owned_buffer();
        assert_eq!(owned.bounds(), Rect::new(1, 1, 2, 2));
        assert_eq!(owned.into_vec(), vec![4.0]);
    }

    fn owner_stride(width: usize, channels: usize) -> usize {
        width * channels
    }
}
