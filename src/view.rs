//! Rectangular row views.
//!
//! A view is a table of row slices plus a logical shape. The rows may come
//! from one contiguous block, from independently allocated row buffers, or
//! from the rows of another view; the view never owns them.
//!
//! Aliasing is carried by the borrow checker: [`GridView`] holds shared
//! rows and can be cloned freely, [`GridViewMut`] holds exclusive rows and
//! every slice of it reborrows the parent. A view therefore cannot outlive
//! the memory it was taken from, and no view can survive a compaction of
//! its grid.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use imgref::ImgRef;

use crate::Element;
use crate::error::GridError;
use crate::pitch::row_pitch;
use crate::pixels::{PaddedRows, PixelValues, Pixels, RowSource};
use crate::transient::TransientGrid;

// ---------------------------------------------------------------------------
// Image2D
// ---------------------------------------------------------------------------

/// Read access shared by every padded image: views, transient grids and
/// contiguous grids.
///
/// This is the source type for [`ContiguousGrid::copy_from`] and
/// [`ContiguousGrid::compact_copy`].
///
/// [`ContiguousGrid::copy_from`]: crate::ContiguousGrid::copy_from
/// [`ContiguousGrid::compact_copy`]: crate::ContiguousGrid::compact_copy
pub trait Image2D<T> {
    /// Logical width in elements.
    fn width(&self) -> usize;

    /// Number of rows.
    fn height(&self) -> usize;

    /// Padding granularity in elements (a power of two).
    fn granularity(&self) -> usize;

    /// Padded row length, `row_pitch(width, granularity)`.
    fn row_pitch(&self) -> usize;

    /// Full padded row `index` (at least `row_pitch` elements).
    ///
    /// # Errors
    ///
    /// [`GridError::IndexOutOfRange`] if `index >= height`.
    fn padded_row(&self, index: usize) -> Result<&[T], GridError>;

    /// All padded rows, top to bottom.
    fn padded_rows(&self) -> PaddedRows<'_, T>;

    /// Logical elements in row-major order, padding excluded.
    fn pixel_values(&self) -> PixelValues<'_, T>
    where
        T: Copy,
    {
        PixelValues::new(self.padded_rows(), self.width())
    }

    /// Logical elements with their `(column, row)` position.
    fn pixels(&self) -> Pixels<'_, T>
    where
        T: Copy,
    {
        Pixels::new(self.pixel_values())
    }

    /// Copy every padded row into freshly allocated row buffers.
    ///
    /// The copy shares nothing with `self`.
    fn to_transient(&self) -> TransientGrid<T>
    where
        T: Element,
    {
        let rows = self.padded_rows().map(Box::<[T]>::from).collect();
        TransientGrid::from_rows(rows, self.width(), self.granularity(), self.row_pitch())
    }
}

/// Check that `(left, top, width, height)` lies within `bound_width` x
/// `bound_height`.
pub(crate) fn validate_rect(
    left: usize,
    top: usize,
    width: usize,
    height: usize,
    bound_width: usize,
    bound_height: usize,
) -> Result<(), GridError> {
    let fits_x = left.checked_add(width).is_some_and(|end| end <= bound_width);
    let fits_y = top.checked_add(height).is_some_and(|end| end <= bound_height);
    if fits_x && fits_y {
        Ok(())
    } else {
        Err(GridError::OutOfBounds {
            left,
            top,
            width,
            height,
            bound_width,
            bound_height,
        })
    }
}

#[inline]
fn index_error(index: usize, height: usize) -> GridError {
    GridError::IndexOutOfRange { index, height }
}

/// Check every row against the padded length required by `width`.
fn check_rows<'r, T: 'r>(
    rows: impl Iterator<Item = &'r [T]>,
    width: usize,
    granularity: usize,
) -> Result<usize, GridError> {
    let pitch = row_pitch(width, granularity)?;
    for row in rows {
        if row.len() < pitch {
            return Err(GridError::BufferTooSmall {
                required: pitch,
                actual: row.len(),
            });
        }
    }
    Ok(pitch)
}

// ---------------------------------------------------------------------------
// GridView (shared)
// ---------------------------------------------------------------------------

enum RowTable<'a, T> {
    /// Rows collected for this view.
    Owned(Vec<&'a [T]>),
    /// The row table of a [`GridViewMut`], read through a shared borrow.
    Projected(&'a [&'a mut [T]]),
}

/// Read-only rectangular view.
///
/// Row `i` is a window of at least `row_pitch` elements; the first `width`
/// of them are the logical pixels.
pub struct GridView<'a, T> {
    rows: RowTable<'a, T>,
    width: usize,
    granularity: usize,
    row_pitch: usize,
}

impl<'a, T> GridView<'a, T> {
    /// Build a view from padded rows.
    ///
    /// # Errors
    ///
    /// [`GridError::InvalidConfiguration`] for a bad granularity,
    /// [`GridError::BufferTooSmall`] if a row is shorter than the padded
    /// width.
    pub fn new(rows: Vec<&'a [T]>, width: usize, granularity: usize) -> Result<Self, GridError> {
        let row_pitch = check_rows(rows.iter().copied(), width, granularity)?;
        Ok(Self::from_parts(rows, width, granularity, row_pitch))
    }

    /// Rows already checked by the caller.
    pub(crate) fn from_parts(
        rows: Vec<&'a [T]>,
        width: usize,
        granularity: usize,
        row_pitch: usize,
    ) -> Self {
        Self {
            rows: RowTable::Owned(rows),
            width,
            granularity,
            row_pitch,
        }
    }

    fn len(&self) -> usize {
        match &self.rows {
            RowTable::Owned(rows) => rows.len(),
            RowTable::Projected(rows) => rows.len(),
        }
    }

    fn get(&self, index: usize) -> Option<&'a [T]> {
        match &self.rows {
            RowTable::Owned(rows) => rows.get(index).copied(),
            RowTable::Projected(rows) => {
                let rows: &'a [&'a mut [T]] = *rows;
                rows.get(index).map(|row| &**row)
            }
        }
    }

    /// Logical pixels of row `index` (exactly `width` elements).
    ///
    /// # Errors
    ///
    /// [`GridError::IndexOutOfRange`] if `index >= height`.
    pub fn row(&self, index: usize) -> Result<&'a [T], GridError> {
        let row = self
            .get(index)
            .ok_or_else(|| index_error(index, self.len()))?;
        Ok(&row[..self.width])
    }

    /// Sub-rectangle sharing this view's storage.
    ///
    /// The new rows start at column `left` and are
    /// `row_pitch(width, granularity)` long.
    ///
    /// # Errors
    ///
    /// [`GridError::OutOfBounds`] if the rectangle is not inside the view,
    /// or if a new padded row would run past the end of its parent row.
    pub fn slice(
        &self,
        left: usize,
        top: usize,
        width: usize,
        height: usize,
    ) -> Result<GridView<'a, T>, GridError> {
        validate_rect(left, top, width, height, self.width, self.len())?;
        let pitch = row_pitch(width, self.granularity)?;
        let bounds = GridError::OutOfBounds {
            left,
            top,
            width,
            height,
            bound_width: self.width,
            bound_height: self.len(),
        };
        let end = left.checked_add(pitch).ok_or(bounds)?;
        let rows = (top..top + height)
            .map(|y| self.get(y).and_then(|row| row.get(left..end)).ok_or(bounds))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(GridView::from_parts(rows, width, self.granularity, pitch))
    }
}

impl<T> Clone for GridView<'_, T> {
    fn clone(&self) -> Self {
        let rows = match &self.rows {
            RowTable::Owned(rows) => RowTable::Owned(rows.clone()),
            RowTable::Projected(rows) => RowTable::Projected(*rows),
        };
        Self {
            rows,
            width: self.width,
            granularity: self.granularity,
            row_pitch: self.row_pitch,
        }
    }
}

impl<T> Image2D<T> for GridView<'_, T> {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.len()
    }

    fn granularity(&self) -> usize {
        self.granularity
    }

    fn row_pitch(&self) -> usize {
        self.row_pitch
    }

    fn padded_row(&self, index: usize) -> Result<&[T], GridError> {
        self.get(index).ok_or_else(|| index_error(index, self.len()))
    }

    fn padded_rows(&self) -> PaddedRows<'_, T> {
        match &self.rows {
            RowTable::Owned(rows) => PaddedRows::new(RowSource::Shared(rows.iter())),
            RowTable::Projected(rows) => PaddedRows::new(RowSource::Exclusive(rows.iter())),
        }
    }
}

impl<T> fmt::Debug for GridView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GridView({}x{}, pitch {})",
            self.width,
            self.len(),
            self.row_pitch
        )
    }
}

/// Zero-copy view over an `imgref` image. Padded rows are the image's
/// stride windows; the granularity is 1.
impl<'a, T> From<ImgRef<'a, T>> for GridView<'a, T> {
    fn from(img: ImgRef<'a, T>) -> Self {
        let width = img.width();
        let height = img.height();
        let stride = img.stride();
        let buf = img.into_buf();
        let rows = (0..height)
            .map(|y| {
                let start = (y * stride).min(buf.len());
                let end = (start + stride).min(buf.len());
                &buf[start..end]
            })
            .collect();
        Self::from_parts(rows, width, 1, width)
    }
}

// ---------------------------------------------------------------------------
// GridViewMut (exclusive)
// ---------------------------------------------------------------------------

/// Writable rectangular view.
///
/// Rows are disjoint exclusive slices, so a view can be handed to another
/// thread or sliced further. Slicing borrows the parent mutably for as long
/// as the slice lives.
pub struct GridViewMut<'a, T> {
    rows: Vec<&'a mut [T]>,
    width: usize,
    granularity: usize,
    row_pitch: usize,
}

/// Cut each row to `[left, left + pitch)`.
fn window_rows<'r, T>(
    rows: impl Iterator<Item = &'r mut [T]>,
    left: usize,
    pitch: usize,
    bounds: GridError,
) -> Result<Vec<&'r mut [T]>, GridError> {
    let end = left.checked_add(pitch).ok_or(bounds)?;
    rows.map(|row| row.get_mut(left..end).ok_or(bounds))
        .collect()
}

impl<'a, T> GridViewMut<'a, T> {
    /// Build a writable view from padded rows.
    ///
    /// # Errors
    ///
    /// Same as [`GridView::new`].
    pub fn new(rows: Vec<&'a mut [T]>, width: usize, granularity: usize) -> Result<Self, GridError> {
        let row_pitch = check_rows(rows.iter().map(|row| &**row), width, granularity)?;
        Ok(Self::from_parts(rows, width, granularity, row_pitch))
    }

    pub(crate) fn from_parts(
        rows: Vec<&'a mut [T]>,
        width: usize,
        granularity: usize,
        row_pitch: usize,
    ) -> Self {
        Self {
            rows,
            width,
            granularity,
            row_pitch,
        }
    }

    /// Logical pixels of row `index`.
    ///
    /// # Errors
    ///
    /// [`GridError::IndexOutOfRange`] if `index >= height`.
    pub fn row(&self, index: usize) -> Result<&[T], GridError> {
        let height = self.rows.len();
        let row = self
            .rows
            .get(index)
            .ok_or_else(|| index_error(index, height))?;
        Ok(&row[..self.width])
    }

    /// Logical pixels of row `index`, mutably.
    ///
    /// # Errors
    ///
    /// [`GridError::IndexOutOfRange`] if `index >= height`.
    pub fn row_mut(&mut self, index: usize) -> Result<&mut [T], GridError> {
        let width = self.width;
        Ok(&mut self.padded_row_mut(index)?[..width])
    }

    /// Full padded row `index`, mutably. Writes past `width` land in
    /// padding.
    ///
    /// # Errors
    ///
    /// [`GridError::IndexOutOfRange`] if `index >= height`.
    pub fn padded_row_mut(&mut self, index: usize) -> Result<&mut [T], GridError> {
        let height = self.rows.len();
        self.rows
            .get_mut(index)
            .map(|row| &mut **row)
            .ok_or_else(|| index_error(index, height))
    }

    /// All padded rows, mutably, top to bottom.
    pub fn padded_rows_mut(&mut self) -> impl ExactSizeIterator<Item = &mut [T]> {
        self.rows.iter_mut().map(|row| &mut **row)
    }

    /// Writable sub-rectangle borrowing from this view.
    ///
    /// # Errors
    ///
    /// Same as [`GridView::slice`].
    pub fn slice(
        &mut self,
        left: usize,
        top: usize,
        width: usize,
        height: usize,
    ) -> Result<GridViewMut<'_, T>, GridError> {
        let (pitch, bounds) = self.prepare_slice(left, top, width, height)?;
        let parents = self.rows[top..top + height].iter_mut().map(|row| &mut **row);
        let rows = window_rows(parents, left, pitch, bounds)?;
        Ok(GridViewMut::from_parts(rows, width, self.granularity, pitch))
    }

    /// Like [`slice`](Self::slice) but consumes the view, keeping the
    /// original lifetime.
    ///
    /// # Errors
    ///
    /// Same as [`GridView::slice`].
    pub fn into_slice(
        self,
        left: usize,
        top: usize,
        width: usize,
        height: usize,
    ) -> Result<GridViewMut<'a, T>, GridError> {
        let (pitch, bounds) = self.prepare_slice(left, top, width, height)?;
        let granularity = self.granularity;
        let parents = self.rows.into_iter().skip(top).take(height);
        let rows = window_rows(parents, left, pitch, bounds)?;
        Ok(GridViewMut::from_parts(rows, width, granularity, pitch))
    }

    fn prepare_slice(
        &self,
        left: usize,
        top: usize,
        width: usize,
        height: usize,
    ) -> Result<(usize, GridError), GridError> {
        validate_rect(left, top, width, height, self.width, self.rows.len())?;
        let pitch = row_pitch(width, self.granularity)?;
        let bounds = GridError::OutOfBounds {
            left,
            top,
            width,
            height,
            bound_width: self.width,
            bound_height: self.rows.len(),
        };
        Ok((pitch, bounds))
    }

    /// Read-only view over the same rows. Costs nothing; writes made
    /// through `self` after the borrow ends are visible to later
    /// projections.
    pub fn as_read_only(&self) -> GridView<'_, T> {
        GridView {
            rows: RowTable::Projected(self.rows.as_slice()),
            width: self.width,
            granularity: self.granularity,
            row_pitch: self.row_pitch,
        }
    }

    /// Give up write access, keeping the original lifetime.
    pub fn into_read_only(self) -> GridView<'a, T> {
        let rows = self.rows.into_iter().map(|row| &*row).collect();
        GridView::from_parts(rows, self.width, self.granularity, self.row_pitch)
    }

    /// Mirror the logical part of every row in place. Padding is left
    /// alone.
    pub fn flip_horizontal(&mut self) {
        let width = self.width;
        for row in &mut self.rows {
            row[..width].reverse();
        }
    }

    /// Mirror the view top to bottom. Only the row table is reordered;
    /// storage is untouched.
    pub fn flip_vertical(&mut self) {
        self.rows.reverse();
    }
}

impl<T> Image2D<T> for GridViewMut<'_, T> {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.rows.len()
    }

    fn granularity(&self) -> usize {
        self.granularity
    }

    fn row_pitch(&self) -> usize {
        self.row_pitch
    }

    fn padded_row(&self, index: usize) -> Result<&[T], GridError> {
        self.rows
            .get(index)
            .map(|row| &**row)
            .ok_or_else(|| index_error(index, self.rows.len()))
    }

    fn padded_rows(&self) -> PaddedRows<'_, T> {
        PaddedRows::new(RowSource::Exclusive(self.rows.iter()))
    }
}

impl<T> fmt::Debug for GridViewMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GridViewMut({}x{}, pitch {})",
            self.width,
            self.rows.len(),
            self.row_pitch
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    /// 5x3 image, pitch 8, values `10 * row + column`, padding `-1`.
    fn sample() -> Vec<i32> {
        let mut data = vec![-1; 24];
        for y in 0..3 {
            for x in 0..5 {
                data[y * 8 + x] = (10 * y + x) as i32;
            }
        }
        data
    }

    fn rows_mut(data: &mut [i32]) -> Vec<&mut [i32]> {
        data.chunks_exact_mut(8).collect()
    }

    #[test]
    fn new_checks_row_length() {
        let data = [0u8; 12];
        let rows: Vec<&[u8]> = data.chunks(4).collect();
        assert!(GridView::new(rows.clone(), 4, 4).is_ok());
        assert_eq!(
            GridView::new(rows.clone(), 5, 4).unwrap_err(),
            GridError::BufferTooSmall {
                required: 8,
                actual: 4
            }
        );
        assert_eq!(
            GridView::new(rows, 3, 3).unwrap_err(),
            GridError::InvalidConfiguration { granularity: 3 }
        );
    }

    #[test]
    fn row_access_is_logical_width() {
        let data = sample();
        let view = GridView::new(data.chunks(8).collect(), 5, 8).unwrap();
        assert_eq!(view.row(1).unwrap(), &[10, 11, 12, 13, 14]);
        assert_eq!(view.padded_row(1).unwrap().len(), 8);
        assert_eq!(
            view.row(3).unwrap_err(),
            GridError::IndexOutOfRange {
                index: 3,
                height: 3
            }
        );
    }

    #[test]
    fn full_slice_matches_original() {
        let data = sample();
        let view = GridView::new(data.chunks(8).collect(), 5, 8).unwrap();
        let same = view.slice(0, 0, 5, 3).unwrap();
        assert!(view.pixel_values().eq(same.pixel_values()));
    }

    #[test]
    fn slice_offsets_rows_and_columns() {
        let data = sample();
        let view = GridView::new(data.chunks(8).collect(), 5, 1).unwrap();
        let inner = view.slice(1, 1, 3, 2).unwrap();
        assert_eq!(inner.height(), 2);
        assert_eq!(inner.row_pitch(), 3);
        assert_eq!(inner.row(0).unwrap(), &[11, 12, 13]);
        assert_eq!(inner.row(1).unwrap(), &[21, 22, 23]);
    }

    #[test]
    fn slice_out_of_bounds() {
        let data = sample();
        let view = GridView::new(data.chunks(8).collect(), 5, 8).unwrap();
        assert!(matches!(
            view.slice(3, 0, 3, 1),
            Err(GridError::OutOfBounds { .. })
        ));
        assert!(matches!(
            view.slice(0, 2, 1, 2),
            Err(GridError::OutOfBounds { .. })
        ));
        assert!(matches!(
            view.slice(usize::MAX, 0, 2, 1),
            Err(GridError::OutOfBounds { .. })
        ));
        // Fits logically, but the padded window (2 + 8) runs past the row.
        assert!(matches!(
            view.slice(2, 0, 3, 1),
            Err(GridError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn empty_slice_is_allowed() {
        let data = sample();
        let view = GridView::new(data.chunks(8).collect(), 5, 8).unwrap();
        let empty = view.slice(5, 3, 0, 0).unwrap();
        assert_eq!(empty.pixel_values().count(), 0);
    }

    #[test]
    fn mutable_slice_aliases_parent() {
        let mut data = sample();
        let mut view = GridViewMut::new(rows_mut(&mut data), 5, 1).unwrap();
        {
            let mut inner = view.slice(2, 1, 2, 2).unwrap();
            inner.row_mut(1).unwrap()[0] = 99;
        }
        assert_eq!(view.row(2).unwrap()[2], 99);
        drop(view);
        assert_eq!(data[2 * 8 + 2], 99);
    }

    #[test]
    fn into_slice_keeps_lifetime() {
        let mut data = sample();
        let inner = {
            let view = GridViewMut::new(rows_mut(&mut data), 5, 1).unwrap();
            view.into_slice(1, 0, 2, 1).unwrap()
        };
        assert_eq!(inner.row(0).unwrap(), &[1, 2]);
    }

    #[test]
    fn read_only_projection_shares_rows() {
        let mut data = sample();
        let mut view = GridViewMut::new(rows_mut(&mut data), 5, 8).unwrap();
        view.row_mut(0).unwrap()[4] = 7;
        let shared = view.as_read_only();
        assert_eq!(shared.row(0).unwrap()[4], 7);
        assert_eq!(shared.padded_rows().len(), 3);
        let copy = shared.clone();
        assert_eq!(copy.row(2).unwrap(), &[20, 21, 22, 23, 24]);

        view.row_mut(0).unwrap()[4] = 8;
        assert_eq!(view.as_read_only().row(0).unwrap()[4], 8);
    }

    #[test]
    fn transient_copy_is_independent() {
        let mut data = sample();
        let view = GridViewMut::new(rows_mut(&mut data), 5, 8).unwrap();
        let mut copy = view.to_transient();
        copy.row_mut(1).unwrap()[1] = 500;
        assert_eq!(view.row(1).unwrap()[1], 11);
        assert_eq!(copy.padded_row(0).unwrap(), &[0, 1, 2, 3, 4, -1, -1, -1]);
    }

    #[test]
    fn pixels_report_column_then_row() {
        let data = sample();
        let view = GridView::new(data.chunks(8).collect(), 5, 8).unwrap();
        for pixel in view.pixels() {
            assert_eq!(pixel.value, (10 * pixel.row + pixel.column) as i32);
        }
        assert_eq!(view.pixels().count(), 15);
        // Restartable.
        assert_eq!(view.pixel_values().sum::<i32>(), view.pixel_values().sum::<i32>());
    }

    #[test]
    fn flips() {
        let mut data = sample();
        let mut view = GridViewMut::new(rows_mut(&mut data), 5, 8).unwrap();
        view.flip_horizontal();
        assert_eq!(view.row(0).unwrap(), &[4, 3, 2, 1, 0]);
        assert_eq!(view.padded_row(0).unwrap()[5], -1);
        view.flip_vertical();
        assert_eq!(view.row(0).unwrap(), &[24, 23, 22, 21, 20]);
        drop(view);
        // Vertical flip only reorders the table.
        assert_eq!(data[0], 4);
    }

    #[test]
    fn padded_rows_mut_reach_padding() {
        let mut data = sample();
        let mut view = GridViewMut::new(rows_mut(&mut data), 5, 8).unwrap();
        for row in view.padded_rows_mut() {
            row.fill(0);
        }
        drop(view);
        assert!(data.iter().all(|&v| v == 0));
    }

    #[test]
    fn from_imgref_uses_stride() {
        let buf = [1u8, 2, 0, 3, 4, 0, 5, 6];
        let img = imgref::Img::new_stride(&buf[..], 2, 3, 3);
        let view = GridView::from(img);
        assert_eq!(view.row_pitch(), 2);
        assert_eq!(view.padded_row(0).unwrap(), &[1, 2, 0]);
        assert_eq!(view.padded_row(2).unwrap(), &[5, 6]);
        assert_eq!(view.pixel_values().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6]);
    }
}
