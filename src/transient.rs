//! Grids made of independently allocated rows.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use crate::Element;
use crate::error::GridError;
use crate::pitch::{buffer_len, row_pitch};
use crate::pixels::{PaddedRows, RowSource};
use crate::view::{GridView, GridViewMut, Image2D};

/// A jagged grid: one heap allocation per row, no pool involvement.
///
/// Useful for short-lived scratch images and as the result of
/// [`Image2D::to_transient`].
pub struct TransientGrid<T> {
    rows: Vec<Box<[T]>>,
    width: usize,
    granularity: usize,
    row_pitch: usize,
}

impl<T: Element> TransientGrid<T> {
    /// Allocate `height` rows of `row_pitch(width, granularity)` default
    /// elements each.
    ///
    /// # Errors
    ///
    /// [`GridError::InvalidConfiguration`] for a bad granularity,
    /// [`GridError::Overflow`] if the total size does not fit in `usize`.
    pub fn new(width: usize, height: usize, granularity: usize) -> Result<Self, GridError> {
        buffer_len(width, height, granularity)?;
        let pitch = row_pitch(width, granularity)?;
        let rows = (0..height)
            .map(|_| vec![T::default(); pitch].into_boxed_slice())
            .collect();
        Ok(Self::from_rows(rows, width, granularity, pitch))
    }
}

impl<T> TransientGrid<T> {
    /// Every row must already hold at least `row_pitch` elements.
    pub(crate) fn from_rows(
        rows: Vec<Box<[T]>>,
        width: usize,
        granularity: usize,
        row_pitch: usize,
    ) -> Self {
        debug_assert!(rows.iter().all(|row| row.len() >= row_pitch));
        Self {
            rows,
            width,
            granularity,
            row_pitch,
        }
    }

    /// Read-only view of all rows.
    pub fn view(&self) -> GridView<'_, T> {
        let rows = self.rows.iter().map(|row| &**row).collect();
        GridView::from_parts(rows, self.width, self.granularity, self.row_pitch)
    }

    /// Writable view of all rows.
    pub fn view_mut(&mut self) -> GridViewMut<'_, T> {
        let rows = self.rows.iter_mut().map(|row| &mut **row).collect();
        GridViewMut::from_parts(rows, self.width, self.granularity, self.row_pitch)
    }

    /// Logical pixels of row `index`.
    ///
    /// # Errors
    ///
    /// [`GridError::IndexOutOfRange`] if `index >= height`.
    pub fn row(&self, index: usize) -> Result<&[T], GridError> {
        Ok(&self.padded_row(index)?[..self.width])
    }

    /// Logical pixels of row `index`, mutably.
    ///
    /// # Errors
    ///
    /// [`GridError::IndexOutOfRange`] if `index >= height`.
    pub fn row_mut(&mut self, index: usize) -> Result<&mut [T], GridError> {
        let height = self.rows.len();
        let row = self
            .rows
            .get_mut(index)
            .ok_or(GridError::IndexOutOfRange { index, height })?;
        Ok(&mut row[..self.width])
    }

    /// Take the row buffers.
    pub fn into_rows(self) -> Vec<Box<[T]>> {
        self.rows
    }
}

impl<T> Image2D<T> for TransientGrid<T> {
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
            .ok_or(GridError::IndexOutOfRange {
                index,
                height: self.rows.len(),
            })
    }

    fn padded_rows(&self) -> PaddedRows<'_, T> {
        PaddedRows::new(RowSource::Boxed(self.rows.iter()))
    }
}

impl<T> fmt::Debug for TransientGrid<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TransientGrid({}x{}, pitch {})",
            self.width,
            self.rows.len(),
            self.row_pitch
        )
    }
}
