//! Contiguous padded grids.
//!
//! A [`ContiguousGrid`] is one block of `row_pitch * height` elements (the
//! backing [`Storage`] may be longer). Row `y` starts at `y * row_pitch`;
//! the first `width` elements of a row are pixels, the rest is padding that
//! vector loops may read and write freely.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;

use log::debug;

use crate::Element;
use crate::error::GridError;
use crate::pitch::{buffer_len, row_pitch};
use crate::pixels::{PaddedRows, RowSource};
use crate::pool::PoolLease;
use crate::storage::Storage;
use crate::view::{GridView, GridViewMut, Image2D, validate_rect};

/// A padded 2-D grid over one contiguous block.
///
/// Shape changes ([`compact_slice`](Self::compact_slice),
/// [`compact_copy`](Self::compact_copy)) take `&mut self`, so no view over
/// the old layout can still be alive when the data is repacked.
pub struct ContiguousGrid<T, S = PoolLease<T>> {
    storage: S,
    width: usize,
    height: usize,
    granularity: usize,
    row_pitch: usize,
    _element: PhantomData<T>,
}

impl<T, S: Storage<T>> ContiguousGrid<T, S> {
    /// Lay a `width` x `height` grid over `storage`.
    ///
    /// # Errors
    ///
    /// [`GridError::InvalidConfiguration`] for a bad granularity,
    /// [`GridError::Overflow`] if the size does not fit in `usize`,
    /// [`GridError::BufferTooSmall`] if `storage` is shorter than
    /// `row_pitch * height`.
    pub fn new(storage: S, width: usize, height: usize, granularity: usize) -> Result<Self, GridError> {
        let required = buffer_len(width, height, granularity)?;
        let actual = storage.len();
        if actual < required {
            debug!("{width}x{height} grid needs {required} elements, storage has {actual}");
            return Err(GridError::BufferTooSmall { required, actual });
        }
        Ok(Self {
            storage,
            width,
            height,
            granularity,
            row_pitch: row_pitch(width, granularity)?,
            _element: PhantomData,
        })
    }

    /// Elements available in the backing storage.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// The backing storage, including anything past the grid.
    #[inline]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Take the backing storage back.
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// The padded block: `row_pitch * height` elements.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.storage.as_slice()[..self.row_pitch * self.height]
    }

    /// The padded block, mutably.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let len = self.row_pitch * self.height;
        &mut self.storage.as_mut_slice()[..len]
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
        let start = self.row_start(index)?;
        let width = self.width;
        Ok(&mut self.storage.as_mut_slice()[start..start + width])
    }

    fn row_start(&self, index: usize) -> Result<usize, GridError> {
        if index < self.height {
            Ok(index * self.row_pitch)
        } else {
            Err(GridError::IndexOutOfRange {
                index,
                height: self.height,
            })
        }
    }

    /// Read-only view of the whole grid.
    pub fn view(&self) -> GridView<'_, T> {
        let rows = split_rows(self.as_slice(), self.row_pitch, self.height);
        GridView::from_parts(rows, self.width, self.granularity, self.row_pitch)
    }

    /// Writable view of the whole grid.
    pub fn view_mut(&mut self) -> GridViewMut<'_, T> {
        let (width, height, granularity, pitch) =
            (self.width, self.height, self.granularity, self.row_pitch);
        let rows = split_rows_mut(self.as_mut_slice(), pitch, height);
        GridViewMut::from_parts(rows, width, granularity, pitch)
    }
}

impl<T: Element, S: Storage<T>> ContiguousGrid<T, S> {
    /// Copy pixels from `source` without changing shape.
    ///
    /// Copies `min(source.height, height)` rows. Each row takes up to
    /// `row_pitch` elements of the source's padded row, so padding is copied
    /// along with pixels; what ends up past `width` is unspecified filler.
    pub fn copy_from<I: Image2D<T> + ?Sized>(&mut self, source: &I) {
        let pitch = self.row_pitch;
        let rows = source.height().min(self.height);
        let data = self.as_mut_slice();
        for (y, src) in source.padded_rows().take(rows).enumerate() {
            let len = src.len().min(pitch);
            let start = y * pitch;
            data[start..start + len].copy_from_slice(&src[..len]);
        }
    }

    /// Take on `source`'s width and height (keeping this grid's
    /// granularity), then copy it in.
    ///
    /// # Errors
    ///
    /// [`GridError::BufferTooSmall`] if the storage cannot hold the new
    /// shape, [`GridError::Overflow`] on size overflow. The grid is
    /// unchanged on error.
    pub fn compact_copy<I: Image2D<T> + ?Sized>(&mut self, source: &I) -> Result<(), GridError> {
        let (width, height) = (source.width(), source.height());
        let required = buffer_len(width, height, self.granularity)?;
        let actual = self.capacity();
        if actual < required {
            return Err(GridError::BufferTooSmall { required, actual });
        }
        let pitch = row_pitch(width, self.granularity)?;
        debug!(
            "compact copy {}x{} (pitch {}) -> {width}x{height} (pitch {pitch})",
            self.width, self.height, self.row_pitch
        );
        self.width = width;
        self.height = height;
        self.row_pitch = pitch;
        self.copy_from(source);
        Ok(())
    }

    /// Crop to `(left, top, width, height)` and repack the crop to the
    /// start of the storage at its own row pitch.
    ///
    /// Rows are moved top to bottom. The new pitch never exceeds the old
    /// one and the crop starts at or after the block start, so each row's
    /// destination is at or before its source and no unread data is
    /// overwritten. Storage past the new block keeps its old contents.
    ///
    /// # Errors
    ///
    /// [`GridError::OutOfBounds`] if the rectangle is not inside the grid,
    /// or its padded rows (`left + row_pitch(width)`) would run past the
    /// old row pitch. The grid is unchanged on error.
    pub fn compact_slice(
        &mut self,
        left: usize,
        top: usize,
        width: usize,
        height: usize,
    ) -> Result<(), GridError> {
        validate_rect(left, top, width, height, self.width, self.height)?;
        let pitch = row_pitch(width, self.granularity)?;
        if left.checked_add(pitch).is_none_or(|end| end > self.row_pitch) {
            return Err(GridError::OutOfBounds {
                left,
                top,
                width,
                height,
                bound_width: self.width,
                bound_height: self.height,
            });
        }
        debug!(
            "compact slice {}x{} (pitch {}) at ({left}, {top}) -> {width}x{height} (pitch {pitch})",
            self.width, self.height, self.row_pitch
        );
        let old_pitch = self.row_pitch;
        let data = self.storage.as_mut_slice();
        for y in 0..height {
            let src = (top + y) * old_pitch + left;
            data.copy_within(src..src + pitch, y * pitch);
        }
        self.width = width;
        self.height = height;
        self.row_pitch = pitch;
        Ok(())
    }

    /// Fill the whole storage, padding and slack included, with
    /// `T::default()`.
    pub fn clear(&mut self) {
        self.storage.as_mut_slice().fill(T::default());
    }
}

impl<T, S: Storage<T>> Image2D<T> for ContiguousGrid<T, S> {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn granularity(&self) -> usize {
        self.granularity
    }

    fn row_pitch(&self) -> usize {
        self.row_pitch
    }

    fn padded_row(&self, index: usize) -> Result<&[T], GridError> {
        let start = self.row_start(index)?;
        Ok(&self.storage.as_slice()[start..start + self.row_pitch])
    }

    fn padded_rows(&self) -> PaddedRows<'_, T> {
        PaddedRows::new(RowSource::strided(
            self.as_slice(),
            self.row_pitch,
            self.height,
        ))
    }
}

impl<T, S: Storage<T>> fmt::Debug for ContiguousGrid<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ContiguousGrid({}x{}, pitch {}, capacity {})",
            self.width,
            self.height,
            self.row_pitch,
            self.storage.len()
        )
    }
}

fn split_rows<T>(data: &[T], pitch: usize, height: usize) -> Vec<&[T]> {
    if pitch == 0 {
        return vec![&data[..0]; height];
    }
    data[..pitch * height].chunks_exact(pitch).collect()
}

fn split_rows_mut<T>(data: &mut [T], pitch: usize, height: usize) -> Vec<&mut [T]> {
    if pitch == 0 {
        return (0..height).map(|_| <&mut [T]>::default()).collect();
    }
    data[..pitch * height].chunks_exact_mut(pitch).collect()
}
