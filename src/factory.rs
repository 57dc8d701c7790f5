//! Entry point for creating grids.

use core::fmt;

use log::debug;

use crate::Element;
use crate::buffer::ContiguousGrid;
use crate::error::GridError;
use crate::owned::OwnedGrid;
use crate::pitch::{Padding, buffer_len};
use crate::pool::BufferPool;
use crate::storage::Storage;
use crate::transient::TransientGrid;
use crate::view::Image2D;

/// Creates transient and pooled grids.
///
/// Holds a pool handle and a default [`Padding`]. Every method takes an
/// optional padding override; `None` uses the factory default.
///
/// ```
/// use zenframe::{GridFactory, Image2D, Padding};
///
/// let factory = GridFactory::<f32>::new().with_padding(Padding::Elements(8));
/// let mut owned = factory.create_pooled(11, 3, None, true)?;
/// let grid = owned.grid_mut()?;
/// assert_eq!(grid.row_pitch(), 16);
/// grid.row_mut(2)?[10] = 1.0;
/// owned.release();
/// # Ok::<(), zenframe::GridError>(())
/// ```
pub struct GridFactory<T> {
    pool: BufferPool<T>,
    padding: Padding,
}

impl<T: Element> Default for GridFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> GridFactory<T> {
    /// Factory with a fresh pool and native padding.
    pub fn new() -> Self {
        Self {
            pool: BufferPool::new(),
            padding: Padding::Native,
        }
    }

    /// Rent from `pool` instead.
    pub fn with_pool(mut self, pool: BufferPool<T>) -> Self {
        self.pool = pool;
        self
    }

    /// Set the default padding.
    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    /// The pool pooled grids are rented from.
    pub fn pool(&self) -> &BufferPool<T> {
        &self.pool
    }

    /// The default padding.
    pub fn padding(&self) -> Padding {
        self.padding
    }

    fn granularity(&self, padding: Option<Padding>) -> usize {
        padding.unwrap_or(self.padding).granularity::<T>()
    }

    /// Elements needed to back a `width` x `height` grid:
    /// `row_pitch * height`. Use it to size adopted storage.
    ///
    /// # Errors
    ///
    /// [`GridError::InvalidConfiguration`] or [`GridError::Overflow`].
    pub fn required_buffer_size(
        &self,
        width: usize,
        height: usize,
        padding: Option<Padding>,
    ) -> Result<usize, GridError> {
        buffer_len(width, height, self.granularity(padding))
    }

    /// A jagged grid of `height` separately allocated, default-filled rows.
    ///
    /// # Errors
    ///
    /// [`GridError::InvalidConfiguration`] or [`GridError::Overflow`].
    pub fn create_transient(
        &self,
        width: usize,
        height: usize,
        padding: Option<Padding>,
    ) -> Result<TransientGrid<T>, GridError> {
        TransientGrid::new(width, height, self.granularity(padding))
    }

    /// A contiguous grid over a buffer rented from the pool.
    ///
    /// Without `clear` the contents are whatever the previous renter left.
    ///
    /// # Errors
    ///
    /// [`GridError::InvalidConfiguration`] or [`GridError::Overflow`].
    pub fn create_pooled(
        &self,
        width: usize,
        height: usize,
        padding: Option<Padding>,
        clear: bool,
    ) -> Result<OwnedGrid<T>, GridError> {
        let granularity = self.granularity(padding);
        let required = buffer_len(width, height, granularity)?;
        let lease = self.pool.rent(required);
        let mut grid = ContiguousGrid::new(lease, width, height, granularity)?;
        if clear {
            grid.clear();
        }
        Ok(OwnedGrid::adopt(grid))
    }

    /// A pooled grid shaped like `source`, with its pixels copied in.
    ///
    /// # Errors
    ///
    /// Same as [`create_pooled`](Self::create_pooled).
    pub fn create_pooled_copy<I: Image2D<T> + ?Sized>(
        &self,
        source: &I,
        padding: Option<Padding>,
    ) -> Result<OwnedGrid<T>, GridError> {
        let mut owned = self.create_pooled(source.width(), source.height(), padding, false)?;
        owned.grid_mut()?.copy_from(source);
        Ok(owned)
    }

    /// Take ownership of caller-supplied storage and lay a grid over it.
    ///
    /// Releasing the returned handle drops `storage`, which runs its own
    /// release procedure.
    ///
    /// # Errors
    ///
    /// [`GridError::BufferTooSmall`] if `storage` cannot hold the shape.
    /// Validation happens before `clear`, so a failed call writes nothing;
    /// the storage is dropped.
    pub fn adopt<S: Storage<T>>(
        &self,
        storage: S,
        width: usize,
        height: usize,
        padding: Option<Padding>,
        clear: bool,
    ) -> Result<OwnedGrid<T, S>, GridError> {
        let mut grid = ContiguousGrid::new(storage, width, height, self.granularity(padding))?;
        if clear {
            grid.clear();
        }
        Ok(OwnedGrid::adopt(grid))
    }

    /// Run `f` on a pooled grid, returning the buffer to the pool on every
    /// exit path.
    ///
    /// # Errors
    ///
    /// Same as [`create_pooled`](Self::create_pooled).
    pub fn with_pooled<R>(
        &self,
        width: usize,
        height: usize,
        padding: Option<Padding>,
        clear: bool,
        f: impl FnOnce(&mut ContiguousGrid<T>) -> R,
    ) -> Result<R, GridError> {
        let mut owned = self.create_pooled(width, height, padding, clear)?;
        let result = f(owned.grid_mut()?);
        owned.release();
        debug!("scoped {width}x{height} grid returned to pool");
        Ok(result)
    }
}

impl<T> fmt::Debug for GridFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridFactory")
            .field("padding", &self.padding)
            .field("pool", &self.pool)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::native_lanes;
    use alloc::vec;

    fn factory() -> GridFactory<f64> {
        GridFactory::new().with_padding(Padding::Elements(8))
    }

    #[test]
    fn required_size_uses_default_and_override() {
        let f = factory();
        assert_eq!(f.required_buffer_size(11, 3, None), Ok(48));
        assert_eq!(f.required_buffer_size(11, 3, Some(Padding::NONE)), Ok(33));
        assert_eq!(
            f.required_buffer_size(11, 3, Some(Padding::Elements(12))),
            Err(GridError::InvalidConfiguration { granularity: 12 })
        );
    }

    #[test]
    fn transient_defaults_to_native_lanes() {
        let grid = GridFactory::<u8>::new().create_transient(1, 2, None).unwrap();
        assert_eq!(grid.granularity(), native_lanes::<u8>());
        assert_eq!(grid.row_pitch(), native_lanes::<u8>());
        assert_eq!(grid.height(), 2);
    }

    #[test]
    fn pooled_grid_is_cleared_on_request() {
        let f = factory();
        {
            let mut dirty = f.create_pooled(11, 3, None, false).unwrap();
            dirty.grid_mut().unwrap().as_mut_slice().fill(4.0);
        }
        let clean = f.create_pooled(11, 3, None, true).unwrap();
        let grid = clean.grid().unwrap();
        assert_eq!(grid.row_pitch(), 16);
        assert!(grid.storage().iter().all(|&v| v == 0.0));
        assert_eq!(f.pool().stats().reused, 1);
    }

    #[test]
    fn pooled_copy_matches_source() {
        let f = factory();
        let mut src = f.create_transient(5, 4, Some(Padding::NONE)).unwrap();
        src.row_mut(3).unwrap()[4] = 6.5;
        let owned = f.create_pooled_copy(&src, None).unwrap();
        let grid = owned.grid().unwrap();
        assert_eq!((grid.width(), grid.height(), grid.row_pitch()), (5, 4, 8));
        assert!(grid.pixel_values().eq(src.pixel_values()));
    }

    #[test]
    fn adopt_too_small_writes_nothing() {
        let f = factory();
        let mut raw = vec![3.0; 40];
        let err = f.adopt(&mut raw[..], 11, 3, None, true).unwrap_err();
        assert_eq!(
            err,
            GridError::BufferTooSmall {
                required: 48,
                actual: 40
            }
        );
        assert!(raw.iter().all(|&v| v == 3.0));
    }

    #[test]
    fn adopt_clears_and_exposes_storage() {
        let f = factory();
        let mut raw = vec![3.0; 50];
        {
            let mut owned = f.adopt(&mut raw[..], 11, 3, None, true).unwrap();
            owned.grid_mut().unwrap().row_mut(1).unwrap()[0] = 1.0;
        }
        assert_eq!(raw[16], 1.0);
        assert_eq!(raw.iter().filter(|&&v| v != 0.0).count(), 1);
    }

    #[test]
    fn with_pooled_returns_buffer() {
        let f = factory();
        let sum = f
            .with_pooled(4, 4, None, true, |grid| {
                grid.row_mut(0).unwrap()[0] = 2.0;
                grid.pixel_values().sum::<f64>()
            })
            .unwrap();
        assert_eq!(sum, 2.0);
        assert_eq!(f.pool().retained(), 1);
    }
}
