//! Single-owner handle over a grid's memory.

use core::fmt;

use log::debug;

use crate::buffer::ContiguousGrid;
use crate::error::GridError;
use crate::pool::PoolLease;
use crate::storage::Storage;
use crate::view::Image2D;

/// Owns a [`ContiguousGrid`] and, through it, the grid's storage.
///
/// The handle is move-only: passing it on transfers ownership. Memory is
/// released once, either by [`release`](Self::release) or when the handle
/// is dropped, and goes back wherever the storage came from (a pooled
/// lease returns to its pool, adopted storage runs its own `Drop`). After
/// release, [`grid`](Self::grid) and [`grid_mut`](Self::grid_mut) fail with
/// [`GridError::Disposed`].
pub struct OwnedGrid<T, S = PoolLease<T>> {
    grid: Option<ContiguousGrid<T, S>>,
}

impl<T, S: Storage<T>> OwnedGrid<T, S> {
    /// Take ownership of a grid.
    pub fn adopt(grid: ContiguousGrid<T, S>) -> Self {
        debug!(
            "owning {}x{} grid (pitch {}, capacity {})",
            grid.width(),
            grid.height(),
            grid.row_pitch(),
            grid.capacity()
        );
        Self { grid: Some(grid) }
    }

    /// The grid.
    ///
    /// # Errors
    ///
    /// [`GridError::Disposed`] after release.
    pub fn grid(&self) -> Result<&ContiguousGrid<T, S>, GridError> {
        self.grid.as_ref().ok_or(GridError::Disposed)
    }

    /// The grid, mutably.
    ///
    /// # Errors
    ///
    /// [`GridError::Disposed`] after release.
    pub fn grid_mut(&mut self) -> Result<&mut ContiguousGrid<T, S>, GridError> {
        self.grid.as_mut().ok_or(GridError::Disposed)
    }

    /// Release the memory now. Later calls do nothing.
    pub fn release(&mut self) {
        if let Some(grid) = self.grid.take() {
            debug!("releasing {grid:?}");
            drop(grid);
        }
    }

    /// Whether the memory has been released.
    #[inline]
    pub fn is_released(&self) -> bool {
        self.grid.is_none()
    }

    /// Give up the handle and keep the grid, storage included.
    ///
    /// # Errors
    ///
    /// [`GridError::Disposed`] after release.
    pub fn into_grid(mut self) -> Result<ContiguousGrid<T, S>, GridError> {
        self.grid.take().ok_or(GridError::Disposed)
    }
}

impl<T, S: Storage<T>> fmt::Debug for OwnedGrid<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.grid {
            Some(grid) => write!(f, "OwnedGrid({grid:?})"),
            None => f.write_str("OwnedGrid(released)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::BufferPool;
    use alloc::vec;

    #[test]
    fn release_disposes_grid() {
        let mut owned = OwnedGrid::adopt(ContiguousGrid::new(vec![0u8; 16], 4, 4, 4).unwrap());
        assert!(owned.grid().is_ok());
        owned.release();
        assert!(owned.is_released());
        assert_eq!(owned.grid().unwrap_err(), GridError::Disposed);
        assert_eq!(owned.grid_mut().unwrap_err(), GridError::Disposed);
        // Second release is a no-op.
        owned.release();
        assert_eq!(alloc::format!("{owned:?}"), "OwnedGrid(released)");
    }

    #[test]
    fn released_lease_is_reused() {
        let pool = BufferPool::<f32>::new();
        let lease = pool.rent(48);
        let ptr = lease.as_ptr();
        let mut owned = OwnedGrid::adopt(ContiguousGrid::new(lease, 11, 3, 8).unwrap());
        owned.grid_mut().unwrap().row_mut(0).unwrap()[0] = 1.0;
        owned.release();
        assert_eq!(pool.retained(), 1);
        assert_eq!(pool.rent(40).as_ptr(), ptr);
    }

    #[test]
    fn drop_releases() {
        let pool = BufferPool::<u8>::new();
        {
            let _owned = OwnedGrid::adopt(ContiguousGrid::new(pool.rent(64), 8, 8, 8).unwrap());
            assert_eq!(pool.retained(), 0);
        }
        assert_eq!(pool.retained(), 1);
    }

    #[test]
    fn into_grid_transfers_storage() {
        let owned = OwnedGrid::adopt(ContiguousGrid::new(vec![7u16; 4], 2, 2, 1).unwrap());
        let grid = owned.into_grid().unwrap();
        assert_eq!(grid.into_storage(), vec![7u16; 4]);
    }
}
