//! Backing memory for contiguous grids.
//!
//! [`Storage`] abstracts "a block of `T` that someone owns". Dropping the
//! storage is its release procedure: a [`PoolLease`] goes back to its pool,
//! a `Vec` is freed, a borrowed slice is simply let go. Foreign or
//! unmanaged memory can be plugged in by implementing the trait on a type
//! whose `Drop` frees it.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::pool::PoolLease;

/// A contiguous block of elements owned by a single holder.
pub trait Storage<T> {
    /// The whole block.
    fn as_slice(&self) -> &[T];

    /// The whole block, mutably.
    fn as_mut_slice(&mut self) -> &mut [T];

    /// Number of elements in the block.
    #[inline]
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Whether the block is empty.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Storage<T> for PoolLease<T> {
    #[inline]
    fn as_slice(&self) -> &[T] {
        self
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [T] {
        self
    }
}

impl<T> Storage<T> for Vec<T> {
    #[inline]
    fn as_slice(&self) -> &[T] {
        self
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [T] {
        self
    }
}

impl<T> Storage<T> for Box<[T]> {
    #[inline]
    fn as_slice(&self) -> &[T] {
        self
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [T] {
        self
    }
}

impl<T> Storage<T> for &mut [T] {
    #[inline]
    fn as_slice(&self) -> &[T] {
        self
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [T] {
        self
    }
}
