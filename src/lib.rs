//! Padded, vector-aligned 2-D element buffers.
//!
//! Rows are padded up to a multiple of a granularity (by default the
//! number of `T` lanes in a native vector register) so vector code can run
//! over a whole row, padding included, without a scalar tail.
//!
//! - [`row_pitch`] / [`Padding`]: the padding arithmetic
//! - [`BufferPool`] / [`PoolLease`]: size-bucketed recycling of large buffers
//! - [`ContiguousGrid`]: one block of `row_pitch * height` elements, with
//!   copy and in-place compaction
//! - [`OwnedGrid`]: single-owner handle that releases the grid's storage
//! - [`GridView`] / [`GridViewMut`]: borrowed rectangular views, sliceable
//!   without copying
//! - [`TransientGrid`]: one allocation per row
//! - [`GridFactory`]: creates all of the above
//!
//! Views borrow the memory they look at, so a view can never outlive its
//! grid or observe a grid halfway through compaction.
//!
//! ```
//! use zenframe::{GridFactory, Image2D, Padding};
//!
//! let factory = GridFactory::<f64>::new().with_padding(Padding::Elements(8));
//! let mut owned = factory.create_pooled(30, 10, None, true)?;
//! let grid = owned.grid_mut()?;
//! assert_eq!(grid.row_pitch(), 32);
//!
//! grid.view_mut().row_mut(2)?[3] = 3.4;
//! grid.compact_slice(3, 2, 11, 4)?;
//! assert_eq!(grid.row_pitch(), 16);
//! assert_eq!(grid.row(0)?[0], 3.4);
//! # Ok::<(), zenframe::GridError>(())
//! ```

#![no_std]
#![forbid(unsafe_code)]

extern crate alloc;

mod buffer;
mod error;
mod factory;
mod owned;
mod pitch;
mod pixels;
mod pool;
mod storage;
mod transient;
mod view;

pub use buffer::ContiguousGrid;
pub use error::GridError;
pub use factory::GridFactory;
pub use owned::OwnedGrid;
pub use pitch::{Padding, buffer_len, native_lanes, row_pitch};
pub use pixels::{PaddedRows, Pixel, PixelValues, Pixels};
pub use pool::{BufferPool, MIN_BUCKET_LEN, PoolConfig, PoolLease, PoolStats};
pub use storage::Storage;
pub use transient::TransientGrid;
pub use view::{GridView, GridViewMut, Image2D};

// Re-exports for callers bridging from `imgref` images.
pub use imgref::{Img, ImgRef};

/// Element types a grid can hold.
///
/// `Default` is the value written by clearing.
pub trait Element: Copy + Default + Send + Sync + 'static {}

impl<T: Copy + Default + Send + Sync + 'static> Element for T {}
