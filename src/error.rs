//! Errors from grid, view, pool and factory operations.

use core::fmt;

/// Errors from padded grid operations.
///
/// Every variant describes a programmer error or a genuine capacity
/// mismatch; none of them is transient, so retrying the same call with the
/// same arguments fails the same way. Operations validate before they
/// mutate, so a returned error means nothing was changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum GridError {
    /// Padding granularity is not a power of two (zero included).
    InvalidConfiguration {
        /// The rejected granularity.
        granularity: usize,
    },
    /// A slice or compaction rectangle does not fit the current shape.
    ///
    /// Also returned when the padded window of the new rows (`left +
    /// row_pitch(width)`) would run past the end of a parent row.
    OutOfBounds {
        /// Requested left offset.
        left: usize,
        /// Requested top offset.
        top: usize,
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
        /// Width of the view or grid being sliced.
        bound_width: usize,
        /// Height of the view or grid being sliced.
        bound_height: usize,
    },
    /// A supplied or rented buffer cannot hold the requested shape.
    BufferTooSmall {
        /// Elements needed (`row_pitch * height`).
        required: usize,
        /// Elements available.
        actual: usize,
    },
    /// The owned grid has already released its memory.
    Disposed,
    /// Row index is not below the height.
    IndexOutOfRange {
        /// Requested row.
        index: usize,
        /// Number of rows.
        height: usize,
    },
    /// Size arithmetic overflowed `usize`.
    Overflow,
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfiguration { granularity } => {
                write!(f, "padding granularity {granularity} is not a power of two")
            }
            Self::OutOfBounds {
                left,
                top,
                width,
                height,
                bound_width,
                bound_height,
            } => write!(
                f,
                "rectangle {width}x{height} at ({left}, {top}) exceeds bounds {bound_width}x{bound_height}"
            ),
            Self::BufferTooSmall { required, actual } => write!(
                f,
                "buffer holds {actual} elements but {required} are required"
            ),
            Self::Disposed => write!(f, "memory has been released"),
            Self::IndexOutOfRange { index, height } => {
                write!(f, "row index {index} out of range (height: {height})")
            }
            Self::Overflow => write!(f, "grid size overflows usize"),
        }
    }
}

impl core::error::Error for GridError {}
