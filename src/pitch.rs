//! Row pitch arithmetic.
//!
//! Rows are padded up to a multiple of the padding granularity (usually the
//! number of `T` lanes in a native vector register) so vector loops can run
//! over a whole padded row without a scalar tail.

use crate::error::GridError;

/// Width in bytes of the widest vector register enabled for this build.
const VECTOR_BYTES: usize = if cfg!(target_feature = "avx512f") {
    64
} else if cfg!(target_feature = "avx2") {
    32
} else {
    16
};

/// Number of `T` lanes in a native vector register.
///
/// Always a power of two and at least 1. Element types whose size is not a
/// power of two get the largest power of two that still fits in a register.
pub const fn native_lanes<T>() -> usize {
    let size = core::mem::size_of::<T>();
    if size == 0 || size >= VECTOR_BYTES {
        return 1;
    }
    let lanes = VECTOR_BYTES / size;
    1 << (usize::BITS - 1 - lanes.leading_zeros())
}

/// Padded length of a row of `width` elements.
///
/// Returns the smallest multiple of `granularity` that is `>= width`;
/// `width` itself when it is already a multiple (so `0` stays `0`).
///
/// # Errors
///
/// [`GridError::InvalidConfiguration`] if `granularity` is not a power of
/// two, [`GridError::Overflow`] if the padded width does not fit in `usize`.
///
/// ```
/// use zenframe::row_pitch;
///
/// assert_eq!(row_pitch(11, 8), Ok(16));
/// assert_eq!(row_pitch(11, 1), Ok(11));
/// assert_eq!(row_pitch(0, 16), Ok(0));
/// ```
pub const fn row_pitch(width: usize, granularity: usize) -> Result<usize, GridError> {
    if !granularity.is_power_of_two() {
        return Err(GridError::InvalidConfiguration { granularity });
    }
    let mask = granularity - 1;
    if width & mask == 0 {
        return Ok(width);
    }
    match (width | mask).checked_add(1) {
        Some(pitch) => Ok(pitch),
        None => Err(GridError::Overflow),
    }
}

/// Elements needed to hold `height` padded rows: `row_pitch * height`.
pub fn buffer_len(width: usize, height: usize, granularity: usize) -> Result<usize, GridError> {
    row_pitch(width, granularity)?
        .checked_mul(height)
        .ok_or(GridError::Overflow)
}

/// Padding granularity selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Padding {
    /// Pad to the native vector width for the element type
    /// ([`native_lanes`]).
    #[default]
    Native,
    /// Pad to an explicit number of elements. Must be a power of two;
    /// `Elements(1)` disables padding.
    Elements(usize),
}

impl Padding {
    /// No padding: row pitch equals width.
    pub const NONE: Self = Self::Elements(1);

    /// Resolve to a granularity in elements of `T`.
    #[inline]
    pub const fn granularity<T>(self) -> usize {
        match self {
            Self::Native => native_lanes::<T>(),
            Self::Elements(n) => n,
        }
    }
}

impl From<usize> for Padding {
    fn from(granularity: usize) -> Self {
        Self::Elements(granularity)
    }
}
