//! Row and pixel iteration.
//!
//! Every grid and view walks its rows through [`PaddedRows`], and every
//! pixel iterator is built on top of that, so there is exactly one place
//! where column/row coordinates are produced.

use alloc::boxed::Box;
use core::iter::FusedIterator;
use core::slice;

/// Where the rows of an image come from.
pub(crate) enum RowSource<'a, T> {
    /// A table of shared row slices.
    Shared(slice::Iter<'a, &'a [T]>),
    /// A table of exclusive row slices, read through a shared borrow.
    Exclusive(slice::Iter<'a, &'a mut [T]>),
    /// Individually allocated rows.
    Boxed(slice::Iter<'a, Box<[T]>>),
    /// One contiguous block cut every `pitch` elements.
    Strided {
        data: &'a [T],
        pitch: usize,
        remaining: usize,
    },
}

impl<'a, T> RowSource<'a, T> {
    pub(crate) fn strided(data: &'a [T], pitch: usize, height: usize) -> Self {
        Self::Strided {
            data,
            pitch,
            remaining: height,
        }
    }
}

/// Iterator over the full padded rows of an image, top to bottom.
///
/// Each item is `row_pitch` elements long (or longer, for views over
/// foreign strided memory).
pub struct PaddedRows<'a, T> {
    source: RowSource<'a, T>,
}

impl<'a, T> PaddedRows<'a, T> {
    pub(crate) fn new(source: RowSource<'a, T>) -> Self {
        Self { source }
    }
}

impl<'a, T> Iterator for PaddedRows<'a, T> {
    type Item = &'a [T];

    fn next(&mut self) -> Option<&'a [T]> {
        match &mut self.source {
            RowSource::Shared(rows) => rows.next().copied(),
            RowSource::Exclusive(rows) => rows.next().map(|row| &**row),
            RowSource::Boxed(rows) => rows.next().map(|row| &**row),
            RowSource::Strided {
                data,
                pitch,
                remaining,
            } => {
                if *remaining == 0 {
                    return None;
                }
                *remaining -= 1;
                let block: &'a [T] = *data;
                let (row, rest) = block.split_at((*pitch).min(block.len()));
                *data = rest;
                Some(row)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = match &self.source {
            RowSource::Shared(rows) => rows.len(),
            RowSource::Exclusive(rows) => rows.len(),
            RowSource::Boxed(rows) => rows.len(),
            RowSource::Strided { remaining, .. } => *remaining,
        };
        (len, Some(len))
    }
}

impl<T> ExactSizeIterator for PaddedRows<'_, T> {}

impl<T> FusedIterator for PaddedRows<'_, T> {}

/// A pixel value with its position.
///
/// `column` counts from the left edge of the image or view, `row` from
/// its top edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pixel<T> {
    /// Horizontal offset from the left edge.
    pub column: usize,
    /// Vertical offset from the top edge.
    pub row: usize,
    /// The element.
    pub value: T,
}

/// Pixel values in row-major order, padding excluded.
pub struct PixelValues<'a, T> {
    rows: PaddedRows<'a, T>,
    current: slice::Iter<'a, T>,
    width: usize,
}

impl<'a, T> PixelValues<'a, T> {
    pub(crate) fn new(rows: PaddedRows<'a, T>, width: usize) -> Self {
        Self {
            rows,
            current: Default::default(),
            width,
        }
    }
}

impl<T: Copy> Iterator for PixelValues<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        loop {
            if let Some(value) = self.current.next() {
                return Some(*value);
            }
            let row = self.rows.next()?;
            self.current = row[..self.width].iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.current.len() + self.rows.len() * self.width;
        (len, Some(len))
    }
}

impl<T: Copy> ExactSizeIterator for PixelValues<'_, T> {}

impl<T: Copy> FusedIterator for PixelValues<'_, T> {}

/// Pixels with their `(column, row)` coordinates in row-major order.
pub struct Pixels<'a, T> {
    values: PixelValues<'a, T>,
    index: usize,
}

impl<'a, T> Pixels<'a, T> {
    pub(crate) fn new(values: PixelValues<'a, T>) -> Self {
        Self { values, index: 0 }
    }
}

impl<T: Copy> Iterator for Pixels<'_, T> {
    type Item = Pixel<T>;

    fn next(&mut self) -> Option<Pixel<T>> {
        let value = self.values.next()?;
        // A value was produced, so width is non-zero.
        let width = self.values.width;
        let pixel = Pixel {
            column: self.index % width,
            row: self.index / width,
            value,
        };
        self.index += 1;
        Some(pixel)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.values.size_hint()
    }
}

impl<T: Copy> ExactSizeIterator for Pixels<'_, T> {}

impl<T: Copy> FusedIterator for Pixels<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    #[test]
    fn strided_rows_split_block() {
        let data = [1, 2, 3, 0, 4, 5, 6, 0];
        let rows: Vec<&[i32]> = PaddedRows::new(RowSource::strided(&data, 4, 2)).collect();
        assert_eq!(rows, vec![&[1, 2, 3, 0][..], &[4, 5, 6, 0][..]]);
    }

    #[test]
    fn zero_pitch_yields_empty_rows() {
        let data: [u8; 0] = [];
        let rows = PaddedRows::new(RowSource::strided(&data, 0, 3));
        assert_eq!(rows.len(), 3);
        assert!(rows.into_iter().all(|row| row.is_empty()));
    }

    #[test]
    fn values_skip_padding() {
        let data = [1, 2, 3, 9, 4, 5, 6, 9];
        let rows = PaddedRows::new(RowSource::strided(&data, 4, 2));
        let values = PixelValues::new(rows, 3);
        assert_eq!(values.len(), 6);
        assert_eq!(values.collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn coordinates_are_column_then_row() {
        let data = [10, 11, 0, 0, 20, 21, 0, 0, 30, 31, 0, 0];
        let rows = PaddedRows::new(RowSource::strided(&data, 4, 3));
        let pixels: Vec<_> = Pixels::new(PixelValues::new(rows, 2)).collect();
        assert_eq!(pixels.len(), 6);
        assert_eq!(
            pixels[3],
            Pixel {
                column: 1,
                row: 1,
                value: 21
            }
        );
        assert_eq!(
            pixels[4],
            Pixel {
                column: 0,
                row: 2,
                value: 30
            }
        );
    }

    #[test]
    fn zero_width_is_empty() {
        let data = [1u8; 8];
        let rows = PaddedRows::new(RowSource::strided(&data, 4, 2));
        assert_eq!(Pixels::new(PixelValues::new(rows, 0)).count(), 0);
    }
}
