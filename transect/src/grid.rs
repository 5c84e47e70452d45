//! Dense 2-D arrays, optionally masked.

use crate::{TransectError, C};
use serde::{Deserialize, Serialize};

/// Row-major 2-D array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Copy> Grid<T> {
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self, TransectError> {
        if data.len() == rows * cols {
            Ok(Self { rows, cols, data })
        } else {
            Err(TransectError::ShapeMismatch {
                expected: rows * cols,
                actual: data.len(),
            })
        }
    }

    /// Builds a grid from equal-length rows.
    pub fn from_rows(rows: &[Vec<T>]) -> Result<Self, TransectError> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(TransectError::ShapeMismatch {
                    expected: cols,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) {
        self.data[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[T] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn map<U: Copy, F: Fn(T) -> U>(&self, f: F) -> Grid<U> {
        Grid {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|v| f(*v)).collect(),
        }
    }
}

/// A grid of values with a parallel mask, `true` marking cells
/// without valid data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskedGrid {
    pub values: Grid<C>,
    pub mask: Grid<bool>,
}

/// Equal masks and equal unmasked values; whatever sits under the mask
/// is ignored.
impl PartialEq for MaskedGrid {
    fn eq(&self, other: &Self) -> bool {
        self.mask == other.mask
            && self
                .values
                .as_slice()
                .iter()
                .zip(other.values.as_slice())
                .zip(self.mask.as_slice())
                .all(|((a, b), masked)| *masked || a == b)
    }
}

impl MaskedGrid {
    /// Non-finite values are masked.
    pub fn from_options(rows: usize, cols: usize, cells: Vec<Option<C>>) -> Result<Self, TransectError> {
        let mask = cells.iter().map(|c| !c.is_some_and(C::is_finite)).collect();
        let values = cells.into_iter().map(|c| c.unwrap_or(C::NAN)).collect();
        Ok(Self {
            values: Grid::from_vec(rows, cols, values)?,
            mask: Grid::from_vec(rows, cols, mask)?,
        })
    }

    /// Masks every non-finite value.
    pub fn from_values(values: Grid<C>) -> Self {
        let mask = values.map(|v| !v.is_finite());
        Self { values, mask }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.shape()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<C> {
        (!self.mask.get(row, col)).then(|| self.values.get(row, col))
    }

    pub fn set(&mut self, row: usize, col: usize, value: Option<C>) {
        self.mask.set(row, col, value.is_none());
        self.values.set(row, col, value.unwrap_or(C::NAN));
    }

    pub fn is_masked(&self, row: usize, col: usize) -> bool {
        self.mask.get(row, col)
    }

    pub fn masked_count(&self) -> usize {
        self.mask.as_slice().iter().filter(|m| **m).count()
    }

    /// Applies `f` to every unmasked value.
    #[must_use]
    pub fn map_valid<F: Fn(C) -> C>(&self, f: F) -> Self {
        let (rows, cols) = self.shape();
        let mut out = self.clone();
        for row in 0..rows {
            for col in 0..cols {
                if let Some(v) = self.get(row, col) {
                    out.set(row, col, Some(f(v)));
                }
            }
        }
        out
    }

    /// Combines two same-shaped grids cell by cell; the result is
    /// masked wherever either input is.
    pub fn zip_with<F: Fn(C, C) -> C>(&self, other: &Self, f: F) -> Result<Self, TransectError> {
        if self.shape() != other.shape() {
            let (rows, cols) = other.shape();
            return Err(TransectError::ShapeMismatch {
                expected: self.values.as_slice().len(),
                actual: rows * cols,
            });
        }
        let (rows, cols) = self.shape();
        let mut out = self.clone();
        for row in 0..rows {
            for col in 0..cols {
                let v = self
                    .get(row, col)
                    .zip(other.get(row, col))
                    .map(|(a, b)| f(a, b));
                out.set(row, col, v);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::{Grid, MaskedGrid, TransectError};

    #[test]
    fn test_grid_layout() {
        let g = Grid::from_rows(&[vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
        assert_eq!(g.shape(), (2, 3));
        assert_eq!(g.get(1, 0), 4);
        assert_eq!(g.row(0), &[1, 2, 3]);
        assert!(matches!(
            Grid::from_rows(&[vec![1], vec![1, 2]]),
            Err(TransectError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_masked_ops() {
        let a = MaskedGrid::from_options(1, 3, vec![Some(1.0), None, Some(f64::NAN)]).unwrap();
        assert_eq!(a.masked_count(), 2);
        assert_eq!(a.get(0, 0), Some(1.0));
        assert_eq!(a.get(0, 1), None);

        let b = MaskedGrid::from_options(1, 3, vec![Some(0.5), Some(2.0), Some(2.0)]).unwrap();
        let diff = a.zip_with(&b, |x, y| x - y).unwrap();
        assert_eq!(diff.get(0, 0), Some(0.5));
        assert_eq!(diff.masked_count(), 2);

        let doubled = b.map_valid(|v| v * 2.0);
        assert_eq!(doubled.get(0, 1), Some(4.0));
    }

    #[test]
    fn test_masked_cells_ignored_by_eq() {
        let a = MaskedGrid::from_options(1, 3, vec![Some(1.0), None, Some(3.0)]).unwrap();
        assert_eq!(a, a.clone());

        let mut b = a.clone();
        b.values.set(0, 1, -999.0);
        assert_eq!(a, b);

        b.set(0, 2, Some(3.5));
        assert_ne!(a, b);
        b.set(0, 2, None);
        assert_ne!(a, b);
    }
}
