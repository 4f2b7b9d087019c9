use std::error::Error;
use std::fmt;
use std::ops::{Index, IndexMut, RangeBounds};

use num_traits::Zero;

use crate::math::vector::Array1;

/// Row-major 2D container. Rows are samples, columns are features.
#[derive(Clone, Debug, PartialEq)]
pub struct Array2<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T> Array2<T> {
    pub fn from_shape_vec(shape: (usize, usize), data: Vec<T>) -> Result<Self, ShapeError> {
        let (rows, cols) = shape;
        if data.len() != rows * cols {
            return Err(ShapeError {
                rows,
                cols,
                len: data.len(),
            });
        }
        Ok(Self { data, rows, cols })
    }

    /// Build a matrix from equally sized rows.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self, ShapeError> {
        let n_rows = rows.len();
        let n_cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for row in rows {
            if row.len() != n_cols {
                return Err(ShapeError {
                    rows: n_rows,
                    cols: n_cols,
                    len: row.len(),
                });
            }
            data.extend(row);
        }
        Ok(Self {
            data,
            rows: n_rows,
            cols: n_cols,
        })
    }

    pub fn nrows(&self) -> usize {
        self.rows
    }

    pub fn ncols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    #[inline]
    fn offset(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    pub fn row_slice(&self, row: usize) -> &[T] {
        let start = self.offset(row, 0);
        &self.data[start..start + self.cols]
    }

    pub fn row_slice_mut(&mut self, row: usize) -> &mut [T] {
        let start = self.offset(row, 0);
        let cols = self.cols;
        &mut self.data[start..start + cols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.rows).map(move |r| self.row_slice(r))
    }

    pub fn column(&self, col: usize) -> Array1<T>
    where
        T: Clone,
    {
        assert!(col < self.cols, "column index out of bounds");
        let mut values = Vec::with_capacity(self.rows);
        for row in 0..self.rows {
            values.push(self[(row, col)].clone());
        }
        Array1::from_vec(values)
    }

    /// Overwrite column `col` with `values`.
    pub fn set_column(&mut self, col: usize, values: &[T])
    where
        T: Clone,
    {
        assert!(col < self.cols, "column index out of bounds");
        assert_eq!(values.len(), self.rows, "column length must match row count");
        for (row, value) in values.iter().enumerate() {
            self[(row, col)] = value.clone();
        }
    }

    pub fn select_rows(&self, indices: &[usize]) -> Array2<T>
    where
        T: Clone,
    {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &row in indices {
            let slice = self.row_slice(row);
            data.extend_from_slice(slice);
        }
        Array2 {
            data,
            rows: indices.len(),
            cols: self.cols,
        }
    }

    pub fn select_columns<R>(&self, range: R) -> Array2<T>
    where
        R: RangeBounds<usize>,
        T: Clone,
    {
        use std::ops::Bound;

        let start = match range.start_bound() {
            Bound::Unbounded => 0,
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s + 1,
        };

        let end = match range.end_bound() {
            Bound::Unbounded => self.cols,
            Bound::Included(&e) => e + 1,
            Bound::Excluded(&e) => e,
        };

        assert!(
            start <= end && end <= self.cols,
            "column slice out of bounds"
        );

        let indices: Vec<usize> = (start..end).collect();
        self.select_column_indices(&indices)
    }

    /// Gather the given columns, in the given order.
    pub fn select_column_indices(&self, indices: &[usize]) -> Array2<T>
    where
        T: Clone,
    {
        assert!(
            indices.iter().all(|&c| c < self.cols),
            "column index out of bounds"
        );
        let mut data = Vec::with_capacity(self.rows * indices.len());
        for row in 0..self.rows {
            let slice = self.row_slice(row);
            data.extend(indices.iter().map(|&c| slice[c].clone()));
        }
        Array2 {
            data,
            rows: self.rows,
            cols: indices.len(),
        }
    }

    /// Append the rows of `other` below `self`.
    pub fn concat_rows(&self, other: &Array2<T>) -> Result<Array2<T>, ShapeError>
    where
        T: Clone,
    {
        if self.cols != other.cols {
            return Err(ShapeError {
                rows: self.rows + other.rows,
                cols: self.cols,
                len: self.data.len() + other.data.len(),
            });
        }
        let mut data = Vec::with_capacity(self.data.len() + other.data.len());
        data.extend_from_slice(&self.data);
        data.extend_from_slice(&other.data);
        Ok(Array2 {
            data,
            rows: self.rows + other.rows,
            cols: self.cols,
        })
    }

    pub fn mapv<U, F>(&self, mut f: F) -> Array2<U>
    where
        F: FnMut(&T) -> U,
    {
        Array2 {
            data: self.data.iter().map(|v| f(v)).collect(),
            rows: self.rows,
            cols: self.cols,
        }
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.data.clone()
    }
}

impl<T> Array2<T>
where
    T: Clone,
{
    pub fn from_elem(shape: (usize, usize), value: T) -> Self {
        let (rows, cols) = shape;
        Self {
            data: vec![value; rows * cols],
            rows,
            cols,
        }
    }

    /// Stack equally long columns side by side.
    pub fn from_columns(columns: &[Array1<T>]) -> Result<Self, ShapeError> {
        let cols = columns.len();
        let rows = columns.first().map(|c| c.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows * cols);
        if columns.iter().any(|c| c.len() != rows) {
            return Err(ShapeError {
                rows,
                cols,
                len: columns.iter().map(|c| c.len()).sum(),
            });
        }
        for row in 0..rows {
            for column in columns {
                data.push(column[row].clone());
            }
        }
        Ok(Self { data, rows, cols })
    }
}

impl<T> Array2<T>
where
    T: Clone + Zero,
{
    pub fn zeros(shape: (usize, usize)) -> Self {
        Self::from_elem(shape, T::zero())
    }
}

impl Array2<f64> {
    /// Matrix-vector product.
    pub fn dot(&self, w: &Array1<f64>) -> Array1<f64> {
        assert_eq!(
            self.cols,
            w.len(),
            "Matrix-vector product requires ncols == len"
        );
        self.rows()
            .map(|row| row.iter().zip(w.iter()).map(|(a, b)| a * b).sum::<f64>())
            .collect()
    }

    /// Column means, `None` for an empty matrix.
    pub fn mean_axis0(&self) -> Option<Array1<f64>> {
        if self.rows == 0 {
            return None;
        }
        let mut mean = vec![0.0; self.cols];
        for row in self.rows() {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        let n = self.rows as f64;
        Some(mean.into_iter().map(|m| m / n).collect())
    }

    /// Row means, one value per row.
    pub fn mean_axis1(&self) -> Array1<f64> {
        let n = self.cols.max(1) as f64;
        self.rows().map(|row| row.iter().sum::<f64>() / n).collect()
    }

    pub fn all_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

impl<T> Index<(usize, usize)> for Array2<T> {
    type Output = T;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        let offset = self.offset(index.0, index.1);
        &self.data[offset]
    }
}

impl<T> IndexMut<(usize, usize)> for Array2<T> {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Self::Output {
        let offset = self.offset(index.0, index.1);
        &mut self.data[offset]
    }
}

#[derive(Debug, Clone)]
pub struct ShapeError {
    rows: usize,
    cols: usize,
    len: usize,
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid shape ({}, {}) for buffer of length {}",
            self.rows, self.cols, self.len
        )
    }
}

impl Error for ShapeError {}
