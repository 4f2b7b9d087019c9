//! Small ndarray-like types used throughout the crate.
//!
//! Provides `Array2` (row-major 2D) and `Array1` (1D) containers with the
//! handful of operations the regressors and ensembles need: row/column
//! gathering, matrix-vector products and column statistics.
pub mod matrix;
pub mod vector;

pub use matrix::{Array2, ShapeError};
pub use vector::Array1;
