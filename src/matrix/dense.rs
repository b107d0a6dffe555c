//! Dense‐matrix API on top of Faer.
//!
//! This module provides the `DenseMatrix` trait and its implementation for the `faer::Mat<T>` type,
//! enabling construction from raw column-major storage or from a sparse level operator.

use crate::core::traits::{Indexing, MatVec};
use crate::matrix::sparse::CsrMatrix;
use faer::Mat;

/// Blanket impl so any Faer Mat<T> is a DenseMatrix.
pub trait DenseMatrix<T>: MatVec<Vec<T>> + Indexing {
    /// Construct from raw column-major storage.
    fn from_raw(nrows: usize, ncols: usize, data: Vec<T>) -> Self;
    /// Densify a CSR matrix.
    fn from_csr(a: &CsrMatrix<T>) -> Self;
}

impl<T: num_traits::Float + Send + Sync> DenseMatrix<T> for Mat<T> {
    fn from_raw(nrows: usize, ncols: usize, data: Vec<T>) -> Self {
        Mat::from_fn(nrows, ncols, |i, j| data[j * nrows + i])
    }

    fn from_csr(a: &CsrMatrix<T>) -> Self {
        let mut m = Mat::from_fn(a.nrows(), a.ncols(), |_, _| T::zero());
        for i in 0..a.nrows() {
            for (j, v) in a.row(i) {
                m[(i, j)] = v;
            }
        }
        m
    }
}
