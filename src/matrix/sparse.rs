//! Compressed sparse row storage for level operators.
//!
//! `CsrMatrix` keeps its column indices sorted and unique within every row, so the
//! transpose is again a valid CSR matrix and the CSC form handed to faer's sparse LU
//! needs no further normalization.

use crate::error::KError;
use faer::sparse::{SparseColMat, SymbolicSparseColMat};
use num_traits::Float;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// A read‐only sparse matrix supporting y = A * x.
pub trait SparseMatrix<T> {
    /// Number of rows.
    fn nrows(&self) -> usize;
    /// Number of columns.
    fn ncols(&self) -> usize;
    /// Number of stored entries.
    fn nnz(&self) -> usize;
    /// Compute y = A * x.  `x.len() == ncols()`, `y.len() == nrows()`.
    fn spmv(&self, x: &[T], y: &mut [T]);
}

#[derive(Clone, Debug, PartialEq)]
pub struct CsrMatrix<T> {
    nrows: usize,
    ncols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<T>,
}

impl<T> CsrMatrix<T> {
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Number of stored entries (explicit zeros included).
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn is_square(&self) -> bool {
        self.nrows == self.ncols
    }

    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    pub fn col_idx(&self) -> &[usize] {
        &self.col_idx
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Entries of row `i` as (column, value) pairs in column order.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, T)> + '_
    where
        T: Copy,
    {
        let range = self.row_ptr[i]..self.row_ptr[i + 1];
        self.col_idx[range.clone()].iter().copied().zip(self.values[range].iter().copied())
    }
}

impl<T: Float + Send + Sync> CsrMatrix<T> {
    /// Build a CSR from raw row‐ptr, col‐idx, and values.
    ///
    /// Rows may list their columns in any order; duplicates are summed.
    pub fn from_csr(
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self, KError> {
        KError::check_len("row pointer", nrows + 1, row_ptr.len())?;
        KError::check_len("CSR values", col_idx.len(), values.len())?;
        if row_ptr[0] != 0 || row_ptr[nrows] != col_idx.len() {
            return Err(KError::InvalidStructure(format!(
                "row pointer must run from 0 to {}, got {}..{}",
                col_idx.len(),
                row_ptr[0],
                row_ptr[nrows]
            )));
        }
        if let Some(i) = row_ptr.windows(2).position(|w| w[0] > w[1]) {
            return Err(KError::InvalidStructure(format!("row pointer decreases at row {i}")));
        }
        if let Some(&j) = col_idx.iter().find(|&&j| j >= ncols) {
            return Err(KError::InvalidStructure(format!(
                "column index {j} out of bounds for {ncols} columns"
            )));
        }

        let mut out_ptr = Vec::with_capacity(nrows + 1);
        let mut out_idx = Vec::with_capacity(col_idx.len());
        let mut out_val = Vec::with_capacity(values.len());
        out_ptr.push(0);
        let mut row: Vec<(usize, T)> = Vec::new();
        for i in 0..nrows {
            row.clear();
            row.extend((row_ptr[i]..row_ptr[i + 1]).map(|k| (col_idx[k], values[k])));
            row.sort_by_key(|&(j, _)| j);
            for &(j, v) in row.iter() {
                if out_idx.len() > out_ptr[i] && out_idx[out_idx.len() - 1] == j {
                    let last = out_val.len() - 1;
                    out_val[last] = out_val[last] + v;
                } else {
                    out_idx.push(j);
                    out_val.push(v);
                }
            }
            out_ptr.push(out_idx.len());
        }
        Ok(Self { nrows, ncols, row_ptr: out_ptr, col_idx: out_idx, values: out_val })
    }

    /// Build from (row, col, value) triplets; duplicate positions are summed.
    pub fn from_triplets(nrows: usize, ncols: usize, triplets: &[(usize, usize, T)]) -> Result<Self, KError> {
        let mut counts = vec![0usize; nrows + 1];
        for &(i, _, _) in triplets {
            if i >= nrows {
                return Err(KError::InvalidStructure(format!(
                    "row index {i} out of bounds for {nrows} rows"
                )));
            }
            counts[i + 1] += 1;
        }
        for i in 0..nrows {
            counts[i + 1] += counts[i];
        }
        let mut next = counts.clone();
        let mut col_idx = vec![0usize; triplets.len()];
        let mut values = vec![T::zero(); triplets.len()];
        for &(i, j, v) in triplets {
            col_idx[next[i]] = j;
            values[next[i]] = v;
            next[i] += 1;
        }
        Self::from_csr(nrows, ncols, counts, col_idx, values)
    }

    /// Build from a dense generator, storing only the nonzero entries.
    pub fn from_fn(nrows: usize, ncols: usize, f: impl Fn(usize, usize) -> T) -> Self {
        let mut row_ptr = vec![0; nrows + 1];
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        for i in 0..nrows {
            for j in 0..ncols {
                let v = f(i, j);
                if v != T::zero() {
                    col_idx.push(j);
                    values.push(v);
                }
            }
            row_ptr[i + 1] = col_idx.len();
        }
        Self { nrows, ncols, row_ptr, col_idx, values }
    }

    pub fn identity(n: usize) -> Self {
        Self {
            nrows: n,
            ncols: n,
            row_ptr: (0..=n).collect(),
            col_idx: (0..n).collect(),
            values: vec![T::one(); n],
        }
    }

    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self { nrows, ncols, row_ptr: vec![0; nrows + 1], col_idx: Vec::new(), values: Vec::new() }
    }

    /// Value at (i, j), zero when not stored.
    pub fn get(&self, i: usize, j: usize) -> T {
        let range = self.row_ptr[i]..self.row_ptr[i + 1];
        match self.col_idx[range.clone()].binary_search(&j) {
            Ok(k) => self.values[range.start + k],
            Err(_) => T::zero(),
        }
    }

    pub fn diagonal(&self) -> Vec<T> {
        (0..self.nrows.min(self.ncols)).map(|i| self.get(i, i)).collect()
    }

    fn row_dot(&self, i: usize, x: &[T]) -> T {
        let mut sum = T::zero();
        for k in self.row_ptr[i]..self.row_ptr[i + 1] {
            sum = sum + self.values[k] * x[self.col_idx[k]];
        }
        sum
    }

    /// y = Aᵀ x.
    pub fn spmv_transpose(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.nrows);
        assert_eq!(y.len(), self.ncols);
        y.iter_mut().for_each(|v| *v = T::zero());
        for i in 0..self.nrows {
            for k in self.row_ptr[i]..self.row_ptr[i + 1] {
                let j = self.col_idx[k];
                y[j] = y[j] + self.values[k] * x[i];
            }
        }
    }

    /// Returns b − A x.
    pub fn residual(&self, b: &[T], x: &[T]) -> Vec<T> {
        let mut r = vec![T::zero(); self.nrows];
        self.spmv(x, &mut r);
        for (ri, &bi) in r.iter_mut().zip(b) {
            *ri = bi - *ri;
        }
        r
    }

    /// Explicit transpose, again with sorted rows.
    pub fn transpose(&self) -> Self {
        let mut row_ptr = vec![0usize; self.ncols + 1];
        for &j in &self.col_idx {
            row_ptr[j + 1] += 1;
        }
        for j in 0..self.ncols {
            row_ptr[j + 1] += row_ptr[j];
        }
        let mut next = row_ptr.clone();
        let mut col_idx = vec![0usize; self.nnz()];
        let mut values = vec![T::zero(); self.nnz()];
        // Rows are visited in order, so every transposed row comes out sorted.
        for i in 0..self.nrows {
            for k in self.row_ptr[i]..self.row_ptr[i + 1] {
                let j = self.col_idx[k];
                col_idx[next[j]] = i;
                values[next[j]] = self.values[k];
                next[j] += 1;
            }
        }
        Self { nrows: self.ncols, ncols: self.nrows, row_ptr, col_idx, values }
    }

    /// Sparse product `self * other` (row-by-row accumulation).
    pub fn matmul(&self, other: &CsrMatrix<T>) -> Result<Self, KError> {
        KError::check_len("inner dimension of sparse product", self.ncols, other.nrows)?;
        let mut acc = vec![T::zero(); other.ncols];
        let mut marker = vec![usize::MAX; other.ncols];
        let mut touched = Vec::new();
        let mut row_ptr = Vec::with_capacity(self.nrows + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0);
        for i in 0..self.nrows {
            touched.clear();
            for (k, a_ik) in self.row(i) {
                for (j, b_kj) in other.row(k) {
                    if marker[j] != i {
                        marker[j] = i;
                        acc[j] = T::zero();
                        touched.push(j);
                    }
                    acc[j] = acc[j] + a_ik * b_kj;
                }
            }
            touched.sort_unstable();
            for &j in &touched {
                col_idx.push(j);
                values.push(acc[j]);
            }
            row_ptr.push(col_idx.len());
        }
        Ok(Self { nrows: self.nrows, ncols: other.ncols, row_ptr, col_idx, values })
    }
}

impl CsrMatrix<f64> {
    /// Dense copy as a faer matrix.
    pub fn to_dense(&self) -> faer::Mat<f64> {
        use crate::matrix::DenseMatrix;
        faer::Mat::from_csr(self)
    }

    /// Compressed sparse column copy for faer's sparse factorizations.
    pub fn to_faer_csc(&self) -> SparseColMat<usize, f64> {
        // CSC of A shares its layout with CSR of Aᵀ.
        let t = self.transpose();
        let symbolic = SymbolicSparseColMat::new_checked(self.nrows, self.ncols, t.row_ptr, None, t.col_idx);
        SparseColMat::new(symbolic, t.values)
    }
}

impl<T: Float + Send + Sync> SparseMatrix<T> for CsrMatrix<T> {
    fn nrows(&self) -> usize {
        self.nrows
    }
    fn ncols(&self) -> usize {
        self.ncols
    }
    fn nnz(&self) -> usize {
        self.values.len()
    }
    fn spmv(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.ncols, "Input vector x has incorrect length");
        assert_eq!(y.len(), self.nrows, "Output vector y has incorrect length");
        #[cfg(feature = "rayon")]
        {
            y.par_iter_mut().enumerate().for_each(|(i, yi)| *yi = self.row_dot(i, x));
        }
        #[cfg(not(feature = "rayon"))]
        {
            for (i, yi) in y.iter_mut().enumerate() {
                *yi = self.row_dot(i, x);
            }
        }
    }
}

impl<T: Float + Send + Sync> CsrMatrix<T> {
    /// Compute y = A * x.
    pub fn spmv(&self, x: &[T], y: &mut [T]) {
        SparseMatrix::spmv(self, x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_spmv() {
        // 3×3 identity in CSR: row_ptr=[0,1,2,3], col_idx=[0,1,2], vals=[1,1,1]
        let m = CsrMatrix::from_csr(3, 3, vec![0, 1, 2, 3], vec![0, 1, 2], vec![1.0, 1.0, 1.0]).unwrap();
        let x = vec![2.0, 3.0, 5.0];
        let mut y = vec![0.0; 3];
        m.spmv(&x, &mut y);
        assert_eq!(y, x);
        assert_eq!(m, CsrMatrix::identity(3));
    }

    #[test]
    fn simple_pattern() {
        // 2×3 matrix [[1,2,0],[0,3,4]]
        let m = CsrMatrix::from_csr(2, 3, vec![0, 2, 4], vec![0, 1, 1, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let x = vec![1.0, 1.0, 1.0];
        let mut y = vec![0.0; 2];
        m.spmv(&x, &mut y);
        assert_eq!(y, vec![3.0, 7.0]);

        let mut z = vec![0.0; 3];
        m.spmv_transpose(&[1.0, 2.0], &mut z);
        assert_eq!(z, vec![1.0, 8.0, 8.0]);
    }

    #[test]
    fn unsorted_rows_and_duplicates_are_normalized() {
        let m = CsrMatrix::from_csr(1, 3, vec![0, 3], vec![2, 0, 2], vec![1.0, 5.0, 2.0]).unwrap();
        assert_eq!(m.col_idx(), &[0, 2]);
        assert_eq!(m.values(), &[5.0, 3.0]);
        assert_eq!(m.nnz(), 2);
    }

    #[test]
    fn rejects_bad_structure() {
        assert!(CsrMatrix::from_csr(2, 2, vec![0, 1], vec![0], vec![1.0]).is_err());
        assert!(CsrMatrix::from_csr(1, 2, vec![0, 1], vec![5], vec![1.0]).is_err());
        assert!(CsrMatrix::from_csr(2, 2, vec![0, 2, 1], vec![0, 1], vec![1.0, 1.0]).is_err());
        assert!(CsrMatrix::<f64>::from_triplets(1, 1, &[(3, 0, 1.0)]).is_err());
    }

    #[test]
    fn transpose_matches_dense() {
        let m = CsrMatrix::from_triplets(2, 3, &[(0, 2, 1.5), (1, 0, -2.0), (0, 0, 4.0), (1, 0, 1.0)]).unwrap();
        let t = m.transpose();
        assert_eq!((t.nrows(), t.ncols()), (3, 2));
        for i in 0..2 {
            for j in 0..3 {
                assert_eq!(m.get(i, j), t.get(j, i));
            }
        }
        assert_eq!(m.get(1, 0), -1.0);
        assert_eq!(t.transpose(), m);
    }

    #[test]
    fn galerkin_product_of_aggregation() {
        let a = CsrMatrix::from_fn(4, 4, |i, j| match (i as i64 - j as i64).abs() {
            0 => 2.0,
            1 => -1.0,
            _ => 0.0,
        });
        let p = CsrMatrix::from_fn(4, 2, |i, j| if i / 2 == j { 1.0 } else { 0.0 });
        let ac = p.transpose().matmul(&a).unwrap().matmul(&p).unwrap();
        assert_eq!(ac, CsrMatrix::from_fn(2, 2, |i, j| if i == j { 2.0 } else { -1.0 }));
        assert!(a.matmul(&CsrMatrix::identity(3)).is_err());
    }

    #[test]
    fn to_dense_and_diagonal() {
        let m = CsrMatrix::from_fn(3, 3, |i, j| (i * 3 + j) as f64);
        let d = m.to_dense();
        assert_eq!(d[(2, 1)], 7.0);
        assert_eq!(m.diagonal(), vec![0.0, 4.0, 8.0]);
        assert_eq!(m.nnz(), 8);
        assert_eq!(m.residual(&[1.0, 1.0, 1.0], &[0.0, 0.0, 0.0]), vec![1.0, 1.0, 1.0]);
    }
}
