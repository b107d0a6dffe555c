//! Direct solvers using Faer: dense inverses, LU, Cholesky and sparse LU.
//!
//! `DirectFactor` holds a factorization computed once and applied to any number of
//! right-hand sides. The coarse-grid solver of a multilevel hierarchy caches one of these.
//!
//! # Usage
//! - `pinv_qr` / `pinv_svd` form an explicit pseudo-inverse; each solve is then a dense mat-vec.
//!   Both discard negligible directions (pivoted-QR diagonal or singular values) and so tolerate
//!   singular coarse operators.
//! - `lu` and `cholesky` factor the dense matrix and solve by forward/back substitution.
//! - `sparse_lu` factors the CSC form without densifying.
//!
//! # References
//! - Faer documentation: https://github.com/sarah-ek/faer-rs
//! - Golub & Van Loan, Matrix Computations

use crate::error::KError;
use crate::matrix::sparse::CsrMatrix;
use faer::linalg::solvers::{ColPivQr, Llt, PartialPivLu, Qr, SolveCore, Svd};
use faer::linalg::triangular_solve::solve_lower_triangular_in_place;
use faer::sparse::linalg::solvers::Lu as SparseLu;
use faer::{Conj, Mat, MatMut, Par, Side};

/// Relative cutoff below which singular values, or pivoted R diagonals, count as zero.
const PINV_RCOND: f64 = 1e6 * f64::EPSILON;

/// A factorization ready to be applied to right-hand sides.
pub enum DirectFactor {
    /// Explicit pseudo-inverse, applied by mat-vec.
    Inverse(Mat<f64>),
    /// Dense LU with partial pivoting.
    Lu(PartialPivLu<f64>),
    /// Dense LLᵀ of an SPD matrix.
    Cholesky(Llt<f64>),
    /// Sparse LU of the CSC form.
    SparseLu(SparseLu<usize, f64>),
}

impl DirectFactor {
    /// Minimum-norm pseudo-inverse from a column-pivoted QR, `A P = Q R`.
    ///
    /// Rows of `R` whose diagonal falls below `10⁶ · ε · |r₀₀|` are dropped. The kept rows `R₁`
    /// have full row rank, and a second QR `R₁ᵀ = Z T` gives `A⁺ = P Z T⁻ᵀ Q₁ᵀ`.
    pub fn pinv_qr(a: &CsrMatrix<f64>) -> Self {
        let n = a.nrows();
        let mut inv = Mat::<f64>::zeros(n, n);
        if n == 0 {
            return DirectFactor::Inverse(inv);
        }
        let qr = ColPivQr::new(a.to_dense().as_ref());
        let r = qr.R();
        let cutoff = PINV_RCOND * r[(0, 0)].abs();
        let rank = (0..n).take_while(|&k| r[(k, k)].abs() > cutoff).count();
        if rank == 0 {
            return DirectFactor::Inverse(inv);
        }

        let q = qr.compute_thin_Q();
        let r1t = r.get(..rank, ..).transpose().to_owned();
        let lq = Qr::new(r1t.as_ref());
        let z = lq.compute_thin_Q();
        // m = T⁻ᵀ Q₁ᵀ
        let mut m = q.get(.., ..rank).transpose().to_owned();
        solve_lower_triangular_in_place(lq.thin_R().transpose(), m.as_mut(), Par::Seq);
        let y = &z * &m;

        // row k of y belongs to pivoted column k
        let (fwd, _) = qr.P().arrays();
        for (k, &col) in fwd.iter().enumerate() {
            for j in 0..n {
                inv[(col, j)] = y[(k, j)];
            }
        }
        DirectFactor::Inverse(inv)
    }

    /// Moore-Penrose pseudo-inverse V Σ⁺ Uᵀ. Singular values below `10⁶ · ε · σ_max` are dropped.
    pub fn pinv_svd(a: &CsrMatrix<f64>) -> Result<Self, KError> {
        let n = a.nrows();
        let svd = Svd::new(a.to_dense().as_ref()).map_err(|e| KError::FactorError(format!("SVD failed: {e:?}")))?;
        let u = svd.U().to_owned();
        let v = svd.V().to_owned();
        let s = svd.S().column_vector().to_owned();
        let smax = (0..n).map(|k| s[k]).fold(0.0_f64, f64::max);
        let cutoff = PINV_RCOND * smax;
        let s_inv: Vec<f64> = (0..n).map(|k| if s[k] > cutoff { 1.0 / s[k] } else { 0.0 }).collect();
        let inv = Mat::from_fn(n, n, |i, j| (0..n).map(|k| v[(i, k)] * s_inv[k] * u[(j, k)]).sum());
        Ok(DirectFactor::Inverse(inv))
    }

    pub fn lu(a: &CsrMatrix<f64>) -> Self {
        DirectFactor::Lu(PartialPivLu::new(a.to_dense().as_ref()))
    }

    /// Fails with `FactorError` unless the matrix is symmetric positive definite.
    pub fn cholesky(a: &CsrMatrix<f64>) -> Result<Self, KError> {
        Llt::new(a.to_dense().as_ref(), Side::Lower)
            .map(DirectFactor::Cholesky)
            .map_err(|e| KError::FactorError(format!("Cholesky failed: {e:?}")))
    }

    pub fn sparse_lu(a: &CsrMatrix<f64>) -> Result<Self, KError> {
        a.to_faer_csc()
            .as_ref()
            .sp_lu()
            .map(DirectFactor::SparseLu)
            .map_err(|e| KError::FactorError(format!("sparse LU failed: {e:?}")))
    }

    /// x = A⁻¹ b.
    pub fn solve(&self, b: &[f64]) -> Vec<f64> {
        match self {
            DirectFactor::Inverse(inv) => (0..inv.nrows())
                .map(|i| b.iter().enumerate().map(|(j, bj)| inv[(i, j)] * bj).sum())
                .collect(),
            DirectFactor::Lu(f) => solve_in_place(f, b),
            DirectFactor::Cholesky(f) => solve_in_place(f, b),
            DirectFactor::SparseLu(f) => solve_in_place(f, b),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DirectFactor::Inverse(_) => "inverse",
            DirectFactor::Lu(_) => "lu",
            DirectFactor::Cholesky(_) => "cholesky",
            DirectFactor::SparseLu(_) => "sparse lu",
        }
    }
}

fn solve_in_place<F: SolveCore<f64>>(factor: &F, b: &[f64]) -> Vec<f64> {
    let mut x = b.to_vec();
    let n = x.len();
    let x_mat = MatMut::from_column_major_slice_mut(&mut x, n, 1);
    factor.solve_in_place_with_conj(Conj::No, x_mat);
    x
}

impl std::fmt::Debug for DirectFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DirectFactor").field(&self.name()).finish()
    }
}
