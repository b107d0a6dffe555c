//! Model problems shared by the integration tests: 1D Poisson hierarchies and smoothers.
#![allow(dead_code)]

use mlcycle::{CsrMatrix, Level, Smoother};

/// tridiag(-1, 2, -1) of size n.
pub fn poisson(n: usize) -> CsrMatrix<f64> {
    CsrMatrix::from_fn(n, n, |i, j| {
        if i == j {
            2.0
        } else if i.abs_diff(j) == 1 {
            -1.0
        } else {
            0.0
        }
    })
}

/// Linear interpolation from (n - 1) / 2 coarse points to n fine points, n odd.
pub fn interpolation(n: usize) -> CsrMatrix<f64> {
    let nc = (n - 1) / 2;
    let mut triplets = Vec::with_capacity(3 * nc);
    for j in 0..nc {
        triplets.push((2 * j, j, 0.5));
        triplets.push((2 * j + 1, j, 1.0));
        triplets.push((2 * j + 2, j, 0.5));
    }
    CsrMatrix::from_triplets(n, nc, &triplets).unwrap()
}

/// Pairwise aggregation, n × n/2.
pub fn aggregation(n: usize) -> CsrMatrix<f64> {
    CsrMatrix::from_fn(n, n / 2, |i, j| if i / 2 == j { 1.0 } else { 0.0 })
}

/// Galerkin hierarchy for `poisson(n)` with `num_levels` levels; R is left for the solver to fill.
pub fn poisson_hierarchy<S: Smoother + Clone + 'static>(n: usize, num_levels: usize, smoother: S) -> Vec<Level> {
    let mut levels = Vec::with_capacity(num_levels);
    let mut a = poisson(n);
    for _ in 1..num_levels {
        let p = interpolation(a.nrows());
        let ac = p.transpose().matmul(&a).unwrap().matmul(&p).unwrap();
        levels.push(Level::new(a).with_prolongation(p).with_smoother(smoother.clone()));
        a = ac;
    }
    levels.push(Level::new(a));
    levels
}

/// One forward Gauss-Seidel sweep.
pub fn gauss_seidel(a: &CsrMatrix<f64>, x: &mut [f64], b: &[f64]) {
    for i in 0..a.nrows() {
        let mut diag = 0.0;
        let mut sum = b[i];
        for (j, v) in a.row(i) {
            if j == i {
                diag = v;
            } else {
                sum -= v * x[j];
            }
        }
        x[i] = sum / diag;
    }
}

/// One damped Jacobi sweep, ω = 2/3. Symmetric, so a V-cycle built on it can precondition CG.
pub fn jacobi(a: &CsrMatrix<f64>, x: &mut [f64], b: &[f64]) {
    let r = a.residual(b, x);
    for ((xi, ri), di) in x.iter_mut().zip(r).zip(a.diagonal()) {
        *xi += 2.0 / 3.0 * ri / di;
    }
}

pub fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}
