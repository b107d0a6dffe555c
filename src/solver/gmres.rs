//! Generalized Minimal Residual (GMRES) solver with fixed restart (Saad §6.5)
//!
//! This module implements the restarted GMRES algorithm for solving large, sparse, and possibly nonsymmetric
//! linear systems Ax = b. GMRES minimizes the residual over a Krylov subspace. An optional preconditioner is
//! applied on the right, so the minimized quantity stays the true residual.
//!
//! # Features
//! - No or right preconditioning
//! - Double (iterative) Gram-Schmidt orthogonalization for numerical stability
//! - Happy breakdown detection for early termination
//! - Givens rotations for least-squares update
//! - Back-substitution with zero-pivot protection
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems, 2nd Edition. SIAM. §6.5, §9.3.2
//! - https://en.wikipedia.org/wiki/Generalized_minimal_residual_method

use crate::core::traits::{InnerProduct, MatVec};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{LinearSolver, axpy, residual};
use crate::utils::convergence::{Convergence, SolveStats};
use num_traits::Float;

/// GMRES solver struct with restart length.
///
/// # Type Parameters
/// * `T` - Scalar type (e.g., f32, f64)
pub struct GmresSolver<T> {
    /// Number of Arnoldi vectors before restart
    pub restart: usize,
    /// Convergence criteria (tolerance and max iterations)
    pub conv: Convergence<T>,
}

impl<T: Copy + Float> GmresSolver<T> {
    /// Create a new GMRES solver with restart, relative tolerance, and max iterations.
    pub fn new(restart: usize, tol: T, max_iters: usize) -> Self {
        Self::with_convergence(restart, Convergence::new(tol, max_iters))
    }

    pub fn with_convergence(restart: usize, conv: Convergence<T>) -> Self {
        Self { restart: restart.max(1), conv }
    }

    /// Orthogonalize `w` against the basis (two passes of modified Gram-Schmidt), filling column `j`
    /// of the Hessenberg matrix. Returns true on happy breakdown.
    fn arnoldi<V>(ip: &(), v_basis: &mut Vec<V>, mut w: V, h: &mut [Vec<T>], j: usize, epsilon: T) -> bool
    where
        (): InnerProduct<V, Scalar = T>,
        V: AsMut<[T]> + AsRef<[T]> + From<Vec<T>>,
    {
        for i in 0..=j {
            h[i][j] = ip.dot(&w, &v_basis[i]);
            axpy(-h[i][j], v_basis[i].as_ref(), w.as_mut());
        }
        // Iterative refinement (second orthogonalization)
        for i in 0..=j {
            let tmp = ip.dot(&w, &v_basis[i]);
            h[i][j] = h[i][j] + tmp;
            axpy(-tmp, v_basis[i].as_ref(), w.as_mut());
        }
        h[j + 1][j] = ip.norm(&w);
        if h[j + 1][j].abs() < epsilon {
            return true;
        }
        let scale = h[j + 1][j];
        for wk in w.as_mut() {
            *wk = *wk / scale;
        }
        v_basis.push(w);
        false
    }

    /// Apply previous Givens rotations to column `j`, build the new one, and rotate `g`.
    fn apply_givens_and_update_g(h: &mut [Vec<T>], g: &mut [T], cs: &mut [T], sn: &mut [T], j: usize, epsilon: T) {
        for i in 0..j {
            let temp = cs[i] * h[i][j] + sn[i] * h[i + 1][j];
            h[i + 1][j] = -sn[i] * h[i][j] + cs[i] * h[i + 1][j];
            h[i][j] = temp;
        }
        let h_kk = h[j][j];
        let h_k1k = h[j + 1][j];
        let r = h_kk.hypot(h_k1k);
        if r.abs() < epsilon {
            cs[j] = T::one();
            sn[j] = T::zero();
        } else {
            cs[j] = h_kk / r;
            sn[j] = h_k1k / r;
        }
        h[j][j] = cs[j] * h_kk + sn[j] * h_k1k;
        h[j + 1][j] = T::zero();
        let temp = cs[j] * g[j] + sn[j] * g[j + 1];
        g[j + 1] = -sn[j] * g[j] + cs[j] * g[j + 1];
        g[j] = temp;
    }

    /// Solve upper-triangular system Hy = g for y, with zero-pivot protection.
    fn back_substitution(h: &[Vec<T>], g: &[T], y: &mut [T], m: usize, epsilon: T) {
        for i in (0..m).rev() {
            y[i] = g[i];
            for j in (i + 1)..m {
                y[i] = y[i] - h[i][j] * y[j];
            }
            if h[i][i].abs() > epsilon {
                y[i] = y[i] / h[i][i];
            } else {
                y[i] = T::zero();
            }
        }
    }
}

impl<M, V, T> LinearSolver<M, V> for GmresSolver<T>
where
    M: MatVec<V>,
    (): InnerProduct<V, Scalar = T>,
    V: AsMut<[T]> + AsRef<[T]> + From<Vec<T>> + Clone,
    T: Float + From<f64>,
{
    type Error = KError;
    type Scalar = T;

    /// Solve the linear system Ax = b using restarted GMRES.
    ///
    /// # Arguments
    /// * `a` - Matrix implementing `MatVec`
    /// * `pc` - Optional right preconditioner
    /// * `b` - Right-hand side vector
    /// * `x` - On input: initial guess; on output: solution vector
    fn solve(&mut self, a: &M, pc: Option<&dyn Preconditioner<M, V>>, b: &V, x: &mut V) -> Result<SolveStats<T>, KError> {
        let n = b.as_ref().len();
        let ip = ();
        let restart = self.restart;
        let epsilon = <T as From<f64>>::from(1e-14);

        let mut r = residual(a, b, x);
        let res0 = ip.norm(&r);
        let mut stats = SolveStats { iterations: 0, final_residual: res0, converged: self.conv.is_met(res0, res0) };
        if stats.converged {
            return Ok(stats);
        }

        let mut iteration = 0;
        while iteration < self.conv.max_iters {
            let beta = ip.norm(&r);
            let mut v_basis: Vec<V> = Vec::with_capacity(restart + 1);
            // z_j = M⁻¹ v_j, kept for the solution update
            let mut z_basis: Vec<V> = Vec::with_capacity(restart);
            v_basis.push(V::from(r.as_ref().iter().map(|&ri| ri / beta).collect::<Vec<_>>()));

            let mut h = vec![vec![T::zero(); restart]; restart + 1];
            let mut g = vec![T::zero(); restart + 1];
            g[0] = beta;
            let mut cs = vec![T::zero(); restart];
            let mut sn = vec![T::zero(); restart];
            let mut m = 0;
            let mut happy_breakdown = false;
            for j in 0..restart {
                iteration += 1;
                let mut w = V::from(vec![T::zero(); n]);
                match pc {
                    Some(pc) => {
                        let mut z = V::from(vec![T::zero(); n]);
                        pc.apply(&v_basis[j], &mut z)?;
                        a.matvec(&z, &mut w);
                        z_basis.push(z);
                    }
                    None => a.matvec(&v_basis[j], &mut w),
                }
                happy_breakdown = Self::arnoldi(&ip, &mut v_basis, w, &mut h, j, epsilon);
                Self::apply_givens_and_update_g(&mut h, &mut g, &mut cs, &mut sn, j, epsilon);
                m = j + 1;
                let (stop, _) = self.conv.check(g[j + 1].abs(), res0, iteration);
                if stop || happy_breakdown {
                    break;
                }
            }

            let mut y = vec![T::zero(); m];
            Self::back_substitution(&h, &g, &mut y, m, epsilon);
            let directions = if pc.is_some() { &z_basis } else { &v_basis };
            for (yj, dj) in y.iter().zip(directions) {
                axpy(*yj, dj.as_ref(), x.as_mut());
            }

            // restart from the true residual
            r = residual(a, b, x);
            let (stop, s) = self.conv.check(ip.norm(&r), res0, iteration);
            stats = s;
            if stop || happy_breakdown {
                break;
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::MatVec;
    use crate::preconditioner::Preconditioner;

    /// Simple dense matrix for testing
    #[derive(Clone)]
    struct DenseMat {
        data: Vec<Vec<f64>>,
    }
    impl MatVec<Vec<f64>> for DenseMat {
        fn matvec(&self, x: &Vec<f64>, y: &mut Vec<f64>) {
            for (i, row) in self.data.iter().enumerate() {
                y[i] = row.iter().zip(x.iter()).map(|(a, b)| a * b).sum();
            }
        }
    }

    struct InverseDiagonal(Vec<f64>);
    impl Preconditioner<DenseMat, Vec<f64>> for InverseDiagonal {
        fn apply(&self, r: &Vec<f64>, z: &mut Vec<f64>) -> Result<(), crate::error::KError> {
            for ((zi, ri), di) in z.iter_mut().zip(r).zip(&self.0) {
                *zi = ri * di;
            }
            Ok(())
        }
    }

    fn system() -> (DenseMat, Vec<f64>, Vec<f64>) {
        // A = [[4,1,0,0],[2,3,1,0],[0,1,2,1],[0,0,-1,3]], x_true = [1,2,3,4]
        let a = DenseMat {
            data: vec![
                vec![4.0, 1.0, 0.0, 0.0],
                vec![2.0, 3.0, 1.0, 0.0],
                vec![0.0, 1.0, 2.0, 1.0],
                vec![0.0, 0.0, -1.0, 3.0],
            ],
        };
        let x_true = vec![1.0, 2.0, 3.0, 4.0];
        let mut b = vec![0.0; 4];
        a.matvec(&x_true, &mut b);
        (a, b, x_true)
    }

    #[test]
    fn gmres_solves_well_conditioned_nonsym() {
        let (a, b, x_true) = system();
        let mut x = vec![0.0; 4];
        let mut solver = GmresSolver::new(4, 1e-10, 100);
        let stats = solver.solve(&a, None, &b, &mut x).unwrap();
        for (xi, ei) in x.iter().zip(x_true.iter()) {
            assert!((xi - ei).abs() < 1e-8, "xi = {}, expected = {}", xi, ei);
        }
        assert!(stats.converged, "GMRES did not converge");
    }

    #[test]
    fn restarted_gmres_still_converges() {
        let (a, b, x_true) = system();
        let mut x = vec![0.0; 4];
        let stats = GmresSolver::new(2, 1e-10, 200).solve(&a, None, &b, &mut x).unwrap();
        assert!(stats.converged, "GMRES(2) did not converge: {:?}", stats);
        for (xi, ei) in x.iter().zip(x_true.iter()) {
            assert!((xi - ei).abs() < 1e-7, "xi = {}, expected = {}", xi, ei);
        }
    }

    #[test]
    fn gmres_with_right_preconditioner() {
        let (a, b, x_true) = system();
        let pc = InverseDiagonal(vec![0.25, 1.0 / 3.0, 0.5, 1.0 / 3.0]);
        let mut x = vec![0.0; 4];
        let stats = GmresSolver::new(4, 1e-10, 100).solve(&a, Some(&pc), &b, &mut x).unwrap();
        assert!(stats.converged, "right-preconditioned GMRES did not converge");
        for (xi, ei) in x.iter().zip(x_true.iter()) {
            assert!((xi - ei).abs() < 1e-8, "xi = {}, expected = {}", xi, ei);
        }
    }
}
