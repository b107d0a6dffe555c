//! Biconjugate Gradient (BiCG) for nonsymmetric systems.
//!
//! Runs the two-sided Lanczos recurrence with a shadow system in Aᵀ, so the operator
//! must provide transpose products as well.
//!
//! # References
//! - Barrett et al., Templates for the Solution of Linear Systems, §2.3.5

use crate::core::traits::{InnerProduct, MatTransVec, MatVec};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{LinearSolver, axpy, residual};
use crate::utils::convergence::{Convergence, SolveStats};

pub struct BiCgSolver<T> {
    pub conv: Convergence<T>,
}

impl<T: Copy + num_traits::Float> BiCgSolver<T> {
    pub fn new(tol: T, max_iters: usize) -> Self {
        Self { conv: Convergence::new(tol, max_iters) }
    }

    pub fn with_convergence(conv: Convergence<T>) -> Self {
        Self { conv }
    }
}

impl<M, V, T> LinearSolver<M, V> for BiCgSolver<T>
where
    M: MatVec<V> + MatTransVec<V>,
    (): InnerProduct<V, Scalar = T>,
    V: AsMut<[T]> + AsRef<[T]> + From<Vec<T>> + Clone,
    T: num_traits::Float + From<f64>,
{
    type Error = KError;
    type Scalar = T;

    fn solve(&mut self, a: &M, pc: Option<&dyn Preconditioner<M, V>>, b: &V, x: &mut V) -> Result<SolveStats<T>, KError> {
        let _ = pc; // BiCG does not use preconditioner
        let n = b.as_ref().len();
        let ip = ();
        let mut r = residual(a, b, x);
        let mut r_t = r.clone();
        let mut p = r.clone();
        let mut p_t = r_t.clone();
        let mut q = V::from(vec![T::zero(); n]);
        let mut q_t = V::from(vec![T::zero(); n]);
        let mut rho_old = T::one();
        let res0 = ip.norm(&r);
        let mut stats = SolveStats { iterations: 0, final_residual: res0, converged: self.conv.is_met(res0, res0) };
        if stats.converged {
            return Ok(stats);
        }
        for i in 1..=self.conv.max_iters {
            let rho = ip.dot(&r_t, &r);
            if rho == T::zero() {
                break; // breakdown
            }
            if i > 1 {
                let beta = rho / rho_old;
                for (pj, &rj) in p.as_mut().iter_mut().zip(r.as_ref()) {
                    *pj = rj + beta * *pj;
                }
                for (pj, &rj) in p_t.as_mut().iter_mut().zip(r_t.as_ref()) {
                    *pj = rj + beta * *pj;
                }
            }
            a.matvec(&p, &mut q);
            a.mattransvec(&p_t, &mut q_t);
            let sigma = ip.dot(&p_t, &q);
            if sigma == T::zero() {
                break; // breakdown
            }
            let alpha = rho / sigma;
            axpy(alpha, p.as_ref(), x.as_mut());
            axpy(-alpha, q.as_ref(), r.as_mut());
            axpy(-alpha, q_t.as_ref(), r_t.as_mut());
            let (stop, s) = self.conv.check(ip.norm(&r), res0, i);
            stats = s;
            if stop {
                break;
            }
            rho_old = rho;
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::sparse::CsrMatrix;
    use approx::assert_abs_diff_eq;

    #[test]
    fn bicg_solves_nonsymmetric_csr_system() {
        // convection-diffusion stencil [-1.5, 2, -0.5]
        let n = 8;
        let a = CsrMatrix::from_fn(n, n, |i, j| {
            if i == j {
                2.0
            } else if j + 1 == i {
                -1.5
            } else if i + 1 == j {
                -0.5
            } else {
                0.0
            }
        });
        let x_true: Vec<f64> = (0..n).map(|i| (i as f64 + 1.0).sin()).collect();
        let mut b = vec![0.0; n];
        a.spmv(&x_true, &mut b);
        let mut x = vec![0.0; n];
        let stats = BiCgSolver::new(1e-12, 100).solve(&a, None, &b, &mut x).unwrap();
        assert!(stats.converged, "BiCG did not converge: {:?}", stats);
        for (xi, ei) in x.iter().zip(&x_true) {
            assert_abs_diff_eq!(*xi, *ei, epsilon = 1e-8);
        }
    }
}
