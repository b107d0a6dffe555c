//! Conjugate Gradient Squared (CGS) Solver
//!
//! This module implements the CGS iterative method for solving nonsymmetric linear systems Ax = b.
//! The CGS algorithm is based on the BiConjugate Gradient (BiCG) method, but squares the residual
//! polynomials to achieve faster convergence in some cases. It needs no transpose products, but
//! may suffer from breakdowns or erratic convergence on ill-conditioned problems.
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems, 2nd Edition. SIAM. §7.4.1
//! - https://en.wikipedia.org/wiki/Conjugate_gradient_squared_method

use crate::core::traits::{InnerProduct, MatVec};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{LinearSolver, axpy, residual};
use crate::utils::convergence::{Convergence, SolveStats};

/// CGS solver struct, holding convergence parameters.
///
/// # Type Parameters
/// * `T` - Scalar type (e.g., f32, f64)
pub struct CgsSolver<T> {
    /// Convergence criteria (tolerance and max iterations)
    pub conv: Convergence<T>,
}

impl<T: Copy + num_traits::Float> CgsSolver<T> {
    /// Create a new CGS solver with given relative tolerance and maximum iterations.
    pub fn new(tol: T, max_iters: usize) -> Self {
        Self { conv: Convergence::new(tol, max_iters) }
    }

    pub fn with_convergence(conv: Convergence<T>) -> Self {
        Self { conv }
    }
}

impl<M, V, T> LinearSolver<M, V> for CgsSolver<T>
where
    M: MatVec<V>,
    (): InnerProduct<V, Scalar = T>,
    V: AsMut<[T]> + AsRef<[T]> + From<Vec<T>> + Clone,
    T: num_traits::Float + From<f64>,
{
    type Error = KError;
    type Scalar = T;

    /// Solve the linear system Ax = b using the CGS algorithm.
    ///
    /// # Arguments
    /// * `a` - Matrix implementing `MatVec`
    /// * `pc` - Unused
    /// * `b` - Right-hand side vector
    /// * `x` - On input: initial guess; on output: solution vector
    fn solve(&mut self, a: &M, pc: Option<&dyn Preconditioner<M, V>>, b: &V, x: &mut V) -> Result<SolveStats<T>, KError> {
        let _ = pc; // CGS does not use preconditioner
        let n = b.as_ref().len();
        let ip = ();
        let mut r = residual(a, b, x);
        let r_tld = r.clone(); // Shadow residual (fixed for all iterations)
        let mut p = V::from(vec![T::zero(); n]);
        let mut q = V::from(vec![T::zero(); n]);
        let mut u = V::from(vec![T::zero(); n]);
        let mut v = V::from(vec![T::zero(); n]);
        let mut w = V::from(vec![T::zero(); n]);
        let mut rho_old = T::one();
        let res0 = ip.norm(&r);
        let mut stats = SolveStats { iterations: 0, final_residual: res0, converged: self.conv.is_met(res0, res0) };
        if stats.converged {
            return Ok(stats);
        }
        for i in 1..=self.conv.max_iters {
            let rho = ip.dot(&r_tld, &r);
            if rho == T::zero() {
                break; // breakdown
            }
            if i == 1 {
                u.clone_from(&r);
                p.clone_from(&u);
            } else {
                let beta = rho / rho_old;
                // u = r + beta * q
                for ((u_j, &r_j), &q_j) in u.as_mut().iter_mut().zip(r.as_ref()).zip(q.as_ref()) {
                    *u_j = r_j + beta * q_j;
                }
                // p = u + beta * (q + beta * p)
                for ((p_j, &u_j), &q_j) in p.as_mut().iter_mut().zip(u.as_ref()).zip(q.as_ref()) {
                    *p_j = u_j + beta * (q_j + beta * *p_j);
                }
            }
            a.matvec(&p, &mut v);
            let sigma = ip.dot(&r_tld, &v);
            if sigma == T::zero() {
                break; // breakdown
            }
            let alpha = rho / sigma;
            // q = u - alpha * v
            for ((q_j, &u_j), &v_j) in q.as_mut().iter_mut().zip(u.as_ref()).zip(v.as_ref()) {
                *q_j = u_j - alpha * v_j;
            }
            // u <- u + q, then x += alpha u and r -= alpha A u
            axpy(T::one(), q.as_ref(), u.as_mut());
            axpy(alpha, u.as_ref(), x.as_mut());
            a.matvec(&u, &mut w);
            axpy(-alpha, w.as_ref(), r.as_mut());
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
