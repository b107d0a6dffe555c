//! MINRES solver (Paige & Saunders)
//!
//! This module implements the MINimum RESidual (MINRES) algorithm for solving symmetric (possibly indefinite)
//! linear systems Ax = b. It minimizes the residual norm over a Krylov subspace using the three-term
//! Lanczos recurrence and a QR factorization of the tridiagonal matrix updated by Givens rotations.
//!
//! # Features
//! - Handles symmetric positive definite and indefinite systems
//! - Stops on the recurrence estimate of ‖r‖, which needs no extra mat-vec
//!
//! # References
//! - Paige, C. C. & Saunders, M. A. (1975). Solution of sparse indefinite systems of linear equations.
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems, 2nd Edition. SIAM. §6.6
//! - https://en.wikipedia.org/wiki/MINRES

use crate::core::traits::{InnerProduct, MatVec};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{LinearSolver, axpy, residual};
use crate::utils::convergence::{Convergence, SolveStats};
use num_traits::Float;

/// MINRES solver struct, holding convergence parameters.
pub struct MinresSolver<T> {
    /// Convergence criteria (tolerance and max iterations)
    pub conv: Convergence<T>,
}

impl<T: Float> MinresSolver<T> {
    /// Create a new MINRES solver with given relative tolerance and maximum iterations.
    pub fn new(tol: T, max_iters: usize) -> Self {
        Self { conv: Convergence::new(tol, max_iters) }
    }

    pub fn with_convergence(conv: Convergence<T>) -> Self {
        Self { conv }
    }
}

impl<M, V, T> LinearSolver<M, V> for MinresSolver<T>
where
    M: MatVec<V>,
    (): InnerProduct<V, Scalar = T>,
    V: From<Vec<T>> + AsRef<[T]> + AsMut<[T]> + Clone,
    T: Float + From<f64>,
{
    type Scalar = T;
    type Error = KError;

    /// Solve the symmetric linear system Ax = b using MINRES.
    ///
    /// # Arguments
    /// * `a` - Matrix implementing `MatVec` (must be symmetric)
    /// * `pc` - Unused
    /// * `b` - Right-hand side vector
    /// * `x` - On input: initial guess; on output: solution vector
    fn solve(&mut self, a: &M, pc: Option<&dyn Preconditioner<M, V>>, b: &V, x: &mut V) -> Result<SolveStats<T>, KError> {
        let _ = pc; // MINRES does not use preconditioner
        let n = b.as_ref().len();
        let ip = ();

        let mut r1 = residual(a, b, x);
        let beta1 = ip.norm(&r1);
        let mut stats = SolveStats { iterations: 0, final_residual: beta1, converged: self.conv.is_met(beta1, beta1) };
        if stats.converged {
            return Ok(stats);
        }

        let mut r2 = r1.clone();
        let mut y = r1.clone();
        let mut v = V::from(vec![T::zero(); n]);
        let mut w = V::from(vec![T::zero(); n]);
        let mut w1 = V::from(vec![T::zero(); n]);
        let mut w2 = V::from(vec![T::zero(); n]);

        let mut oldb = T::zero();
        let mut beta = beta1;
        let mut dbar = T::zero();
        let mut epsln = T::zero();
        let mut phibar = beta1;
        let mut cs = -T::one();
        let mut sn = T::zero();

        for itn in 1..=self.conv.max_iters {
            // --- Lanczos step ---
            let s = T::one() / beta;
            for (vi, &yi) in v.as_mut().iter_mut().zip(y.as_ref()) {
                *vi = s * yi;
            }
            a.matvec(&v, &mut y);
            if itn >= 2 {
                axpy(-(beta / oldb), r1.as_ref(), y.as_mut());
            }
            let alfa = ip.dot(&v, &y);
            axpy(-(alfa / beta), r2.as_ref(), y.as_mut());
            std::mem::swap(&mut r1, &mut r2);
            r2.clone_from(&y);
            oldb = beta;
            beta = ip.norm(&r2);

            // --- QR update of the tridiagonal ---
            let oldeps = epsln;
            let delta = cs * dbar + sn * alfa;
            let gbar = sn * dbar - cs * alfa;
            epsln = sn * beta;
            dbar = -cs * beta;
            let gamma = gbar.hypot(beta).max(T::epsilon());
            cs = gbar / gamma;
            sn = beta / gamma;
            let phi = cs * phibar;
            phibar = sn * phibar;

            // --- solution update: w = (v - oldeps w1 - delta w2) / gamma ---
            std::mem::swap(&mut w1, &mut w2);
            std::mem::swap(&mut w2, &mut w);
            for ((wi, &vi), (&w1i, &w2i)) in w.as_mut().iter_mut().zip(v.as_ref()).zip(w1.as_ref().iter().zip(w2.as_ref())) {
                *wi = (vi - oldeps * w1i - delta * w2i) / gamma;
            }
            axpy(phi, w.as_ref(), x.as_mut());

            let (stop, st) = self.conv.check(phibar.abs(), beta1, itn);
            stats = st;
            if stop || beta == T::zero() {
                break;
            }
        }
        Ok(stats)
    }
}
