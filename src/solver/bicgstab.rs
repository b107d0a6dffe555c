//! BiCGStab solver (Saad §7.4.2)

use crate::core::traits::{InnerProduct, MatVec};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{LinearSolver, residual};
use crate::utils::convergence::{Convergence, SolveStats};

pub struct BiCgStabSolver<T> {
    pub conv: Convergence<T>,
}

impl<T: Copy + num_traits::Float> BiCgStabSolver<T> {
    pub fn new(tol: T, max_iters: usize) -> Self {
        Self { conv: Convergence::new(tol, max_iters) }
    }

    pub fn with_convergence(conv: Convergence<T>) -> Self {
        Self { conv }
    }
}

impl<M, V, T> LinearSolver<M, V> for BiCgStabSolver<T>
where
    M: MatVec<V>,
    (): InnerProduct<V, Scalar = T>,
    V: AsMut<[T]> + AsRef<[T]> + From<Vec<T>> + Clone,
    T: num_traits::Float + From<f64>,
{
    type Error = KError;
    type Scalar = T;

    fn solve(&mut self, a: &M, pc: Option<&dyn Preconditioner<M, V>>, b: &V, x: &mut V) -> Result<SolveStats<T>, KError> {
        let _ = pc; // BiCGStab does not use preconditioner
        let n = b.as_ref().len();
        let ip = ();
        let mut r = residual(a, b, x);
        let r_hat = r.clone(); // shadow residual
        let mut rho_prev = T::one();
        let mut alpha = T::one();
        let mut omega_prev = T::one();
        let mut v = V::from(vec![T::zero(); n]);
        let mut p = r.clone();
        let mut s = V::from(vec![T::zero(); n]);
        let mut t = V::from(vec![T::zero(); n]);
        let res0 = ip.norm(&r);
        let mut stats = SolveStats { iterations: 0, final_residual: res0, converged: self.conv.is_met(res0, res0) };
        if stats.converged {
            return Ok(stats);
        }
        for i in 1..=self.conv.max_iters {
            let rho = ip.dot(&r_hat, &r);
            if rho == T::zero() {
                break; // breakdown
            }
            if i > 1 {
                let beta = (rho / rho_prev) * (alpha / omega_prev);
                // p = r + beta * (p - omega_prev * v)
                for ((p_j, r_j), v_j) in p.as_mut().iter_mut().zip(r.as_ref()).zip(v.as_ref()) {
                    *p_j = *r_j + beta * (*p_j - omega_prev * *v_j);
                }
            }
            a.matvec(&p, &mut v);
            let alpha_den = ip.dot(&r_hat, &v);
            if alpha_den == T::zero() {
                break; // breakdown
            }
            alpha = rho / alpha_den;
            // s = r - alpha * v
            for ((sj, &rj), &vj) in s.as_mut().iter_mut().zip(r.as_ref()).zip(v.as_ref()) {
                *sj = rj - alpha * vj;
            }
            let s_norm = ip.norm(&s);
            if self.conv.is_met(s_norm, res0) {
                for (xj, &pj) in x.as_mut().iter_mut().zip(p.as_ref()) {
                    *xj = *xj + alpha * pj;
                }
                return Ok(SolveStats { iterations: i, final_residual: s_norm, converged: true });
            }
            a.matvec(&s, &mut t);
            let omega_den = ip.dot(&t, &t);
            if omega_den == T::zero() {
                break; // breakdown
            }
            let omega = ip.dot(&t, &s) / omega_den;
            // x = x + alpha * p + omega * s
            for ((xj, &pj), &sj) in x.as_mut().iter_mut().zip(p.as_ref()).zip(s.as_ref()) {
                *xj = *xj + alpha * pj + omega * sj;
            }
            // r = s - omega * t
            for ((rj, &sj), &tj) in r.as_mut().iter_mut().zip(s.as_ref()).zip(t.as_ref()) {
                *rj = sj - omega * tj;
            }
            let (stop, st) = self.conv.check(ip.norm(&r), res0, i);
            stats = st;
            if stop || omega == T::zero() {
                break;
            }
            rho_prev = rho;
            omega_prev = omega;
        }
        Ok(stats)
    }
}
