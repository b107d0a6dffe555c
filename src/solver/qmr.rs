//! QMR solver without look-ahead (Freund & Nachtigal).
//!
//! Unpreconditioned variant of Barrett et al., Templates §2.3.6. The true residual is
//! carried alongside the quasi-minimal one and drives the stopping test.

use crate::core::traits::{InnerProduct, MatTransVec, MatVec};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{LinearSolver, residual};
use crate::utils::convergence::{Convergence, SolveStats};
use num_traits::Float;

/// Quasi-Minimal Residual (QMR) method for nonsymmetric A
pub struct QmrSolver<T> {
    pub conv: Convergence<T>,
}

impl<T: Float> QmrSolver<T> {
    pub fn new(tol: T, max_iters: usize) -> Self {
        Self { conv: Convergence::new(tol, max_iters) }
    }

    pub fn with_convergence(conv: Convergence<T>) -> Self {
        Self { conv }
    }
}

impl<M, V, T> LinearSolver<M, V> for QmrSolver<T>
where
    M: MatVec<V> + MatTransVec<V>,
    (): InnerProduct<V, Scalar = T>,
    V: From<Vec<T>> + AsRef<[T]> + AsMut<[T]> + Clone,
    T: Float + From<f64>,
{
    type Error = KError;
    type Scalar = T;

    fn solve(&mut self, a: &M, _pc: Option<&dyn Preconditioner<M, V>>, b: &V, x: &mut V) -> Result<SolveStats<T>, KError> {
        let n = b.as_ref().len();
        let ip = ();

        let mut r = residual(a, b, x);
        let res0 = ip.norm(&r);
        let mut stats = SolveStats { iterations: 0, final_residual: res0, converged: self.conv.is_met(res0, res0) };
        if stats.converged {
            return Ok(stats);
        }

        // Lanczos vectors, unnormalized
        let mut v_t = r.clone();
        let mut w_t = r.clone();
        let mut rho = ip.norm(&v_t);
        let mut xi = ip.norm(&w_t);
        let mut v = V::from(vec![T::zero(); n]);
        let mut w = V::from(vec![T::zero(); n]);
        let mut p = V::from(vec![T::zero(); n]);
        let mut q = V::from(vec![T::zero(); n]);
        let mut p_t = V::from(vec![T::zero(); n]);
        let mut at_q = V::from(vec![T::zero(); n]);
        let mut d = V::from(vec![T::zero(); n]);
        let mut s = V::from(vec![T::zero(); n]);

        let mut gamma = T::one();
        let mut eta = -T::one();
        let mut theta = T::zero();
        let mut eps = T::one();

        for i in 1..=self.conv.max_iters {
            if rho == T::zero() || xi == T::zero() {
                break; // breakdown
            }
            for (vj, &tj) in v.as_mut().iter_mut().zip(v_t.as_ref()) {
                *vj = tj / rho;
            }
            for (wj, &tj) in w.as_mut().iter_mut().zip(w_t.as_ref()) {
                *wj = tj / xi;
            }
            let delta = ip.dot(&w, &v);
            if delta == T::zero() {
                break; // breakdown
            }
            if i == 1 {
                p.clone_from(&v);
                q.clone_from(&w);
            } else {
                let cp = xi * delta / eps;
                let cq = rho * delta / eps;
                for (pj, &vj) in p.as_mut().iter_mut().zip(v.as_ref()) {
                    *pj = vj - cp * *pj;
                }
                for (qj, &wj) in q.as_mut().iter_mut().zip(w.as_ref()) {
                    *qj = wj - cq * *qj;
                }
            }
            a.matvec(&p, &mut p_t);
            eps = ip.dot(&q, &p_t);
            if eps == T::zero() {
                break; // breakdown
            }
            let beta = eps / delta;
            if beta == T::zero() {
                break; // breakdown
            }
            for ((tj, &pj), &vj) in v_t.as_mut().iter_mut().zip(p_t.as_ref()).zip(v.as_ref()) {
                *tj = pj - beta * vj;
            }
            let rho_old = rho;
            rho = ip.norm(&v_t);
            a.mattransvec(&q, &mut at_q);
            for ((tj, &aj), &wj) in w_t.as_mut().iter_mut().zip(at_q.as_ref()).zip(w.as_ref()) {
                *tj = aj - beta * wj;
            }
            xi = ip.norm(&w_t);

            let gamma_old = gamma;
            let theta_old = theta;
            theta = rho / (gamma_old * beta.abs());
            gamma = T::one() / (T::one() + theta * theta).sqrt();
            if gamma == T::zero() {
                break; // breakdown
            }
            eta = -eta * rho_old * gamma * gamma / (beta * gamma_old * gamma_old);
            let decay = (theta_old * gamma) * (theta_old * gamma);
            if i == 1 {
                for ((dj, sj), (&pj, &ptj)) in d.as_mut().iter_mut().zip(s.as_mut()).zip(p.as_ref().iter().zip(p_t.as_ref())) {
                    *dj = eta * pj;
                    *sj = eta * ptj;
                }
            } else {
                for ((dj, sj), (&pj, &ptj)) in d.as_mut().iter_mut().zip(s.as_mut()).zip(p.as_ref().iter().zip(p_t.as_ref())) {
                    *dj = eta * pj + decay * *dj;
                    *sj = eta * ptj + decay * *sj;
                }
            }
            for ((xj, rj), (&dj, &sj)) in x.as_mut().iter_mut().zip(r.as_mut()).zip(d.as_ref().iter().zip(s.as_ref())) {
                *xj = *xj + dj;
                *rj = *rj - sj;
            }

            let (stop, st) = self.conv.check(ip.norm(&r), res0, i);
            stats = st;
            if stop {
                break;
            }
        }
        Ok(stats)
    }
}
