//! Conjugate Gradient (unpreconditioned) per Saad §6.1.

use crate::core::traits::{InnerProduct, MatVec};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{LinearSolver, axpy, residual};
use crate::utils::convergence::{Convergence, SolveStats};

pub struct CgSolver<T> {
    pub conv: Convergence<T>,
}

impl<T: Copy + num_traits::Float> CgSolver<T> {
    pub fn new(tol: T, max_iters: usize) -> Self {
        Self { conv: Convergence::new(tol, max_iters) }
    }

    pub fn with_convergence(conv: Convergence<T>) -> Self {
        Self { conv }
    }
}

impl<M, V, T> LinearSolver<M, V> for CgSolver<T>
where
    M: MatVec<V>,
    (): InnerProduct<V, Scalar = T>,
    V: AsMut<[T]> + AsRef<[T]> + From<Vec<T>> + Clone,
    T: num_traits::Float + From<f64>,
{
    type Error = KError;
    type Scalar = T;

    fn solve(&mut self, a: &M, pc: Option<&dyn Preconditioner<M, V>>, b: &V, x: &mut V) -> Result<SolveStats<T>, KError> {
        let _ = pc; // CG does not use preconditioner, see PcgSolver
        let n = b.as_ref().len();
        let ip = ();
        let mut r = residual(a, b, x);
        let mut p = r.clone();
        let mut rsq = ip.dot(&r, &r);
        let res0 = rsq.sqrt();
        let mut stats = SolveStats { iterations: 0, final_residual: res0, converged: self.conv.is_met(res0, res0) };
        if stats.converged {
            return Ok(stats);
        }
        let mut ap = V::from(vec![T::zero(); n]);
        for i in 1..=self.conv.max_iters {
            a.matvec(&p, &mut ap);
            let p_ap = ip.dot(&p, &ap);
            if p_ap == T::zero() {
                break;
            }
            let alpha = rsq / p_ap;
            axpy(alpha, p.as_ref(), x.as_mut());
            axpy(-alpha, ap.as_ref(), r.as_mut());
            let rsq_new = ip.dot(&r, &r);
            let (stop, s) = self.conv.check(rsq_new.sqrt(), res0, i);
            stats = s;
            if stop {
                break;
            }
            let beta = rsq_new / rsq;
            for (pj, &rj) in p.as_mut().iter_mut().zip(r.as_ref()) {
                *pj = rj + beta * *pj;
            }
            rsq = rsq_new;
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::MatVec;

    // Simple dense matrix type for testing
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

    #[test]
    fn cg_solves_simple_spd() {
        // SPD system: [[4,1],[1,3]] x = [1,2]
        let a = DenseMat { data: vec![vec![4.0, 1.0], vec![1.0, 3.0]] };
        let b = vec![1.0, 2.0];
        let mut x = vec![0.0, 0.0];
        let mut solver = CgSolver::new(1e-10, 20);
        let stats = solver.solve(&a, None, &b, &mut x).unwrap();
        let expected = vec![0.09090909090909091, 0.6363636363636364];
        let tol = 1e-8;
        for (xi, ei) in x.iter().zip(expected.iter()) {
            assert!((xi - ei).abs() < tol, "xi = {}, expected = {}", xi, ei);
        }
        assert!(stats.converged, "CG did not converge");
    }

    #[test]
    fn cg_absolute_tolerance_on_zero_rhs() {
        let a = DenseMat { data: vec![vec![2.0, 0.0], vec![0.0, 2.0]] };
        let b = vec![0.0, 0.0];
        let mut x = vec![0.0, 0.0];
        let mut solver = CgSolver::with_convergence(Convergence::absolute(1e-12, 10));
        let stats = solver.solve(&a, None, &b, &mut x).unwrap();
        assert!(stats.converged);
        assert_eq!(stats.iterations, 0);
        assert_eq!(x, vec![0.0, 0.0]);
    }
}
