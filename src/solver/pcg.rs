//! Preconditioned Conjugate Gradient (PCG) per Saad §9.2
//!
//! Typically paired with a `MultilevelSolver` acting as preconditioner, one cycle per application.

use crate::core::traits::{InnerProduct, MatVec};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{LinearSolver, axpy, residual};
use crate::utils::convergence::{Convergence, SolveStats};

/// Which residual norm drives the stopping test.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CgNormType {
    /// ‖M⁻¹ r‖
    Preconditioned,
    /// ‖r‖
    Unpreconditioned,
    /// √(rᵀ M⁻¹ r)
    Natural,
}

pub struct PcgSolver<T> {
    pub conv: Convergence<T>,
    pub norm_type: CgNormType,
    pub residual_history: Vec<T>,
}

impl<T: Copy + num_traits::Float> PcgSolver<T> {
    pub fn new(tol: T, max_iters: usize) -> Self {
        Self::with_convergence(Convergence::new(tol, max_iters))
    }

    pub fn with_convergence(conv: Convergence<T>) -> Self {
        Self { conv, norm_type: CgNormType::Unpreconditioned, residual_history: Vec::new() }
    }

    pub fn with_norm(mut self, norm_type: CgNormType) -> Self {
        self.norm_type = norm_type;
        self
    }
    pub fn clear_history(&mut self) {
        self.residual_history.clear();
    }
}

impl<M, V, T> LinearSolver<M, V> for PcgSolver<T>
where
    M: MatVec<V>,
    (): InnerProduct<V, Scalar = T>,
    V: AsMut<[T]> + AsRef<[T]> + From<Vec<T>> + Clone,
    T: num_traits::Float + From<f64>,
{
    type Error = KError;
    type Scalar = T;

    fn solve(&mut self, a: &M, pc: Option<&dyn Preconditioner<M, V>>, b: &V, x: &mut V) -> Result<SolveStats<T>, KError> {
        let n = b.as_ref().len();
        let ip = ();
        let apply_pc = |r: &V, z: &mut V| -> Result<(), KError> {
            match pc {
                Some(pc) => pc.apply(r, z),
                None => {
                    z.clone_from(r);
                    Ok(())
                }
            }
        };
        let measure = |r: &V, z: &V, norm_type: CgNormType| -> T {
            match norm_type {
                CgNormType::Preconditioned => ip.norm(z),
                CgNormType::Unpreconditioned => ip.norm(r),
                CgNormType::Natural => ip.dot(r, z).abs().sqrt(),
            }
        };

        let mut r = residual(a, b, x);
        let mut z = V::from(vec![T::zero(); n]);
        apply_pc(&r, &mut z)?;
        let mut p = z.clone();
        let mut rz = ip.dot(&r, &z);
        let res0 = measure(&r, &z, self.norm_type);
        self.residual_history.push(res0);
        let mut stats = SolveStats { iterations: 0, final_residual: res0, converged: self.conv.is_met(res0, res0) };
        if stats.converged {
            return Ok(stats);
        }
        let mut ap = V::from(vec![T::zero(); n]);
        for i in 1..=self.conv.max_iters {
            a.matvec(&p, &mut ap);
            let p_dot_ap = ip.dot(&p, &ap);
            // Indefinite-matrix detection
            if p_dot_ap <= T::zero() {
                return Err(KError::IndefiniteMatrix);
            }
            let alpha = rz / p_dot_ap;
            axpy(alpha, p.as_ref(), x.as_mut());
            axpy(-alpha, ap.as_ref(), r.as_mut());
            apply_pc(&r, &mut z)?;
            let rz_new = ip.dot(&r, &z);
            let res_norm = measure(&r, &z, self.norm_type);
            self.residual_history.push(res_norm);
            let (stop, s) = self.conv.check(res_norm, res0, i);
            stats = s;
            if stop {
                break;
            }
            let beta = rz_new / rz;
            for (pj, &zj) in p.as_mut().iter_mut().zip(z.as_ref()) {
                *pj = zj + beta * *pj;
            }
            rz = rz_new;
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::MatVec;
    use crate::preconditioner::Preconditioner;

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
    struct DiagonalPC(Vec<f64>);
    impl Preconditioner<DenseMat, Vec<f64>> for DiagonalPC {
        fn apply(&self, r: &Vec<f64>, z: &mut Vec<f64>) -> Result<(), crate::error::KError> {
            for ((zi, ri), di) in z.iter_mut().zip(r).zip(&self.0) {
                *zi = ri / di;
            }
            Ok(())
        }
    }

    #[test]
    fn pcg_with_and_without_preconditioner_agree() {
        // SPD system: [[4,1],[1,3]] x = [1,2]
        let a = DenseMat { data: vec![vec![4.0, 1.0], vec![1.0, 3.0]] };
        let b = vec![1.0, 2.0];
        let mut x_plain = vec![0.0, 0.0];
        let mut x_pc = vec![0.0, 0.0];
        let pc = DiagonalPC(vec![4.0, 3.0]);
        let mut plain = PcgSolver::new(1e-10, 20);
        let mut jacobi = PcgSolver::new(1e-10, 20).with_norm(CgNormType::Natural);
        assert!(plain.solve(&a, None, &b, &mut x_plain).unwrap().converged);
        let stats = jacobi.solve(&a, Some(&pc), &b, &mut x_pc).unwrap();
        assert!(stats.converged);
        let expected = vec![0.09090909090909091, 0.6363636363636364];
        for ((xi, xj), ei) in x_plain.iter().zip(&x_pc).zip(&expected) {
            assert!((xi - ei).abs() < 1e-8, "xi = {}, expected = {}", xi, ei);
            assert!((xj - ei).abs() < 1e-8, "xj = {}, expected = {}", xj, ei);
        }
        assert_eq!(jacobi.residual_history.len(), stats.iterations + 1);
    }

    #[test]
    fn pcg_detects_indefinite_matrix() {
        let a = DenseMat { data: vec![vec![1.0, 0.0], vec![0.0, -1.0]] };
        let b = vec![0.0, 1.0];
        let mut x = vec![0.0, 0.0];
        let err = PcgSolver::new(1e-10, 10).solve(&a, None, &b, &mut x).unwrap_err();
        assert!(matches!(err, KError::IndefiniteMatrix));
    }
}
