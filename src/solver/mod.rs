//! Krylov & direct solver interfaces.

use crate::core::traits::MatVec;
use crate::preconditioner::Preconditioner;
use crate::utils::convergence::SolveStats;

/// Common interface for any direct or iterative solver.
pub trait LinearSolver<M, V> {
    type Error;
    type Scalar: Copy + PartialOrd + From<f64>;
    /// Solve A·x = b, writing result into `x` (which also holds the initial guess).
    /// Returns iteration stats (including convergence info).
    fn solve(
        &mut self,
        a: &M,
        pc: Option<&dyn Preconditioner<M, V>>,
        b: &V,
        x: &mut V,
    ) -> Result<SolveStats<Self::Scalar>, Self::Error>;
}

/// r = b − A x.
pub(crate) fn residual<M, V, T>(a: &M, b: &V, x: &V) -> V
where
    M: MatVec<V>,
    V: AsMut<[T]> + AsRef<[T]> + From<Vec<T>>,
    T: num_traits::Float,
{
    let n = b.as_ref().len();
    let mut r = V::from(vec![T::zero(); n]);
    a.matvec(x, &mut r);
    for (ri, &bi) in r.as_mut().iter_mut().zip(b.as_ref()) {
        *ri = bi - *ri;
    }
    r
}

/// y ← y + alpha x.
pub(crate) fn axpy<T: num_traits::Float>(alpha: T, x: &[T], y: &mut [T]) {
    for (yi, &xi) in y.iter_mut().zip(x) {
        *yi = *yi + alpha * xi;
    }
}

pub mod direct;
pub use direct::DirectFactor;

pub mod cg;
pub use cg::CgSolver;

pub mod pcg;
pub use pcg::PcgSolver;

pub mod bicg;
pub use bicg::BiCgSolver;

pub mod bicgstab;
pub use bicgstab::BiCgStabSolver;

pub mod cgs;
pub use cgs::CgsSolver;

pub mod gmres;
pub use gmres::GmresSolver;

pub mod minres;
pub use minres::MinresSolver;

pub mod qmr;
pub use qmr::QmrSolver;
