//! Convergence tracking & tolerance checks for iterative solvers.

/// Stopping criteria & stats.
///
/// An iteration has converged once the residual drops below `atol`, or below `tol`
/// relative to the initial residual. It stops at `max_iters` either way.
#[derive(Clone, Debug)]
pub struct Convergence<T> {
    pub tol: T,
    pub atol: T,
    pub max_iters: usize,
}

#[derive(Clone, Debug)]
pub struct SolveStats<T> {
    pub iterations: usize,
    pub final_residual: T,
    pub converged: bool,
}

impl<T: Copy + num_traits::Float> Convergence<T> {
    /// Relative criterion ‖r‖/‖r₀‖ ≤ tol.
    pub fn new(tol: T, max_iters: usize) -> Self {
        Self { tol, atol: T::zero(), max_iters }
    }

    /// Absolute criterion ‖r‖ ≤ atol.
    pub fn absolute(atol: T, max_iters: usize) -> Self {
        Self { tol: T::zero(), atol, max_iters }
    }

    pub fn is_met(&self, res_norm: T, res0_norm: T) -> bool {
        res_norm <= self.atol || res_norm / res0_norm <= self.tol
    }

    /// Returns (should_stop, stats) given current `res_norm` and iteration `i`.
    pub fn check(
        &self,
        res_norm: T,
        res0_norm: T,
        i: usize,
    ) -> (bool, SolveStats<T>) {
        let converged = self.is_met(res_norm, res0_norm);
        (
            converged || i >= self.max_iters,
            SolveStats {
                iterations: i,
                final_residual: res_norm,
                converged,
            },
        )
    }
}
