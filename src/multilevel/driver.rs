//! Outer iteration: repeated cycles until the relative residual drops below tolerance.

use std::borrow::Cow;

use log::debug;

use crate::config::SolveOptions;
use crate::core::wrappers::norm2;
use crate::error::KError;
use crate::matrix::sparse::CsrMatrix;
use crate::multilevel::MultilevelSolver;
use crate::multilevel::cycle::{CycleContext, run_cycle};
use crate::preconditioner::Preconditioner;
use crate::utils::convergence::SolveStats;

/// Outcome of `MultilevelSolver::solve`.
#[derive(Debug, Clone)]
pub struct MultilevelSolution {
    pub x: Vec<f64>,
    /// ‖b − A x‖ before the first cycle and after each cycle, when requested.
    pub residuals: Option<Vec<f64>>,
    /// `iterations` counts cycles; `converged` means the relative residual reached `tol`.
    pub stats: SolveStats<f64>,
    /// Work of the first cycle relative to a finest-level mat-vec.
    pub cycle_complexity: f64,
    pub coarse_solves: usize,
}

impl MultilevelSolver {
    /// Solve `A_0 x = b` by cycling from `x0` (zeros when absent).
    pub fn solve(&self, b: &[f64], x0: Option<&[f64]>, opts: &SolveOptions) -> Result<MultilevelSolution, KError> {
        self.solve_with_callback(b, x0, opts, |_| {})
    }

    /// As `solve`, calling `callback` with the iterate after every cycle.
    pub fn solve_with_callback(
        &self,
        b: &[f64],
        x0: Option<&[f64]>,
        opts: &SolveOptions,
        mut callback: impl FnMut(&[f64]),
    ) -> Result<MultilevelSolution, KError> {
        let a = &self.levels[0].a;
        let n = a.nrows();
        KError::check_len("right-hand side", n, b.len())?;
        let mut x = match x0 {
            Some(x0) => {
                KError::check_len("initial guess", n, x0.len())?;
                x0.to_vec()
            }
            None => vec![0.0; n],
        };
        let mut b = Cow::Borrowed(b);
        if let Some(pre) = &self.preprocess {
            let (px, pb) = pre(x, b.into_owned());
            KError::check_len("preprocessed initial guess", n, px.len())?;
            KError::check_len("preprocessed right-hand side", n, pb.len())?;
            x = px;
            b = Cow::Owned(pb);
        }

        let r0 = norm2(&a.residual(&b, &x));
        let mut residuals = vec![r0];
        let mut ctx = CycleContext::new();
        // a zero initial residual gives NaN here and no cycle runs
        while residuals.len() <= opts.maxiter && residuals[residuals.len() - 1] / r0 > opts.tol {
            if self.levels.len() == 1 {
                x = self.coarse_solver.solve(a, &b)?;
                ctx.count_coarse_solve();
            } else {
                run_cycle(&self.levels, &self.coarse_solver, 0, &mut x, &b, opts.cycle, &mut ctx)?;
            }
            let res = norm2(&a.residual(&b, &x));
            residuals.push(res);
            ctx.finish_pass();
            debug!("{} cycle {}: relative residual {:e}", opts.cycle, residuals.len() - 1, res / r0);
            callback(&x);
        }

        if let Some(post) = &self.postprocess {
            x = post(x);
            KError::check_len("postprocessed solution", n, x.len())?;
        }

        let final_residual = residuals[residuals.len() - 1];
        let stats = SolveStats {
            iterations: residuals.len() - 1,
            final_residual,
            converged: final_residual <= opts.tol * r0,
        };
        Ok(MultilevelSolution {
            x,
            residuals: opts.return_residuals.then_some(residuals),
            stats,
            cycle_complexity: ctx.cycle_complexity(&self.levels),
            coarse_solves: ctx.coarse_solves(),
        })
    }

    /// One V-cycle from a zero guess: an approximation of `A_0⁻¹ b`.
    pub fn psolve(&self, b: &[f64]) -> Result<Vec<f64>, KError> {
        let opts = SolveOptions::default().with_maxiter(1);
        Ok(self.solve(b, None, &opts)?.x)
    }
}

impl Preconditioner<CsrMatrix<f64>, Vec<f64>> for MultilevelSolver {
    fn apply(&self, r: &Vec<f64>, z: &mut Vec<f64>) -> Result<(), KError> {
        KError::check_len("preconditioner output", r.len(), z.len())?;
        let x = self.psolve(r)?;
        z.copy_from_slice(&x);
        Ok(())
    }
}
