//! The multilevel hierarchy: levels, coarse solver, hooks and complexity reporting.

use std::fmt;

use log::debug;

use crate::config::Cycle;
use crate::error::KError;
use crate::multilevel::coarse::{CoarseSolver, CoarseSolverKind};
use crate::multilevel::cycle::{CycleContext, dry_cycle};
use crate::multilevel::level::Level;

/// Runs once before cycling; may replace both the initial guess and the right-hand side.
pub type PreprocessHook = Box<dyn Fn(Vec<f64>, Vec<f64>) -> (Vec<f64>, Vec<f64>) + Send + Sync>;
/// Runs once on the final iterate.
pub type PostprocessHook = Box<dyn Fn(Vec<f64>) -> Vec<f64> + Send + Sync>;

/// A validated multigrid hierarchy, finest level first, ready to cycle.
pub struct MultilevelSolver {
    pub(crate) levels: Vec<Level>,
    pub(crate) coarse_solver: CoarseSolver,
    pub(crate) preprocess: Option<PreprocessHook>,
    pub(crate) postprocess: Option<PostprocessHook>,
}

impl MultilevelSolver {
    /// Build from levels and a coarse strategy name (`"pinv2"`, `"splu"`, `"cg"`, ...).
    pub fn new(levels: Vec<Level>, coarse_solver: &str) -> Result<Self, KError> {
        Self::with_coarse_solver(levels, coarse_solver.parse()?)
    }

    /// Build from levels and an already resolved strategy.
    ///
    /// Every level but the last needs a prolongation; a missing restriction becomes the
    /// transpose of the prolongation. All shapes are checked here so cycling cannot hit
    /// a mismatch later.
    pub fn with_coarse_solver(mut levels: Vec<Level>, kind: CoarseSolverKind) -> Result<Self, KError> {
        if levels.is_empty() {
            return Err(KError::EmptyHierarchy);
        }
        let last = levels.len() - 1;
        for l in 0..levels.len() {
            let n = levels[l].size();
            KError::check_len("level matrix columns", n, levels[l].a.ncols())?;
            if l == last {
                if levels[l].p.is_some() {
                    return Err(KError::CoarsestHasOperator { level: l, what: "prolongation" });
                }
                if levels[l].r.is_some() {
                    return Err(KError::CoarsestHasOperator { level: l, what: "restriction" });
                }
                continue;
            }
            let nc = levels[l + 1].size();
            let level = &mut levels[l];
            let p = level.p.as_ref().ok_or(KError::IncompleteLevel { level: l, what: "prolongation" })?;
            KError::check_len("prolongation rows", n, p.nrows())?;
            KError::check_len("prolongation columns", nc, p.ncols())?;
            if level.r.is_none() {
                level.r = Some(p.transpose());
            }
            if let Some(r) = level.r.as_ref() {
                KError::check_len("restriction rows", nc, r.nrows())?;
                KError::check_len("restriction columns", n, r.ncols())?;
            }
        }
        let solver = Self { levels, coarse_solver: CoarseSolver::new(kind), preprocess: None, postprocess: None };
        debug!(
            "multilevel hierarchy: {} levels, finest n = {}, coarse solver {}, operator complexity {:.3}",
            solver.levels.len(),
            solver.levels[0].size(),
            kind,
            solver.operator_complexity()
        );
        Ok(solver)
    }

    pub fn with_preprocess(
        mut self,
        hook: impl Fn(Vec<f64>, Vec<f64>) -> (Vec<f64>, Vec<f64>) + Send + Sync + 'static,
    ) -> Self {
        self.preprocess = Some(Box::new(hook));
        self
    }

    pub fn with_postprocess(mut self, hook: impl Fn(Vec<f64>) -> Vec<f64> + Send + Sync + 'static) -> Self {
        self.postprocess = Some(Box::new(hook));
        self
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn coarse_solver(&self) -> &CoarseSolver {
        &self.coarse_solver
    }

    /// Σ nnz(A_l) / nnz(A_0).
    pub fn operator_complexity(&self) -> f64 {
        let total: usize = self.levels.iter().map(Level::nnz).sum();
        total as f64 / self.levels[0].nnz() as f64
    }

    /// Σ n_l / n_0.
    pub fn grid_complexity(&self) -> f64 {
        let total: usize = self.levels.iter().map(Level::size).sum();
        total as f64 / self.levels[0].size() as f64
    }

    /// Work of one cycle of the given kind relative to a finest-level mat-vec, without solving anything.
    /// A single-level hierarchy never cycles and reports zero.
    pub fn cycle_complexity(&self, cycle: Cycle) -> f64 {
        if self.levels.len() < 2 {
            return 0.0;
        }
        let mut ctx = CycleContext::new();
        dry_cycle(&self.levels, 0, cycle, &mut ctx);
        ctx.cycle_complexity(&self.levels)
    }
}

impl fmt::Display for MultilevelSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MultilevelSolver")?;
        writeln!(f, "Number of Levels:     {}", self.levels.len())?;
        writeln!(f, "Operator Complexity: {:6.3}", self.operator_complexity())?;
        writeln!(f, "Grid Complexity:     {:6.3}", self.grid_complexity())?;
        writeln!(f, "Coarse Solver:       {}", self.coarse_solver.kind())?;
        let total_nnz: usize = self.levels.iter().map(Level::nnz).sum();
        writeln!(f, "  level   unknowns     nonzeros")?;
        for (l, level) in self.levels.iter().enumerate() {
            let share = 100.0 * level.nnz() as f64 / total_nnz as f64;
            writeln!(f, "   {:2}   {:10}   {:10} [{:5.2}%]", l, level.a.ncols(), level.nnz(), share)?;
        }
        Ok(())
    }
}

impl fmt::Debug for MultilevelSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultilevelSolver")
            .field("levels", &self.levels)
            .field("coarse_solver", &self.coarse_solver)
            .field("preprocess", &self.preprocess.is_some())
            .field("postprocess", &self.postprocess.is_some())
            .finish()
    }
}
