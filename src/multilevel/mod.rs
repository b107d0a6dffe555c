//! Multigrid cycling over a ready-made hierarchy.
//!
//! The hierarchy itself (coarsening, interpolation, smoothers) is built elsewhere and handed
//! over as a list of [`Level`]s, finest first. [`MultilevelSolver`] validates it and drives
//! V, W or F cycles until the relative residual reaches the requested tolerance.
//!
//! ```rust,ignore
//! use mlcycle::{Level, MultilevelSolver, SolveOptions};
//!
//! let levels = vec![Level::new(a).with_prolongation(p).with_smoother(gauss_seidel), Level::new(ac)];
//! let ml = MultilevelSolver::new(levels, "pinv2")?;
//! let sol = ml.solve(&b, None, &SolveOptions::default().with_cycle_name("W")?)?;
//! ```

pub mod coarse;
pub mod cycle;
pub mod driver;
pub mod hierarchy;
pub mod level;

pub use coarse::{CoarseSolver, CoarseSolverKind, make_coarse_solver};
pub use cycle::CycleContext;
pub use driver::MultilevelSolution;
pub use hierarchy::{MultilevelSolver, PostprocessHook, PreprocessHook};
pub use level::{Level, Smoother};
