//! mlcycle: algebraic multigrid cycling over Faer
//!
//! This crate provides the solve phase of an algebraic multigrid method: a validated hierarchy of
//! levels, V/W/F cycles with work accounting, coarse-grid solvers backed by Faer's dense and sparse
//! factorizations or by the crate's Krylov solvers, and an outer driver that can also act as a
//! preconditioner for PCG and GMRES.

pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod matrix;
pub mod multilevel;
pub mod preconditioner;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use crate::config::{Cycle, SolveOptions};
pub use crate::context::{KspContext, SolverKind};
pub use crate::core::traits::{Indexing, InnerProduct, MatTransVec, MatVec};
pub use crate::error::KError;
pub use crate::matrix::{CsrMatrix, DenseMatrix, SparseMatrix};
pub use crate::multilevel::{
    CoarseSolver, CoarseSolverKind, CycleContext, Level, MultilevelSolution, MultilevelSolver, Smoother,
    make_coarse_solver,
};
pub use crate::preconditioner::Preconditioner;
pub use crate::solver::{
    BiCgSolver, BiCgStabSolver, CgSolver, CgsSolver, DirectFactor, GmresSolver, LinearSolver, MinresSolver,
    PcgSolver, QmrSolver,
};
pub use crate::utils::convergence::{Convergence, SolveStats};
