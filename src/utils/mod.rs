//! Shared utilities for the iterative solvers.

pub mod convergence;
pub use convergence::{Convergence, SolveStats};
