//! Options for the multilevel solve driver.
//!
//! This module provides `SolveOptions`, the parameters of one call to
//! `MultilevelSolver::solve`, and `Cycle`, the recursion pattern of a multigrid
//! cycle. Both can be built directly or parsed from strings (command line, config files).

use std::fmt;
use std::str::FromStr;

use crate::error::KError;

/// Recursion pattern of one multigrid cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cycle {
    /// One coarse-grid correction per level.
    #[default]
    V,
    /// Two chained coarse-grid corrections per level.
    W,
    /// An F-cycle at the next level followed by a V-cycle.
    F,
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Cycle::V => "V",
            Cycle::W => "W",
            Cycle::F => "F",
        };
        f.write_str(s)
    }
}

impl FromStr for Cycle {
    type Err = KError;

    /// Accepts `V`, `W`, `F` in either case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "V" | "v" => Ok(Cycle::V),
            "W" | "w" => Ok(Cycle::W),
            "F" | "f" => Ok(Cycle::F),
            _ => Err(KError::UnknownCycle(s.to_string())),
        }
    }
}

/// Driver parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOptions {
    /// Relative residual target ‖r‖/‖r₀‖.
    pub tol: f64,
    /// Maximum number of cycles.
    pub maxiter: usize,
    pub cycle: Cycle,
    /// Keep the residual norm of every iterate in the result.
    pub return_residuals: bool,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self { tol: 1e-5, maxiter: 100, cycle: Cycle::V, return_residuals: false }
    }
}

impl SolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_maxiter(mut self, maxiter: usize) -> Self {
        self.maxiter = maxiter;
        self
    }

    pub fn with_cycle(mut self, cycle: Cycle) -> Self {
        self.cycle = cycle;
        self
    }

    /// Parse the cycle kind from its name; unknown names are `KError::UnknownCycle`.
    pub fn with_cycle_name(self, name: &str) -> Result<Self, KError> {
        Ok(self.with_cycle(name.parse()?))
    }

    pub fn with_residuals(mut self, return_residuals: bool) -> Self {
        self.return_residuals = return_residuals;
        self
    }
}
