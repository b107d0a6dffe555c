//! Factory for Krylov Subspace Methods (KSP).
//!
//! This module provides the `KspContext` struct, which acts as a factory and context holder for the
//! Krylov subspace iterative solvers of this crate and an optional preconditioner. It allows users to
//! select a solver kind (directly or by name), configure solver parameters, and solve linear systems
//! in a unified way. The coarse-grid dispatcher of a multilevel hierarchy uses it for its iterative
//! strategies.
//!
//! # Usage
//!
//! 1. Construct a `KspContext` with the desired solver kind and configure tolerance, iteration limit, restart.
//! 2. Call `solve` to solve a linear system `Ax = b`.
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems. SIAM.
//! - Templates for the Solution of Linear Systems: Building Blocks for Iterative Methods, 2nd Edition (Barrett et al.)

use std::fmt;
use std::str::FromStr;

use crate::core::traits::{InnerProduct, MatTransVec, MatVec};
use crate::error::KError;
use crate::preconditioner::Preconditioner;
use crate::solver::{
    BiCgSolver, BiCgStabSolver, CgSolver, CgsSolver, GmresSolver, LinearSolver, MinresSolver, PcgSolver,
    QmrSolver,
};
use crate::utils::convergence::{Convergence, SolveStats};

/// Enum representing the available Krylov solver types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverKind {
    /// Conjugate Gradient (CG) method (for SPD matrices)
    Cg,
    /// Preconditioned Conjugate Gradient (PCG)
    Pcg,
    /// BiConjugate Gradient (BiCG)
    Bicg,
    /// BiConjugate Gradient Stabilized (BiCGStab)
    Bicgstab,
    /// Conjugate Gradient Squared (CGS)
    Cgs,
    /// Restarted GMRES, right preconditioned
    Gmres,
    /// Minimal Residual (MINRES), symmetric matrices
    Minres,
    /// Quasi-Minimal Residual (QMR)
    Qmr,
}

impl SolverKind {
    pub const ALL: [SolverKind; 8] = [
        SolverKind::Cg,
        SolverKind::Pcg,
        SolverKind::Bicg,
        SolverKind::Bicgstab,
        SolverKind::Cgs,
        SolverKind::Gmres,
        SolverKind::Minres,
        SolverKind::Qmr,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SolverKind::Cg => "cg",
            SolverKind::Pcg => "pcg",
            SolverKind::Bicg => "bicg",
            SolverKind::Bicgstab => "bicgstab",
            SolverKind::Cgs => "cgs",
            SolverKind::Gmres => "gmres",
            SolverKind::Minres => "minres",
            SolverKind::Qmr => "qmr",
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SolverKind {
    type Err = KError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SolverKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| KError::UnknownSolver(s.to_string()))
    }
}

/// Context and configuration for a Krylov subspace solver.
///
/// Holds the solver kind, optional preconditioner, stopping criteria and restart length.
/// Use `solve` to solve a linear system with the configured solver.
pub struct KspContext<M, V, T> {
    /// The type of Krylov solver to use
    pub kind: SolverKind,
    /// Optional preconditioner, honoured by PCG and GMRES
    pub pc: Option<Box<dyn Preconditioner<M, V> + Send + Sync>>,
    /// Stopping criteria
    pub conv: Convergence<T>,
    /// Restart parameter (for GMRES)
    pub restart: usize,
}

impl<M, V, T> KspContext<M, V, T>
where
    M: MatVec<V> + MatTransVec<V>,
    (): InnerProduct<V, Scalar = T>,
    V: AsMut<[T]> + AsRef<[T]> + From<Vec<T>> + Clone,
    T: num_traits::Float + From<f64>,
{
    /// Relative tolerance 1e-8, 1000 iterations, GMRES restart 30.
    pub fn new(kind: SolverKind) -> Self {
        Self { kind, pc: None, conv: Convergence::new(<T as From<f64>>::from(1e-8), 1000), restart: 30 }
    }

    pub fn with_convergence(mut self, conv: Convergence<T>) -> Self {
        self.conv = conv;
        self
    }

    pub fn with_tolerance(mut self, tol: T, max_it: usize) -> Self {
        self.conv = Convergence::new(tol, max_it);
        self
    }

    pub fn with_restart(mut self, restart: usize) -> Self {
        self.restart = restart;
        self
    }

    pub fn with_preconditioner(mut self, pc: Box<dyn Preconditioner<M, V> + Send + Sync>) -> Self {
        self.pc = Some(pc);
        self
    }

    /// Solve the linear system `Ax = b` using the configured solver and preconditioner.
    ///
    /// # Arguments
    /// * `a` - System matrix
    /// * `b` - Right-hand side vector
    /// * `x` - Initial guess, overwritten with the result
    pub fn solve(&self, a: &M, b: &V, x: &mut V) -> Result<SolveStats<T>, KError> {
        let pc = self.pc.as_deref().map(|p| p as &dyn Preconditioner<M, V>);
        let conv = self.conv.clone();
        match self.kind {
            SolverKind::Cg => CgSolver::with_convergence(conv).solve(a, pc, b, x),
            SolverKind::Pcg => PcgSolver::with_convergence(conv).solve(a, pc, b, x),
            SolverKind::Bicg => BiCgSolver::with_convergence(conv).solve(a, pc, b, x),
            SolverKind::Bicgstab => BiCgStabSolver::with_convergence(conv).solve(a, pc, b, x),
            SolverKind::Cgs => CgsSolver::with_convergence(conv).solve(a, pc, b, x),
            SolverKind::Gmres => GmresSolver::with_convergence(self.restart, conv).solve(a, pc, b, x),
            SolverKind::Minres => MinresSolver::with_convergence(conv).solve(a, pc, b, x),
            SolverKind::Qmr => QmrSolver::with_convergence(conv).solve(a, pc, b, x),
        }
    }
}
