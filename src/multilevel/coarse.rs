//! Coarse-grid solver dispatch.
//!
//! A strategy name is resolved once into a `CoarseSolverKind`. The resulting `CoarseSolver`
//! factors the coarsest matrix on first use and reuses that factorization for every later
//! solve, so one instance must only ever see one matrix.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use log::{trace, warn};

use crate::context::{KspContext, SolverKind};
use crate::error::KError;
use crate::matrix::sparse::CsrMatrix;
use crate::solver::DirectFactor;
use crate::utils::convergence::Convergence;

/// Absolute residual target of the iterative strategies.
const KRYLOV_ATOL: f64 = 1e-12;
const KRYLOV_MAX_RESTART: usize = 20;

/// How the coarsest system is solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CoarseSolverKind {
    /// Dense pseudo-inverse from a column-pivoted QR.
    Pinv,
    /// Dense pseudo-inverse from an SVD.
    #[default]
    Pinv2,
    Lu,
    Cholesky,
    /// Sparse LU, no densification.
    Splu,
    /// Iterative solve from a zero guess on every call.
    Krylov(SolverKind),
    /// No coarse solve: the correction is zero.
    Null,
}

impl CoarseSolverKind {
    pub fn name(&self) -> &'static str {
        match self {
            CoarseSolverKind::Pinv => "pinv",
            CoarseSolverKind::Pinv2 => "pinv2",
            CoarseSolverKind::Lu => "lu",
            CoarseSolverKind::Cholesky => "cholesky",
            CoarseSolverKind::Splu => "splu",
            CoarseSolverKind::Krylov(kind) => kind.name(),
            CoarseSolverKind::Null => "none",
        }
    }
}

impl fmt::Display for CoarseSolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CoarseSolverKind {
    type Err = KError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "pinv" => CoarseSolverKind::Pinv,
            "pinv2" => CoarseSolverKind::Pinv2,
            "lu" => CoarseSolverKind::Lu,
            "cholesky" => CoarseSolverKind::Cholesky,
            "splu" => CoarseSolverKind::Splu,
            "cg" | "bicg" | "bicgstab" | "cgs" | "gmres" | "minres" | "qmr" => {
                CoarseSolverKind::Krylov(s.parse()?)
            }
            "none" | "null" | "" => CoarseSolverKind::Null,
            _ => return Err(KError::UnknownCoarseSolver(s.to_string())),
        };
        Ok(kind)
    }
}

/// Resolve a strategy name into a solver. Unknown names are `KError::UnknownCoarseSolver`.
pub fn make_coarse_solver(name: &str) -> Result<CoarseSolver, KError> {
    Ok(CoarseSolver::new(name.parse()?))
}

/// A coarse-grid strategy plus its lazily computed factorization.
#[derive(Debug, Default)]
pub struct CoarseSolver {
    kind: CoarseSolverKind,
    factor: OnceLock<DirectFactor>,
}

impl CoarseSolver {
    pub fn new(kind: CoarseSolverKind) -> Self {
        Self { kind, factor: OnceLock::new() }
    }

    pub fn kind(&self) -> CoarseSolverKind {
        self.kind
    }

    /// True once a factorization has been computed and cached.
    pub fn is_factored(&self) -> bool {
        self.factor.get().is_some()
    }

    /// Solve `A x = b`. The result always has `b.len()` entries.
    pub fn solve(&self, a: &CsrMatrix<f64>, b: &[f64]) -> Result<Vec<f64>, KError> {
        KError::check_len("coarse matrix rows", b.len(), a.nrows())?;
        KError::check_len("coarse matrix columns", b.len(), a.ncols())?;
        if b.is_empty() {
            return Ok(Vec::new());
        }
        let x = match self.kind {
            CoarseSolverKind::Null => vec![0.0; b.len()],
            CoarseSolverKind::Krylov(kind) => self.krylov(kind, a, b)?,
            _ => self.factorization(a)?.solve(b),
        };
        KError::check_len("coarse solution", b.len(), x.len())?;
        Ok(x)
    }

    fn factorization(&self, a: &CsrMatrix<f64>) -> Result<&DirectFactor, KError> {
        if let Some(f) = self.factor.get() {
            return Ok(f);
        }
        trace!("factoring {}x{} coarse matrix ({})", a.nrows(), a.ncols(), self.kind);
        let factor = match self.kind {
            CoarseSolverKind::Pinv => DirectFactor::pinv_qr(a),
            CoarseSolverKind::Pinv2 => DirectFactor::pinv_svd(a)?,
            CoarseSolverKind::Lu => DirectFactor::lu(a),
            CoarseSolverKind::Cholesky => DirectFactor::cholesky(a)?,
            CoarseSolverKind::Splu => DirectFactor::sparse_lu(a)?,
            CoarseSolverKind::Krylov(_) | CoarseSolverKind::Null => {
                return Err(KError::SolveError(format!("{} has no factorization", self.kind)));
            }
        };
        // a concurrent caller may have won the race; either factorization is of the same matrix
        Ok(self.factor.get_or_init(|| factor))
    }

    fn krylov(&self, kind: SolverKind, a: &CsrMatrix<f64>, b: &[f64]) -> Result<Vec<f64>, KError> {
        let n = b.len();
        let ksp = KspContext::new(kind)
            .with_convergence(Convergence::absolute(KRYLOV_ATOL, 10 * n))
            .with_restart(n.min(KRYLOV_MAX_RESTART));
        let b = b.to_vec();
        let mut x = vec![0.0; n];
        let stats = ksp.solve(a, &b, &mut x)?;
        if !stats.converged {
            warn!(
                "coarse {kind} solve stopped after {} iterations at residual {:e}",
                stats.iterations, stats.final_residual
            );
        }
        Ok(x)
    }
}
