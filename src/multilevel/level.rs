//! One level of a multigrid hierarchy.

use std::fmt;

use crate::error::KError;
use crate::matrix::sparse::CsrMatrix;

/// A relaxation sweep `x ← S(A, x, b)`, applied in place.
///
/// Any `Fn(&CsrMatrix<f64>, &mut [f64], &[f64])` closure that is `Send + Sync` is a smoother.
/// Implement the trait directly when the sweep can fail.
pub trait Smoother: Send + Sync {
    fn smooth(&self, a: &CsrMatrix<f64>, x: &mut [f64], b: &[f64]) -> Result<(), KError>;
}

impl<F> Smoother for F
where
    F: Fn(&CsrMatrix<f64>, &mut [f64], &[f64]) + Send + Sync,
{
    fn smooth(&self, a: &CsrMatrix<f64>, x: &mut [f64], b: &[f64]) -> Result<(), KError> {
        self(a, x, b);
        Ok(())
    }
}

/// System matrix of one level, the transfer operators to the next coarser level,
/// and the smoothers run around the coarse-grid correction.
///
/// The coarsest level carries neither `p` nor `r`. On every other level `r` defaults
/// to `pᵀ` once the level is handed to a `MultilevelSolver`.
pub struct Level {
    pub(crate) a: CsrMatrix<f64>,
    pub(crate) p: Option<CsrMatrix<f64>>,
    pub(crate) r: Option<CsrMatrix<f64>>,
    pub(crate) presmoother: Option<Box<dyn Smoother>>,
    pub(crate) postsmoother: Option<Box<dyn Smoother>>,
}

impl Level {
    pub fn new(a: CsrMatrix<f64>) -> Self {
        Self { a, p: None, r: None, presmoother: None, postsmoother: None }
    }

    /// Prolongation from the next coarser level, `n × n_coarse`.
    pub fn with_prolongation(mut self, p: CsrMatrix<f64>) -> Self {
        self.p = Some(p);
        self
    }

    /// Restriction to the next coarser level, `n_coarse × n`.
    pub fn with_restriction(mut self, r: CsrMatrix<f64>) -> Self {
        self.r = Some(r);
        self
    }

    pub fn with_presmoother(mut self, s: impl Smoother + 'static) -> Self {
        self.presmoother = Some(Box::new(s));
        self
    }

    pub fn with_postsmoother(mut self, s: impl Smoother + 'static) -> Self {
        self.postsmoother = Some(Box::new(s));
        self
    }

    /// Same sweep before and after the coarse-grid correction.
    pub fn with_smoother<S: Smoother + Clone + 'static>(self, s: S) -> Self {
        self.with_presmoother(s.clone()).with_postsmoother(s)
    }

    pub fn a(&self) -> &CsrMatrix<f64> {
        &self.a
    }

    pub fn p(&self) -> Option<&CsrMatrix<f64>> {
        self.p.as_ref()
    }

    pub fn r(&self) -> Option<&CsrMatrix<f64>> {
        self.r.as_ref()
    }

    /// Number of unknowns on this level.
    pub fn size(&self) -> usize {
        self.a.nrows()
    }

    pub fn nnz(&self) -> usize {
        self.a.nnz()
    }

    /// Absent smoothers leave `x` untouched.
    pub(crate) fn presmooth(&self, x: &mut [f64], b: &[f64]) -> Result<(), KError> {
        match &self.presmoother {
            Some(s) => s.smooth(&self.a, x, b),
            None => Ok(()),
        }
    }

    pub(crate) fn postsmooth(&self, x: &mut [f64], b: &[f64]) -> Result<(), KError> {
        match &self.postsmoother {
            Some(s) => s.smooth(&self.a, x, b),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Level")
            .field("size", &self.size())
            .field("nnz", &self.nnz())
            .field("p", &self.p.as_ref().map(|p| (p.nrows(), p.ncols())))
            .field("r", &self.r.as_ref().map(|r| (r.nrows(), r.ncols())))
            .field("presmoother", &self.presmoother.is_some())
            .field("postsmoother", &self.postsmoother.is_some())
            .finish()
    }
}
