//! Preconditioners for linear solvers.
//!
//! This module defines the Preconditioner trait. `MultilevelSolver` implements it by running
//! one cycle from a zero initial guess, so a hierarchy can accelerate PCG or GMRES.

use crate::error::KError;

/// A preconditioner M ≈ A⁻¹.
pub trait Preconditioner<M, V> {
    /// Apply M⁻¹ to r, writing z = M⁻¹ r
    fn apply(&self, r: &V, z: &mut V) -> Result<(), KError>;
    /// Optionally: setup/factorize from A
    fn setup(&mut self, _a: &M) -> Result<(), KError> {
        Ok(())
    }
}
