//! Context module for mlcycle.
//!
//! This module provides context/factory types for configuring and running the Krylov solvers.
//! Contexts encapsulate algorithm selection and parameter management.
//!
//! Modules:
//! - [`ksp_context`]: Contains `SolverKind` and the `KspContext` struct for Krylov subspace solver configuration.
//!
//! # Example
//! ```rust,ignore
//! use mlcycle::context::{KspContext, SolverKind};
//! let ksp = KspContext::new("gmres".parse::<SolverKind>()?).with_restart(20);
//! ksp.solve(&a, &b, &mut x)?;
//! ```
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems. SIAM.
//! - PETSc documentation: https://petsc.org/release/docs/manualpages/KSP/

pub mod ksp_context;
pub use ksp_context::{KspContext, SolverKind};
