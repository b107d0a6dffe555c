use thiserror::Error;

// Unified error type for mlcycle

#[derive(Error, Debug)]
pub enum KError {
    #[error("factorization error: {0}")]
    FactorError(String),
    #[error("solve error: {0}")]
    SolveError(String),
    #[error("indefinite matrix detected (p^T A p <= 0)")]
    IndefiniteMatrix,
    #[error("unrecognized cycle type: {0:?} (expected V, W or F)")]
    UnknownCycle(String),
    #[error("unknown coarse solver: {0:?}")]
    UnknownCoarseSolver(String),
    #[error("unknown Krylov solver: {0:?}")]
    UnknownSolver(String),
    #[error("multilevel hierarchy has no levels")]
    EmptyHierarchy,
    #[error("level {level} is missing its {what}")]
    IncompleteLevel { level: usize, what: &'static str },
    #[error("coarsest level {level} must not have a {what}")]
    CoarsestHasOperator { level: usize, what: &'static str },
    #[error("dimension mismatch for {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("invalid sparse structure: {0}")]
    InvalidStructure(String),
}

impl KError {
    /// True for errors caused by how the solver was configured rather than by the numbers.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            KError::UnknownCycle(_)
                | KError::UnknownCoarseSolver(_)
                | KError::UnknownSolver(_)
                | KError::EmptyHierarchy
                | KError::IncompleteLevel { .. }
                | KError::CoarsestHasOperator { .. }
        )
    }

    pub(crate) fn check_len(what: &'static str, expected: usize, found: usize) -> Result<(), KError> {
        if expected == found {
            Ok(())
        } else {
            Err(KError::DimensionMismatch { what, expected, found })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numerical_and_shape_errors_are_not_configuration() {
        let errors = [
            KError::FactorError("svd".into()),
            KError::SolveError("breakdown".into()),
            KError::IndefiniteMatrix,
            KError::DimensionMismatch { what: "rhs", expected: 3, found: 2 },
            KError::InvalidStructure("row pointer".into()),
        ];
        for err in &errors {
            assert!(!err.is_configuration(), "{err}");
        }
        assert!(KError::CoarsestHasOperator { level: 2, what: "restriction" }.is_configuration());
        assert_eq!(
            KError::check_len("rhs", 3, 2).unwrap_err().to_string(),
            "dimension mismatch for rhs: expected 3, found 2"
        );
    }
}
