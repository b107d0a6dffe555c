//! Configuration types for the multilevel driver.

pub mod options;
pub use options::{Cycle, SolveOptions};
