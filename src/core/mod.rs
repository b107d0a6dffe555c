//! Core traits and their implementations for vectors, dense and sparse matrices.

pub mod traits;
pub mod wrappers;

pub use traits::{Indexing, InnerProduct, MatTransVec, MatVec};
