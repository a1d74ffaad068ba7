//! Distributed sparse matrices and vectors
mod csr;
mod gallery;
mod import;
mod vector;

pub use csr::DistributedCsrMatrix;
pub use gallery::{cross_2d, laplace_2d, Stencil};
pub use import::Import;
pub use vector::MultiVector;
