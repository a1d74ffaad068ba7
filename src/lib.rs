//! Cartamg
//!
//! Partitioning of structured 2D grids across parallel ranks, and an operator
//! adapter that hands a distributed sparse matrix to the AMGX multigrid library.
#![cfg_attr(feature = "strict", deny(warnings))]
#![warn(missing_docs)]

pub mod amgx;
pub mod comm;
pub mod map;
pub mod params;
pub mod sparse;
pub mod traits;
pub mod types;

pub use types::{Error, Result};
