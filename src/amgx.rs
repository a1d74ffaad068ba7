//! Operator adapter for the AMGX multigrid library
//!
//! [AmgxOperator] uploads a [crate::sparse::DistributedCsrMatrix] into a solver
//! library and applies the solver as an operator. The library is reached
//! through the [crate::traits::SolverLibrary] trait: [HostLibrary] runs on the
//! CPU, and with the `amgx` feature `AmgxLibrary` binds the native library.
//!
//! On more than one rank, AMGX expects the rows of each rank to be numbered
//! with rows that no other rank needs first, then rows sent to neighbours, then
//! the received halo grouped by neighbour rank. [Renumbering] and
//! [CommPattern] build this layout from the import pattern of the matrix.

pub mod handles;
mod host;
mod operator;
mod reorder;

#[cfg(feature = "amgx")]
mod ffi;
#[cfg(feature = "amgx")]
mod native;

pub use host::{HostLibrary, HostMethod, HostSettings};
#[cfg(feature = "amgx")]
pub use native::AmgxLibrary;
pub use operator::{AmgxOperator, CONFIG_FILE, PARAMS_SUBLIST};
pub use reorder::{neighbor_ranks, reorder_csr, CommPattern, Renumbering, ReorderedCsr};
