//! Trait definitions

mod comm;
mod map;
mod operator;
mod solver;

pub use comm::Comm;
pub use map::{DistributedMap, MapFactory};
pub use operator::Operator;
pub use solver::{SolverLibrary, SolverScalar};
