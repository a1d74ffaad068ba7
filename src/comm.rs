//! Communicator implementations

mod serial;
mod threaded;

#[cfg(feature = "mpi")]
mod parallel;

pub use serial::SelfComm;
pub use threaded::ThreadComm;
