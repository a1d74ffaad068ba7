//! Distributed index maps
mod backend;
mod cartesian;
mod compact;
mod hashed;

pub use backend::{CompactMapFactory, HashedMapFactory, MapBackend};
pub use cartesian::{cartesian_2d, CartesianPartition};
pub use compact::CompactMap;
pub use hashed::HashedMap;

use crate::traits::Comm;
use crate::types::{Error, Result};

/// Check the global size of a map against the local sizes of all ranks.
///
/// This is collective over `comm`. Returns the global size.
fn reduce_global_size(
    global_size: Option<usize>,
    local_size: usize,
    comm: &dyn Comm,
) -> Result<usize> {
    let total = comm.all_reduce_sum_count(local_size);
    match global_size {
        Some(n) if n != total => Err(Error::InvalidMap(format!(
            "global size {n} does not match the {total} indices held over {} ranks",
            comm.size()
        ))),
        _ => Ok(total),
    }
}

/// Check that no element is repeated or lies below the index base.
fn check_elements(elements: &[usize], index_base: usize) -> Result<()> {
    if let Some(e) = elements.iter().find(|e| **e < index_base) {
        return Err(Error::InvalidMap(format!(
            "index {e} lies below the index base {index_base}"
        )));
    }
    let mut sorted = elements.to_vec();
    sorted.sort_unstable();
    if let Some(w) = sorted.windows(2).find(|w| w[0] == w[1]) {
        return Err(Error::InvalidMap(format!(
            "index {} is held more than once",
            w[0]
        )));
    }
    Ok(())
}
