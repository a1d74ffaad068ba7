//! Distributed maps
use crate::traits::Comm;
use crate::types::Result;
use std::fmt::Debug;
use std::sync::Arc;

/// An assignment of global indices to the local process.
pub trait DistributedMap: Debug + Send + Sync {
    /// The number of indices over all processes
    fn global_size(&self) -> usize;

    /// The number of indices on this process
    fn local_size(&self) -> usize;

    /// The smallest valid global index
    fn index_base(&self) -> usize;

    /// Global index of a local index
    fn global_index(&self, local_index: usize) -> Option<usize>;

    /// Local index of a global index, if it is held on this process
    fn local_index(&self, global_index: usize) -> Option<usize>;

    /// The global indices held on this process, in local order
    fn global_indices(&self) -> Vec<usize>;

    /// Check if this process holds a global index
    fn contains(&self, global_index: usize) -> bool {
        self.local_index(global_index).is_some()
    }
}

/// Construction strategy for one distributed map representation.
pub trait MapFactory {
    /// Name of the representation
    fn name(&self) -> &'static str;

    /// Build a map holding `elements` on this process.
    ///
    /// If `global_size` is given it is checked against the sum of local sizes,
    /// otherwise it is computed. This is collective over `comm`.
    fn build(
        &self,
        global_size: Option<usize>,
        elements: &[usize],
        index_base: usize,
        comm: &dyn Comm,
    ) -> Result<Arc<dyn DistributedMap>>;
}
