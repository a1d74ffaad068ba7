//! Map with hashed global lookup
use crate::map::{check_elements, reduce_global_size};
use crate::traits::{Comm, DistributedMap};
use crate::types::Result;
use std::collections::HashMap;

/// A map holding arbitrary global indices, with a hash table for global to local lookup
#[derive(Debug, Clone)]
pub struct HashedMap {
    global_size: usize,
    index_base: usize,
    indices: Vec<usize>,
    lookup: HashMap<usize, usize>,
}

impl HashedMap {
    /// Create a map holding `elements` on this process.
    ///
    /// This is collective over `comm`.
    pub fn new(
        global_size: Option<usize>,
        elements: &[usize],
        index_base: usize,
        comm: &dyn Comm,
    ) -> Result<Self> {
        let global_size = reduce_global_size(global_size, elements.len(), comm)?;
        check_elements(elements, index_base)?;
        let lookup = elements
            .iter()
            .enumerate()
            .map(|(lid, gid)| (*gid, lid))
            .collect();
        Ok(Self {
            global_size,
            index_base,
            indices: elements.to_vec(),
            lookup,
        })
    }
}

impl DistributedMap for HashedMap {
    fn global_size(&self) -> usize {
        self.global_size
    }
    fn local_size(&self) -> usize {
        self.indices.len()
    }
    fn index_base(&self) -> usize {
        self.index_base
    }
    fn global_index(&self, local_index: usize) -> Option<usize> {
        self.indices.get(local_index).copied()
    }
    fn local_index(&self, global_index: usize) -> Option<usize> {
        self.lookup.get(&global_index).copied()
    }
    fn global_indices(&self) -> Vec<usize> {
        self.indices.clone()
    }
}
