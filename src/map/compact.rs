//! Map with 32-bit ordinals
use crate::map::{check_elements, reduce_global_size};
use crate::traits::{Comm, DistributedMap};
use crate::types::{Error, Result};

/// A map that stores its global indices as 32-bit ordinals.
///
/// Global lookup is a binary search over a sorted copy of the indices.
#[derive(Debug, Clone)]
pub struct CompactMap {
    global_size: i32,
    index_base: i32,
    indices: Vec<i32>,
    sorted: Vec<(i32, i32)>,
}

fn ordinal(value: usize, what: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| {
        Error::Unsupported(format!(
            "{what} {value} does not fit in a 32-bit ordinal"
        ))
    })
}

impl CompactMap {
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
        let indices = elements
            .iter()
            .map(|e| ordinal(*e, "global index"))
            .collect::<Result<Vec<_>>>()?;
        let mut sorted = indices
            .iter()
            .enumerate()
            .map(|(lid, gid)| (*gid, lid as i32))
            .collect::<Vec<_>>();
        sorted.sort_unstable();
        Ok(Self {
            global_size: ordinal(global_size, "global size")?,
            index_base: ordinal(index_base, "index base")?,
            indices,
            sorted,
        })
    }
}

impl DistributedMap for CompactMap {
    fn global_size(&self) -> usize {
        self.global_size as usize
    }
    fn local_size(&self) -> usize {
        self.indices.len()
    }
    fn index_base(&self) -> usize {
        self.index_base as usize
    }
    fn global_index(&self, local_index: usize) -> Option<usize> {
        self.indices.get(local_index).map(|g| *g as usize)
    }
    fn local_index(&self, global_index: usize) -> Option<usize> {
        let gid = i32::try_from(global_index).ok()?;
        self.sorted
            .binary_search_by_key(&gid, |(g, _)| *g)
            .ok()
            .map(|i| self.sorted[i].1 as usize)
    }
    fn global_indices(&self) -> Vec<usize> {
        self.indices.iter().map(|g| *g as usize).collect()
    }
}

#[cfg(test)]
mod test {
    use super::CompactMap;
    use crate::comm::SelfComm;
    use crate::traits::DistributedMap;
    use crate::types::Error;

    #[test]
    fn test_lookup() {
        let map = CompactMap::new(None, &[10, 4, 7], 0, &SelfComm).unwrap();
        assert_eq!(map.global_size(), 3);
        assert_eq!(map.local_index(7), Some(2));
        assert_eq!(map.local_index(4), Some(1));
        assert_eq!(map.local_index(5), None);
        assert_eq!(map.global_index(0), Some(10));
        assert_eq!(map.global_index(3), None);
    }

    #[test]
    fn test_large_index_is_unsupported() {
        let big = i32::MAX as usize + 1;
        assert!(matches!(
            CompactMap::new(None, &[0, big], 0, &SelfComm),
            Err(Error::Unsupported(_))
        ));
    }
}
