//! Multivectors
use crate::traits::DistributedMap;
use crate::types::{Error, Result};
use num::Zero;
use std::sync::Arc;

/// A set of vectors sharing one distributed map, stored column by column
#[derive(Debug, Clone)]
pub struct MultiVector<T> {
    map: Arc<dyn DistributedMap>,
    columns: Vec<Vec<T>>,
}

impl<T: Zero + Clone> MultiVector<T> {
    /// Create zero vectors
    pub fn new(map: Arc<dyn DistributedMap>, num_vectors: usize) -> Self {
        let n = map.local_size();
        Self {
            map,
            columns: vec![vec![T::zero(); n]; num_vectors],
        }
    }
}

impl<T> MultiVector<T> {
    /// Create vectors from the local entries of each column
    pub fn from_columns(map: Arc<dyn DistributedMap>, columns: Vec<Vec<T>>) -> Result<Self> {
        if let Some(c) = columns.iter().find(|c| c.len() != map.local_size()) {
            return Err(Error::InvalidMatrix(format!(
                "vector of length {} does not match the {} local indices of its map",
                c.len(),
                map.local_size()
            )));
        }
        Ok(Self { map, columns })
    }

    /// The map of the vectors
    pub fn map(&self) -> &Arc<dyn DistributedMap> {
        &self.map
    }

    /// The number of vectors
    pub fn num_vectors(&self) -> usize {
        self.columns.len()
    }

    /// The number of entries of each vector held on this process
    pub fn local_length(&self) -> usize {
        self.map.local_size()
    }

    /// The local entries of one vector
    pub fn column(&self, index: usize) -> &[T] {
        &self.columns[index]
    }

    /// The local entries of one vector, mutably
    pub fn column_mut(&mut self, index: usize) -> &mut [T] {
        &mut self.columns[index]
    }
}

#[cfg(test)]
mod test {
    use super::MultiVector;
    use crate::comm::SelfComm;
    use crate::map::HashedMap;
    use std::sync::Arc;

    #[test]
    fn test_create() {
        let map = Arc::new(HashedMap::new(None, &[0, 1, 2], 0, &SelfComm).unwrap());
        let mut v = MultiVector::<f64>::new(map.clone(), 2);
        assert_eq!(v.num_vectors(), 2);
        assert_eq!(v.local_length(), 3);
        v.column_mut(1)[2] = 1.5;
        assert_eq!(v.column(1), &[0.0, 0.0, 1.5]);
        assert!(MultiVector::from_columns(map, vec![vec![1.0, 2.0]]).is_err());
    }
}
