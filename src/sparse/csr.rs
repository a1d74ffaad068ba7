//! Row-distributed CSR matrices
use crate::sparse::Import;
use crate::traits::{Comm, DistributedMap, MapFactory};
use crate::types::{Error, Result};
use itertools::Itertools;
use rayon::prelude::{IndexedParallelIterator, IntoParallelRefMutIterator, ParallelIterator};
use std::collections::HashMap;
use std::sync::Arc;

/// A sparse matrix whose rows are distributed by a row map.
///
/// Column indices are local indices of the column map. The column map holds the
/// global indices of the row map first, in the same order, followed by the
/// remote indices that the rows on this process refer to.
#[derive(Debug, Clone)]
pub struct DistributedCsrMatrix<T> {
    row_map: Arc<dyn DistributedMap>,
    col_map: Arc<dyn DistributedMap>,
    row_ptr: Vec<usize>,
    col_indices: Vec<usize>,
    values: Vec<T>,
    import: Option<Import>,
}

impl<T: Copy + Send + Sync> DistributedCsrMatrix<T> {
    /// Create a matrix from local CSR data
    pub fn new(
        row_map: Arc<dyn DistributedMap>,
        col_map: Arc<dyn DistributedMap>,
        row_ptr: Vec<usize>,
        col_indices: Vec<usize>,
        values: Vec<T>,
        import: Option<Import>,
    ) -> Result<Self> {
        let n = row_map.local_size();
        let nc = col_map.local_size();
        if row_ptr.len() != n + 1 || row_ptr[0] != 0 {
            return Err(Error::InvalidMatrix(format!(
                "row pointer of length {} for {n} rows",
                row_ptr.len()
            )));
        }
        if row_ptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::InvalidMatrix(
                "row pointer is not monotone".to_string(),
            ));
        }
        if row_ptr[n] != col_indices.len() || col_indices.len() != values.len() {
            return Err(Error::InvalidMatrix(format!(
                "row pointer ends at {} but there are {} column indices and {} values",
                row_ptr[n],
                col_indices.len(),
                values.len()
            )));
        }
        if let Some(c) = col_indices.iter().find(|c| **c >= nc) {
            return Err(Error::InvalidMatrix(format!(
                "column index {c} out of range for {nc} columns"
            )));
        }
        if nc < n || (0..n).any(|i| row_map.global_index(i) != col_map.global_index(i)) {
            return Err(Error::InvalidMatrix(
                "the column map must start with the indices of the row map".to_string(),
            ));
        }
        if let Some(import) = &import {
            if import.remote_pids().len() != nc {
                return Err(Error::InvalidMatrix(format!(
                    "import pattern covers {} columns, the column map has {nc}",
                    import.remote_pids().len()
                )));
            }
        }
        Ok(Self {
            row_map,
            col_map,
            row_ptr,
            col_indices,
            values,
            import,
        })
    }

    /// Create a matrix from rows of `(global column, value)` entries.
    ///
    /// Row `i` belongs to local index `i` of `row_map`. The column map is built
    /// by `factory`, with remote columns sorted by owning rank and then by global
    /// index; `owner` gives the rank holding a global index. This is collective
    /// over `comm`.
    pub fn from_global_rows<C: Comm>(
        comm: &C,
        row_map: Arc<dyn DistributedMap>,
        rows: Vec<Vec<(usize, T)>>,
        owner: impl Fn(usize) -> Option<usize>,
        factory: &dyn MapFactory,
    ) -> Result<Self> {
        let local_error = (rows.len() != row_map.local_size()).then(|| {
            Error::InvalidMatrix(format!(
                "{} rows given for {} local indices",
                rows.len(),
                row_map.local_size()
            ))
        });
        // Every rank agrees on failure before the collective steps below
        if comm.all_reduce_sum_count(usize::from(local_error.is_some())) > 0 {
            return Err(local_error.unwrap_or_else(|| {
                Error::InvalidMatrix("rows given on another rank do not match its map".to_string())
            }));
        }
        let remotes = rows
            .iter()
            .flatten()
            .map(|(gid, _)| *gid)
            .filter(|gid| !row_map.contains(*gid))
            .unique()
            .sorted_by_key(|gid| (owner(*gid).unwrap_or(usize::MAX), *gid))
            .collect::<Vec<_>>();
        if comm.size() == 1 && !remotes.is_empty() {
            return Err(Error::InvalidMatrix(format!(
                "column {} is not held by the only rank",
                remotes[0]
            )));
        }

        let mut col_elements = row_map.global_indices();
        col_elements.extend_from_slice(&remotes);
        let col_map = factory.build(None, &col_elements, row_map.index_base(), comm)?;
        let col_lookup = col_elements
            .iter()
            .enumerate()
            .map(|(lid, gid)| (*gid, lid))
            .collect::<HashMap<_, _>>();

        let mut row_ptr = Vec::with_capacity(rows.len() + 1);
        let mut col_indices = vec![];
        let mut values = vec![];
        row_ptr.push(0);
        for row in rows {
            for (gid, value) in row {
                col_indices.push(col_lookup[&gid]);
                values.push(value);
            }
            row_ptr.push(col_indices.len());
        }

        let import = if comm.size() > 1 {
            Some(Import::build(comm, &*row_map, &*col_map, owner)?)
        } else {
            None
        };
        Self::new(row_map, col_map, row_ptr, col_indices, values, import)
    }

    /// The row map
    pub fn row_map(&self) -> &Arc<dyn DistributedMap> {
        &self.row_map
    }
    /// The column map
    pub fn col_map(&self) -> &Arc<dyn DistributedMap> {
        &self.col_map
    }
    /// The map of the vectors the matrix is applied to
    pub fn domain_map(&self) -> &Arc<dyn DistributedMap> {
        &self.row_map
    }
    /// The map of the vectors the matrix produces
    pub fn range_map(&self) -> &Arc<dyn DistributedMap> {
        &self.row_map
    }
    /// The import pattern from the domain map to the column map
    pub fn import(&self) -> Option<&Import> {
        self.import.as_ref()
    }
    /// The number of rows on this process
    pub fn local_rows(&self) -> usize {
        self.row_map.local_size()
    }
    /// The number of columns referred to on this process
    pub fn local_cols(&self) -> usize {
        self.col_map.local_size()
    }
    /// The number of stored entries on this process
    pub fn local_nnz(&self) -> usize {
        self.values.len()
    }
    /// The number of rows over all processes
    pub fn global_rows(&self) -> usize {
        self.row_map.global_size()
    }
    /// Row pointers
    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }
    /// Local column indices
    pub fn col_indices(&self) -> &[usize] {
        &self.col_indices
    }
    /// Values
    pub fn values(&self) -> &[T] {
        &self.values
    }
    /// Column indices and values of one local row
    pub fn row(&self, index: usize) -> (&[usize], &[T]) {
        let range = self.row_ptr[index]..self.row_ptr[index + 1];
        (&self.col_indices[range.clone()], &self.values[range])
    }
}

impl DistributedCsrMatrix<f64> {
    /// Compute `y = A x` for local parts `x` and `y` of vectors in the domain and range maps.
    ///
    /// This is collective over `comm`.
    pub fn multiply<C: Comm>(&self, comm: &C, x: &[f64], y: &mut [f64]) -> Result<()> {
        let n = self.local_rows();
        if x.len() != n || y.len() != n {
            return Err(Error::InvalidMatrix(format!(
                "vectors of length {} and {} for {n} local rows",
                x.len(),
                y.len()
            )));
        }
        let mut full = x.to_vec();
        full.resize(self.local_cols(), 0.0);
        if let Some(import) = &self.import {
            let received = comm.neighbor_exchange(&import.gather_exports(x), import.recv_ranks());
            import.scatter_remotes(&received, &mut full);
        }
        y.par_iter_mut().enumerate().for_each(|(i, yi)| {
            let (cols, values) = self.row(i);
            *yi = cols.iter().zip(values).map(|(c, v)| v * full[*c]).sum();
        });
        Ok(())
    }
}
