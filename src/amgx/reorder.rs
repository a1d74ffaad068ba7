//! Renumbering into the solver's index layout
use crate::sparse::Import;
use crate::types::{Error, Result};
use rayon::prelude::{IntoParallelIterator, ParallelIterator};
use std::collections::HashMap;
use std::ops::Add;

/// The neighbour ranks of the import pattern.
///
/// AMGX needs the ranks a process sends to and receives from to be the same.
pub fn neighbor_ranks(import: &Import) -> Result<Vec<usize>> {
    let send = import.send_ranks();
    let recv = import.recv_ranks();
    if send != recv {
        return Err(Error::AsymmetricNeighbors {
            send: send.to_vec(),
            recv: recv.to_vec(),
        });
    }
    Ok(send.to_vec())
}

/// Permutation of local column indices into the solver's index space.
///
/// The first `owned` solver indices are the rows of this process: rows that are
/// not exported come first, then exported rows in the order of their first
/// export. Imported columns follow, grouped by neighbour in the order of the
/// neighbour list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renumbering {
    forward: Vec<usize>,
    inverse: Vec<usize>,
    owned: usize,
}

impl Renumbering {
    /// The identity on `n` rows
    pub fn identity(n: usize) -> Self {
        Self {
            forward: (0..n).collect(),
            inverse: (0..n).collect(),
            owned: n,
        }
    }

    /// Build the renumbering of a matrix with `n_rows` local rows
    pub fn new(n_rows: usize, import: &Import, neighbors: &[usize]) -> Result<Self> {
        let remote_pids = import.remote_pids();
        let n_cols = remote_pids.len();
        if n_cols < n_rows {
            return Err(Error::InvalidMatrix(format!(
                "{n_cols} columns cannot include the {n_rows} local rows"
            )));
        }
        let mut forward = vec![None; n_cols];

        // Export indices repeat when a row is sent to several neighbours
        let mut is_exported = vec![false; n_rows];
        let mut exported = vec![];
        for &lid in import.export_lids() {
            if lid >= n_rows {
                return Err(Error::InvalidMatrix(format!(
                    "exported index {lid} is not one of the {n_rows} local rows"
                )));
            }
            if !is_exported[lid] {
                is_exported[lid] = true;
                exported.push(lid);
            }
        }

        let mut export_offset = n_rows - exported.len();
        for lid in &exported {
            forward[*lid] = Some(export_offset);
            export_offset += 1;
        }
        let mut local_offset = 0;
        for entry in forward.iter_mut().take(n_rows) {
            if entry.is_none() {
                *entry = Some(local_offset);
                local_offset += 1;
            }
        }
        let mut import_offset = n_rows;
        for &p in neighbors {
            for (entry, pid) in forward.iter_mut().zip(remote_pids) {
                if *pid == Some(p) {
                    *entry = Some(import_offset);
                    import_offset += 1;
                }
            }
        }

        let forward = forward
            .into_iter()
            .enumerate()
            .map(|(lid, f)| {
                f.ok_or_else(|| {
                    Error::InvalidMatrix(format!(
                        "column {lid} is neither a local row nor imported from a neighbour"
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let mut inverse = vec![0; n_cols];
        for (lid, f) in forward.iter().enumerate() {
            inverse[*f] = lid;
        }
        Ok(Self {
            forward,
            inverse,
            owned: n_rows,
        })
    }

    /// Solver index of a local index
    pub fn to_solver(&self, local_index: usize) -> usize {
        self.forward[local_index]
    }

    /// Local index of a solver index
    pub fn from_solver(&self, solver_index: usize) -> usize {
        self.inverse[solver_index]
    }

    /// Solver index of each local index
    pub fn forward(&self) -> &[usize] {
        &self.forward
    }

    /// Local index of each solver index
    pub fn inverse(&self) -> &[usize] {
        &self.inverse
    }

    /// The number of indices
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Check if there are no indices
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// The number of rows held on this process
    pub fn owned(&self) -> usize {
        self.owned
    }

    /// Copy the local entries of a vector into solver order
    pub fn to_solver_order<T: Copy>(&self, local: &[T], solver: &mut [T]) {
        for (i, value) in local.iter().take(self.owned).enumerate() {
            solver[self.forward[i]] = *value;
        }
    }

    /// Copy a vector in solver order back into local order
    pub fn from_solver_order<T: Copy>(&self, solver: &[T], local: &mut [T]) {
        for (i, value) in local.iter_mut().take(self.owned).enumerate() {
            *value = solver[self.forward[i]];
        }
    }
}

/// Neighbour communication maps in solver indices.
///
/// `send_maps[k]` lists the rows sent to `neighbors[k]` and `recv_maps[k]` the
/// halo entries received from it, both in increasing global index order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommPattern {
    neighbors: Vec<usize>,
    send_maps: Vec<Vec<usize>>,
    recv_maps: Vec<Vec<usize>>,
}

impl CommPattern {
    /// Build the maps from an import pattern
    pub fn new(import: &Import, neighbors: &[usize], renumbering: &Renumbering) -> Result<Self> {
        let position = neighbors
            .iter()
            .enumerate()
            .map(|(k, p)| (*p, k))
            .collect::<HashMap<_, _>>();
        let slot = |p: usize| {
            position.get(&p).copied().ok_or_else(|| {
                Error::InvalidMatrix(format!("rank {p} is not a neighbour"))
            })
        };

        let mut send_maps = vec![vec![]; neighbors.len()];
        for (lid, pid) in import.export_lids().iter().zip(import.export_pids()) {
            send_maps[slot(*pid)?].push(renumbering.to_solver(*lid));
        }
        let mut recv_maps = vec![vec![]; neighbors.len()];
        for (lid, pid) in import.remote_pids().iter().enumerate() {
            if let Some(p) = pid {
                recv_maps[slot(*p)?].push(renumbering.to_solver(lid));
            }
        }
        Ok(Self {
            neighbors: neighbors.to_vec(),
            send_maps,
            recv_maps,
        })
    }

    /// The neighbour ranks
    pub fn neighbors(&self) -> &[usize] {
        &self.neighbors
    }
    /// Rows sent to each neighbour
    pub fn send_maps(&self) -> &[Vec<usize>] {
        &self.send_maps
    }
    /// Halo entries received from each neighbour
    pub fn recv_maps(&self) -> &[Vec<usize>] {
        &self.recv_maps
    }
    /// The number of neighbours
    pub fn num_neighbors(&self) -> usize {
        self.neighbors.len()
    }
    /// The number of halo entries
    pub fn halo_size(&self) -> usize {
        self.recv_maps.iter().map(Vec::len).sum()
    }
}

/// CSR arrays in solver order
#[derive(Debug, Clone, PartialEq)]
pub struct ReorderedCsr<T> {
    /// Row pointers
    pub row_ptr: Vec<usize>,
    /// Column indices, strictly increasing within each row
    pub col_indices: Vec<usize>,
    /// Values
    pub values: Vec<T>,
}

/// Permute the rows and columns of a local CSR matrix into solver order.
///
/// Entries of each row are sorted by column; repeated columns are summed.
pub fn reorder_csr<T: Copy + Send + Sync + Add<Output = T>>(
    row_ptr: &[usize],
    col_indices: &[usize],
    values: &[T],
    renumbering: &Renumbering,
) -> ReorderedCsr<T> {
    let n = row_ptr.len().saturating_sub(1);
    let rows = (0..n)
        .into_par_iter()
        .map(|row| {
            let old = renumbering.from_solver(row);
            let mut entries = (row_ptr[old]..row_ptr[old + 1])
                .map(|k| (renumbering.to_solver(col_indices[k]), values[k]))
                .collect::<Vec<_>>();
            entries.sort_unstable_by_key(|(c, _)| *c);
            entries.dedup_by(|next, kept| {
                if next.0 == kept.0 {
                    kept.1 = kept.1 + next.1;
                    true
                } else {
                    false
                }
            });
            entries
        })
        .collect::<Vec<_>>();

    let nnz = rows.iter().map(Vec::len).sum();
    let mut reordered = ReorderedCsr {
        row_ptr: Vec::with_capacity(n + 1),
        col_indices: Vec::with_capacity(nnz),
        values: Vec::with_capacity(nnz),
    };
    reordered.row_ptr.push(0);
    for row in rows {
        for (c, v) in row {
            reordered.col_indices.push(c);
            reordered.values.push(v);
        }
        reordered.row_ptr.push(reordered.col_indices.len());
    }
    reordered
}
